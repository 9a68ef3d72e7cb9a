//! API server and routes

pub mod auth;
pub mod middleware;
pub mod routes;
mod server;

pub use server::ApiServer;
