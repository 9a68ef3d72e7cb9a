//! Ember award-voting server.
//!
//! The interesting part lives in [`api::auth`]: bearer credential
//! verification against the Bonfire identity provider (JWT validation via
//! a cached remote key set, with a userinfo fallback for opaque tokens).
//! The HTTP surface on top of it is deliberately thin.

pub mod api;
pub mod app;
pub mod core;
