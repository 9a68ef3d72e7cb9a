use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_ADMIN_USER_IDS, ENV_CONFIG, ENV_DEBUG, ENV_HOST, ENV_OIDC_AUTHORITY, ENV_OIDC_CLIENT_ID,
    ENV_PORT,
};

#[derive(Parser)]
#[command(name = "ember")]
#[command(version, about = "Ember community awards server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug logging of rejected credentials
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Identity provider base URL
    #[arg(long, global = true, env = ENV_OIDC_AUTHORITY)]
    pub authority: Option<String>,

    /// OAuth client id (expected token audience)
    #[arg(long, global = true, env = ENV_OIDC_CLIENT_ID)]
    pub client_id: Option<String>,

    /// Admin user ids (comma-separated)
    #[arg(long, global = true, env = ENV_ADMIN_USER_IDS, value_delimiter = ',')]
    pub admin_user_ids: Option<Vec<String>>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub authority: Option<String>,
    pub client_id: Option<String>,
    pub admin_user_ids: Option<Vec<String>>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        debug: cli.debug,
        config: cli.config,
        authority: cli.authority,
        client_id: cli.client_id,
        admin_user_ids: cli.admin_user_ids,
    };
    (config, cli.command)
}
