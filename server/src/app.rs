//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::api::auth::{CredentialVerifier, SystemClock};
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};

pub struct CoreApp {
    pub config: AppConfig,
    pub verifier: Arc<CredentialVerifier>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config)?;
        ApiServer::new(app).start().await
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let http = reqwest::Client::builder()
            .timeout(config.oidc.http_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let verifier = Arc::new(CredentialVerifier::new(
            &config.oidc,
            http,
            Arc::new(SystemClock),
        ));

        tracing::debug!(
            authority = %config.oidc.authority,
            "Credential verifier initialized"
        );

        Ok(Self { config, verifier })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
