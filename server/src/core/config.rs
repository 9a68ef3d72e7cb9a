use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_AUTHORITY, DEFAULT_HOST, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_JWKS_MAX_FETCHES_PER_MINUTE, DEFAULT_JWKS_TTL_SECS, DEFAULT_MIN_CREDENTIAL_LEN,
    DEFAULT_PORT, JWKS_PATH, LEGACY_ISSUER, USERINFO_PATH,
};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Identity provider configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OidcFileConfig {
    /// Identity provider base URL
    pub authority: Option<String>,
    /// OAuth client id (expected token audience)
    pub client_id: Option<String>,
    /// Issuer strings accepted in addition to the authority-derived ones
    pub extra_issuers: Option<Vec<String>>,
    /// Shortest credential the verifier accepts
    pub min_credential_len: Option<usize>,
    /// Signing key cache lifetime in seconds
    pub jwks_ttl_secs: Option<u64>,
    /// Upper bound on key-set fetches per minute
    pub jwks_max_fetches_per_minute: Option<u32>,
    /// Timeout for outbound provider calls in seconds
    pub http_timeout_secs: Option<u64>,
}

/// Admin configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AdminFileConfig {
    /// Provider subject ids granted admin access
    pub user_ids: Option<Vec<String>>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub oidc: Option<OidcFileConfig>,
    pub admin: Option<AdminFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                current.host = server.host;
            }
            if server.port.is_some() {
                current.port = server.port;
            }
        }

        if let Some(oidc) = other.oidc {
            let current = self.oidc.get_or_insert_with(OidcFileConfig::default);
            if oidc.authority.is_some() {
                current.authority = oidc.authority;
            }
            if oidc.client_id.is_some() {
                current.client_id = oidc.client_id;
            }
            if oidc.extra_issuers.is_some() {
                current.extra_issuers = oidc.extra_issuers;
            }
            if oidc.min_credential_len.is_some() {
                current.min_credential_len = oidc.min_credential_len;
            }
            if oidc.jwks_ttl_secs.is_some() {
                current.jwks_ttl_secs = oidc.jwks_ttl_secs;
            }
            if oidc.jwks_max_fetches_per_minute.is_some() {
                current.jwks_max_fetches_per_minute = oidc.jwks_max_fetches_per_minute;
            }
            if oidc.http_timeout_secs.is_some() {
                current.http_timeout_secs = oidc.http_timeout_secs;
            }
        }

        if let Some(admin) = other.admin {
            let current = self.admin.get_or_insert_with(AdminFileConfig::default);
            if admin.user_ids.is_some() {
                current.user_ids = admin.user_ids;
            }
        }

        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Identity provider configuration
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Identity provider base URL, without a trailing slash
    pub authority: String,
    /// OAuth client id; signed tokens must carry this audience
    pub client_id: String,
    /// Issuers accepted in addition to the authority-derived variants
    pub extra_issuers: Vec<String>,
    /// Shortest credential the verifier accepts
    pub min_credential_len: usize,
    /// Signing key cache lifetime
    pub jwks_ttl: Duration,
    /// Upper bound on key-set fetches per minute
    pub jwks_max_fetches_per_minute: u32,
    /// Timeout for outbound provider calls
    pub http_timeout: Duration,
}

impl OidcConfig {
    /// Published key-set document URL
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.authority, JWKS_PATH)
    }

    /// Userinfo endpoint URL
    pub fn userinfo_url(&self) -> String {
        format!("{}{}", self.authority, USERINFO_PATH)
    }

    /// The set of issuer strings accepted in signed tokens.
    ///
    /// The provider emits the authority URL both with and without a
    /// trailing slash, and older tokens carry a historical domain. All
    /// members are operator-controlled values.
    pub fn accepted_issuers(&self) -> Vec<String> {
        let mut issuers = vec![self.authority.clone(), format!("{}/", self.authority)];
        for extra in &self.extra_issuers {
            if !issuers.contains(extra) {
                issuers.push(extra.clone());
            }
        }
        issuers
    }
}

/// Admin configuration
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Provider subject ids granted admin access
    pub user_ids: Vec<String>,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oidc: OidcConfig,
    pub admin: AdminConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Local directory config OR CLI-specified config path
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();

        let overlay_path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
        }

        let file_server = file_config.server.unwrap_or_default();
        let file_oidc = file_config.oidc.unwrap_or_default();
        let file_admin = file_config.admin.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let authority = cli
            .authority
            .clone()
            .or(file_oidc.authority)
            .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string())
            .trim_end_matches('/')
            .to_string();

        let client_id = cli
            .client_id
            .clone()
            .or(file_oidc.client_id)
            .unwrap_or_default();

        let extra_issuers = file_oidc
            .extra_issuers
            .unwrap_or_else(|| vec![LEGACY_ISSUER.to_string()]);

        let oidc = OidcConfig {
            authority,
            client_id,
            extra_issuers,
            min_credential_len: file_oidc
                .min_credential_len
                .unwrap_or(DEFAULT_MIN_CREDENTIAL_LEN),
            jwks_ttl: Duration::from_secs(file_oidc.jwks_ttl_secs.unwrap_or(DEFAULT_JWKS_TTL_SECS)),
            jwks_max_fetches_per_minute: file_oidc
                .jwks_max_fetches_per_minute
                .unwrap_or(DEFAULT_JWKS_MAX_FETCHES_PER_MINUTE),
            http_timeout: Duration::from_secs(
                file_oidc
                    .http_timeout_secs
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
        };

        let admin = AdminConfig {
            user_ids: cli
                .admin_user_ids
                .clone()
                .or(file_admin.user_ids)
                .unwrap_or_default(),
        };

        let debug = cli.debug || file_config.debug.unwrap_or(false);

        let config = Self {
            server: ServerConfig { host, port },
            oidc,
            admin,
            debug,
        };

        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            authority = %config.oidc.authority,
            admin_count = config.admin.user_ids.len(),
            debug = config.debug,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }
        if self.oidc.authority.is_empty() {
            anyhow::bail!("Configuration error: oidc.authority must not be empty");
        }
        if self.oidc.client_id.is_empty() {
            anyhow::bail!(
                "Configuration error: oidc.client_id must be set (EMBER_OIDC_CLIENT_ID)"
            );
        }
        if self.oidc.min_credential_len == 0 {
            anyhow::bail!("Configuration error: oidc.min_credential_len must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oidc(authority: &str, extra: &[&str]) -> OidcConfig {
        OidcConfig {
            authority: authority.to_string(),
            client_id: "ember-awards".to_string(),
            extra_issuers: extra.iter().map(|s| s.to_string()).collect(),
            min_credential_len: DEFAULT_MIN_CREDENTIAL_LEN,
            jwks_ttl: Duration::from_secs(DEFAULT_JWKS_TTL_SECS),
            jwks_max_fetches_per_minute: DEFAULT_JWKS_MAX_FETCHES_PER_MINUTE,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    #[test]
    fn accepted_issuers_includes_slash_variant_and_legacy_domain() {
        let cfg = oidc("https://api.bonfire.moe", &["https://bonfire.moe"]);
        assert_eq!(
            cfg.accepted_issuers(),
            vec![
                "https://api.bonfire.moe".to_string(),
                "https://api.bonfire.moe/".to_string(),
                "https://bonfire.moe".to_string(),
            ]
        );
    }

    #[test]
    fn accepted_issuers_deduplicates_extras() {
        let cfg = oidc("https://api.bonfire.moe", &["https://api.bonfire.moe"]);
        assert_eq!(cfg.accepted_issuers().len(), 2);
    }

    #[test]
    fn provider_urls_derive_from_authority() {
        let cfg = oidc("https://api.bonfire.moe", &[]);
        assert_eq!(
            cfg.jwks_url(),
            "https://api.bonfire.moe/.well-known/jwks.json"
        );
        assert_eq!(
            cfg.userinfo_url(),
            "https://api.bonfire.moe/openid/userinfo"
        );
    }

    #[test]
    fn merge_overlay_takes_precedence() {
        let mut base = FileConfig::default();
        base.merge(FileConfig {
            server: Some(ServerFileConfig {
                host: Some("0.0.0.0".into()),
                port: Some(8080),
            }),
            ..Default::default()
        });
        base.merge(FileConfig {
            server: Some(ServerFileConfig {
                host: None,
                port: Some(9090),
            }),
            ..Default::default()
        });
        let server = base.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(9090));
    }
}
