// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "ember";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "ember.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "EMBER_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "EMBER_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "EMBER_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "EMBER_LOG";

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "EMBER_DEBUG";

// =============================================================================
// Environment Variables - Identity Provider
// =============================================================================

/// Environment variable for the identity provider base URL
pub const ENV_OIDC_AUTHORITY: &str = "EMBER_OIDC_AUTHORITY";

/// Environment variable for the OAuth client id (expected audience)
pub const ENV_OIDC_CLIENT_ID: &str = "EMBER_OIDC_CLIENT_ID";

/// Environment variable for the comma-separated admin user id list
pub const ENV_ADMIN_USER_IDS: &str = "EMBER_ADMIN_USER_IDS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// Identity Provider Defaults
// =============================================================================

/// Default identity provider base URL
pub const DEFAULT_AUTHORITY: &str = "https://api.bonfire.moe";

/// Historical issuer domain the provider still emits in some tokens
pub const LEGACY_ISSUER: &str = "https://bonfire.moe";

/// Published key-set document path, relative to the authority
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Userinfo endpoint path, relative to the authority
pub const USERINFO_PATH: &str = "/openid/userinfo";

/// How long a fetched signing key stays fresh (24 hours)
pub const DEFAULT_JWKS_TTL_SECS: u64 = 86_400;

/// Upper bound on key-set fetches per minute
pub const DEFAULT_JWKS_MAX_FETCHES_PER_MINUTE: u32 = 10;

/// Timeout for outbound provider calls (key set, userinfo)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

/// Shortest credential the verifier will even look at. The provider has
/// issued opaque tokens not much longer than this, so the floor is low.
pub const DEFAULT_MIN_CREDENTIAL_LEN: usize = 10;
