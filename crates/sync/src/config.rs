//! Sync configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com; a
//!   leading `https://` is ignored)
//! - `SHOPIFY_API_KEY` - Private app API key
//! - `SHOPIFY_API_PASSWORD` - Private app password (HIGH PRIVILEGE)
//! - `SHEETS_SPREADSHEET_ID` - Target Google Sheets spreadsheet id
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - Admin REST API version (default: 2021-01)
//! - `SHOPIFY_ORDER_STATUS` - Order status filter sent to count and list calls
//!   (e.g., `any`). Unset means Shopify's default.
//! - `SHEETS_SHEET_NAME` - Sheet (tab) to write to (default: sheet1)
//! - `GOOGLE_CLIENT_SECRET_FILE` - OAuth client secret JSON (default: client_secret.json)
//! - `GOOGLE_TOKEN_CACHE` - OAuth token cache file (default: sheets-token.json)
//! - `SYNC_PAGE_SIZE` - Orders per listing call, 1-250 (default: 250)
//! - `SYNC_WRITE_DELAY_SECONDS` - Minimum spacing between row writes (default: 1)
//! - `SYNC_HEADER_ROW_OFFSET` - Row number of the first order (default: 2)
//! - `SYNC_BOUNDARY_MODE` - `legacy` or `exact` page boundaries (default: legacy)
//! - `HTTP_TIMEOUT_SECONDS` - Timeout for every outbound request (default: 30)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::driver::{BoundaryMode, MAX_PAGE_SIZE, SyncSettings};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;
const DEFAULT_API_VERSION: &str = "2021-01";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("Failed to load env file {0}: {1}")]
    EnvFile(PathBuf, String),
}

/// Complete configuration for one export run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Order source (Shopify Admin REST API) configuration
    pub shopify: ShopifyConfig,
    /// Spreadsheet sink (Google Sheets) configuration
    pub sheets: SheetsConfig,
    /// Pagination and row placement settings
    pub sync: SyncSettings,
    /// Minimum spacing between row writes (zero disables pacing)
    pub write_delay: Duration,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

/// Shopify Admin REST API configuration.
///
/// Implements `Debug` manually to redact the HIGH PRIVILEGE password.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Admin REST API version (e.g., 2021-01)
    pub api_version: String,
    /// Private app API key
    pub api_key: String,
    /// Private app password (HIGH PRIVILEGE - read access to all orders)
    pub api_password: SecretString,
    /// Optional order status filter (e.g., `any`)
    pub order_status: Option<String>,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key)
            .field("api_password", &"[REDACTED]")
            .field("order_status", &self.order_status)
            .finish()
    }
}

/// Google Sheets configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet id from the sheet URL
    pub spreadsheet_id: String,
    /// Sheet (tab) name used in A1 ranges
    pub sheet_name: String,
    /// Path to the OAuth client secret JSON downloaded from Google Cloud
    pub client_secret_path: PathBuf,
    /// Path to the OAuth token cache
    pub token_cache_path: PathBuf,
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit env file, then the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFile` if the file cannot be read, otherwise
    /// the same errors as [`SyncConfig::from_env`].
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        dotenvy::from_path(path)
            .map_err(|e| ConfigError::EnvFile(path.to_path_buf(), e.to_string()))?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`SyncConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let shopify = ShopifyConfig {
            store: env.required("SHOPIFY_STORE")?,
            api_version: env.or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            api_key: env.required("SHOPIFY_API_KEY")?,
            api_password: env.validated_secret("SHOPIFY_API_PASSWORD")?,
            order_status: env.optional("SHOPIFY_ORDER_STATUS"),
        };

        let sheets = SheetsConfig {
            spreadsheet_id: env.required("SHEETS_SPREADSHEET_ID")?,
            sheet_name: env.or_default("SHEETS_SHEET_NAME", "sheet1"),
            client_secret_path: env
                .or_default("GOOGLE_CLIENT_SECRET_FILE", "client_secret.json")
                .into(),
            token_cache_path: env
                .or_default("GOOGLE_TOKEN_CACHE", "sheets-token.json")
                .into(),
        };

        let sync = SyncSettings {
            page_size: env.parsed("SYNC_PAGE_SIZE", MAX_PAGE_SIZE)?,
            header_row_offset: env.parsed("SYNC_HEADER_ROW_OFFSET", 2)?,
            boundary_mode: env.parsed("SYNC_BOUNDARY_MODE", BoundaryMode::Legacy)?,
        };
        sync.validate()
            .map_err(|e| ConfigError::InvalidEnvVar("SYNC_*".to_string(), e))?;

        let write_delay = env.seconds("SYNC_WRITE_DELAY_SECONDS", 1.0)?;
        let http_timeout = env.seconds("HTTP_TIMEOUT_SECONDS", 30.0)?;
        if http_timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "HTTP_TIMEOUT_SECONDS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            shopify,
            sheets,
            sync,
            write_delay,
            http_timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Typed access to a variable lookup.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Parse a non-negative, possibly fractional number of seconds.
    fn seconds(&self, key: &str, default: f64) -> Result<Duration, ConfigError> {
        let secs: f64 = self.parsed(key, default)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Shopify private app passwords are 32 hex chars after the prefix
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the password issued by Shopify."
            ),
        ));
    }

    Ok(())
}
