//! CLI command implementations.

pub mod authorize;
pub mod sync;

use std::sync::Arc;

use geosheet::sheets::{AuthError, Authenticator, FileTokenStore, OAuthClient, SheetsError};
use geosheet::shopify::OrderSourceError;
use geosheet::{ConfigError, ErrorKind, SyncConfig, SyncError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// Google authorization failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The authorization code could not be read from the terminal.
    #[error("Failed to read authorization code: {0}")]
    Prompt(#[from] std::io::Error),

    /// The Shopify client could not be created.
    #[error(transparent)]
    Shopify(#[from] OrderSourceError),

    /// The Sheets client could not be created.
    #[error(transparent)]
    Sheets(#[from] SheetsError),

    /// The export failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl CommandError {
    /// Classify this error for the failure log line.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_)
            | Self::Http(_)
            | Self::Sheets(_)
            | Self::Shopify(OrderSourceError::InvalidUrl(_)) => ErrorKind::Config,
            Self::Auth(_) | Self::Prompt(_) => ErrorKind::Auth,
            Self::Shopify(_) => ErrorKind::SourceUnavailable,
            Self::Sync(e) => e.kind(),
        }
    }
}

/// Build the authenticator from the configured client secret and token cache.
async fn authenticator(
    http: reqwest::Client,
    config: &SyncConfig,
) -> Result<Arc<Authenticator>, AuthError> {
    let oauth = OAuthClient::from_file(http, &config.sheets.client_secret_path).await?;
    let store = Arc::new(FileTokenStore::new(&config.sheets.token_cache_path));
    Ok(Arc::new(Authenticator::new(oauth, store)))
}
