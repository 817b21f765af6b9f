//! Google Sheets row destination.
//!
//! # Architecture
//!
//! - One `values:batchUpdate` call per row, `USER_ENTERED` input
//! - Installed-app OAuth2 with a file-backed token cache
//! - Access tokens refreshed automatically shortly before expiry
//!
//! # Example
//!
//! ```rust,ignore
//! use geosheet::sheets::{Authenticator, FileTokenStore, OAuthClient, RowSink, SheetsClient};
//!
//! let oauth = OAuthClient::from_file(http.clone(), &config.sheets.client_secret_path).await?;
//! let store = Arc::new(FileTokenStore::new(&config.sheets.token_cache_path));
//! let auth = Arc::new(Authenticator::new(oauth, store));
//!
//! let sheets = SheetsClient::new(http, &config.sheets, auth)?;
//! sheets.write_row(&row).await?;
//! ```

mod auth;
mod client;
mod error;
mod token_store;

pub use auth::{Authenticator, OAuthClient, SHEETS_SCOPE, StoredToken, extract_code};
pub use client::SheetsClient;
pub use error::{AuthError, SheetsError};
pub use token_store::{FileTokenStore, TokenStore};

use async_trait::async_trait;
use geosheet_core::DestinationRow;

/// A destination that accepts one row at a time.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Write `row` at its row number, overwriting existing cells.
    async fn write_row(&self, row: &DestinationRow) -> Result<(), SheetsError>;
}
