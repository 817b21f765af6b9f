//! Google Sheets and OAuth errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the OAuth flow and the token cache.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The client secret file could not be read.
    #[error("Failed to read OAuth client secret {path}: {source}")]
    ClientSecretRead {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The client secret file is not a valid Google client secret.
    #[error("Invalid OAuth client secret: {0}")]
    ClientSecret(String),

    /// The token cache could not be read or written.
    #[error("Token cache I/O error at {path}: {source}")]
    TokenStoreIo {
        /// Token cache path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The token cache or a token response held malformed JSON.
    #[error("Malformed token JSON: {0}")]
    TokenFormat(#[from] serde_json::Error),

    /// HTTP request to the token endpoint failed.
    #[error("OAuth request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The authorization code was rejected.
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    /// The refresh token was rejected.
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// The redirect did not carry the state we sent.
    #[error("OAuth state mismatch - restart the authorization")]
    StateMismatch,

    /// No token has been cached yet.
    #[error("Not authorized with Google Sheets - run `geosheet authorize`")]
    NotAuthorized,

    /// The access token expired and cannot be refreshed.
    #[error("Access token expired and no refresh token is available")]
    TokenExpired,
}

/// Errors that can occur when writing to Google Sheets.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// Could not obtain an access token.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// HTTP request failed.
    #[error("Sheets request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Sheets API rejected the request.
    #[error("Sheets API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Spreadsheet id or base URL did not form a valid URL.
    #[error("Invalid Sheets URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
