//! Google OAuth2 authentication for the Sheets API.
//!
//! Implements the installed-app authorization-code flow:
//! client secret → authorization URL → code → access/refresh token. Tokens
//! are persisted through an injected [`TokenStore`] and refreshed shortly
//! before they expire.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use url::Url;

use super::error::AuthError;
use super::token_store::TokenStore;

/// OAuth scope for reading and writing spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Redirect used when the client secret lists none.
const DEFAULT_REDIRECT_URI: &str = "http://localhost";

/// Refresh tokens this many seconds before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

// =============================================================================
// Token
// =============================================================================

/// An OAuth token as persisted in the token cache.
///
/// The JSON layout (`access_token`, `token_type`, `refresh_token`, `expiry`)
/// stays readable by other OAuth2 tooling. Implements `Debug` manually to
/// redact the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Bearer token for API requests.
    pub access_token: String,
    /// Token type, normally `Bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Long-lived token used to mint new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token expires. `None` or the zero time means never.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl StoredToken {
    /// Effective expiry, treating the zero time as "never expires".
    fn effective_expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry.filter(|expiry| expiry.year() > 1)
    }

    /// Check if the access token will expire within the given number of seconds.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        self.effective_expiry().is_some_and(|expiry| {
            let now = Utc::now().timestamp();
            now >= expiry.timestamp() - seconds
        })
    }

    /// Check if the access token has expired (with a 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(REFRESH_MARGIN_SECS)
    }
}

/// Token endpoint success response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Token endpoint error response.
#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>) -> StoredToken {
        let now = Utc::now();
        StoredToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(default_token_type),
            // Refresh responses usually omit the refresh token
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: self
                .expires_in
                .map(|secs| now + chrono::Duration::seconds(secs)),
        }
    }
}

// =============================================================================
// OAuth client
// =============================================================================

/// Google client secret file (`client_secret.json`).
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretSection>,
    web: Option<ClientSecretSection>,
}

#[derive(Deserialize)]
struct ClientSecretSection {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// OAuth2 client for Google's authorization and token endpoints.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    auth_uri: Url,
    token_uri: Url,
    redirect_uri: String,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri.as_str())
            .field("token_uri", &self.token_uri.as_str())
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    /// Parse a Google client secret JSON document.
    ///
    /// Accepts both `installed` (desktop) and `web` client types.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClientSecret` if the document is not a client secret.
    pub fn from_json(http: reqwest::Client, json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| AuthError::ClientSecret(e.to_string()))?;
        let section = file.installed.or(file.web).ok_or_else(|| {
            AuthError::ClientSecret("expected an `installed` or `web` section".to_string())
        })?;

        let parse = |field: &str, value: &str| {
            Url::parse(value).map_err(|e| AuthError::ClientSecret(format!("{field}: {e}")))
        };

        Ok(Self {
            http,
            client_id: section.client_id,
            client_secret: SecretString::from(section.client_secret),
            auth_uri: parse("auth_uri", &section.auth_uri)?,
            token_uri: parse("token_uri", &section.token_uri)?,
            redirect_uri: section
                .redirect_uris
                .into_iter()
                .next()
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        })
    }

    /// Read and parse a client secret file.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClientSecretRead` if the file cannot be read and
    /// `AuthError::ClientSecret` if it is malformed.
    pub async fn from_file(http: reqwest::Client, path: &Path) -> Result<Self, AuthError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AuthError::ClientSecretRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(http, &json)
    }

    /// Build the URL the user opens to grant spreadsheet access.
    ///
    /// Requests offline access so the response includes a refresh token.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        let mut url = self.auth_uri.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SHEETS_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("state", state);
        url.into()
    }

    /// Exchange an authorization code for a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Exchange` if the code is rejected.
    /// Returns `AuthError::Http` if the HTTP request fails.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, AuthError> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self.request_token(&params).await.map_err(|e| match e {
            TokenRequestError::Rejected(message) => AuthError::Exchange(message),
            TokenRequestError::Auth(e) => e,
        })?;

        Ok(response.into_token(None))
    }

    /// Obtain a new access token with the refresh token in `token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` if `token` has no refresh token.
    /// Returns `AuthError::Refresh` if the refresh token is rejected.
    #[instrument(skip(self, token))]
    pub async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, AuthError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(AuthError::TokenExpired)?;

        let params = [
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.request_token(&params).await.map_err(|e| match e {
            TokenRequestError::Rejected(message) => AuthError::Refresh(message),
            TokenRequestError::Auth(e) => e,
        })?;

        Ok(response.into_token(token.refresh_token.clone()))
    }

    async fn request_token(
        &self,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, TokenRequestError> {
        let response = self
            .http
            .post(self.token_uri.clone())
            .form(params)
            .send()
            .await
            .map_err(|e| TokenRequestError::Auth(e.into()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TokenRequestError::Auth(e.into()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(TokenRequestError::Rejected(message));
        }

        serde_json::from_slice(&body).map_err(|e| TokenRequestError::Auth(e.into()))
    }
}

enum TokenRequestError {
    Rejected(String),
    Auth(AuthError),
}

/// Pull the authorization code out of user input.
///
/// Accepts either the bare code or the full redirect URL the browser landed
/// on. When a URL carries a `state`, it must equal `expected_state`.
///
/// # Errors
///
/// Returns `AuthError::Exchange` if no code is present and
/// `AuthError::StateMismatch` if the state does not match.
pub fn extract_code(input: &str, expected_state: &str) -> Result<String, AuthError> {
    let input = input.trim();

    let Ok(url) = Url::parse(input) else {
        if input.is_empty() {
            return Err(AuthError::Exchange("no authorization code entered".to_string()));
        }
        return Ok(input.to_string());
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(AuthError::Exchange(value.into_owned())),
            _ => {}
        }
    }

    if state.is_some_and(|state| state != expected_state) {
        return Err(AuthError::StateMismatch);
    }
    code.ok_or_else(|| AuthError::Exchange("redirect URL has no `code` parameter".to_string()))
}

// =============================================================================
// Authenticator
// =============================================================================

/// Supplies valid access tokens, refreshing and persisting them as needed.
///
/// Tokens are cached in memory after the first load from the store.
pub struct Authenticator {
    oauth: OAuthClient,
    store: Arc<dyn TokenStore>,
    token: RwLock<Option<StoredToken>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("oauth", &self.oauth)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create an authenticator over `store`.
    #[must_use]
    pub fn new(oauth: OAuthClient, store: Arc<dyn TokenStore>) -> Self {
        Self {
            oauth,
            store,
            token: RwLock::new(None),
        }
    }

    /// The URL the user opens to grant access.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        self.oauth.authorization_url(state)
    }

    /// Check whether a token is cached (it may still need a refresh).
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be read.
    pub async fn is_authorized(&self) -> Result<bool, AuthError> {
        Ok(self.current().await?.is_some())
    }

    /// Exchange an authorization code and persist the resulting token.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the token cannot be saved.
    #[instrument(skip(self, code))]
    pub async fn authorize(&self, code: &str) -> Result<(), AuthError> {
        let token = self.oauth.exchange_code(code).await?;
        self.store.save(&token).await?;
        *self.token.write().await = Some(token);

        info!("Google Sheets authorization complete");
        Ok(())
    }

    /// Get a valid access token.
    ///
    /// Refreshes (and persists) the token when it is within 60 seconds of
    /// expiring.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthorized` if no token has been cached.
    /// Returns `AuthError::TokenExpired` if the token is expired and has no
    /// refresh token.
    /// Returns `AuthError::Refresh` if the refresh is rejected.
    pub async fn access_token(&self) -> Result<SecretString, AuthError> {
        let token = self.current().await?.ok_or(AuthError::NotAuthorized)?;

        if !token.is_expired() {
            return Ok(SecretString::from(token.access_token));
        }

        if token.refresh_token.is_none() {
            return Err(AuthError::TokenExpired);
        }

        let refreshed = self.oauth.refresh(&token).await?;
        self.store.save(&refreshed).await?;
        let access_token = SecretString::from(refreshed.access_token.clone());
        *self.token.write().await = Some(refreshed);

        info!("Refreshed Google Sheets access token");
        Ok(access_token)
    }

    /// The cached token, loading it from the store on first use.
    async fn current(&self) -> Result<Option<StoredToken>, AuthError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(Some(token.clone()));
        }

        let loaded = self.store.load().await?;
        if let Some(token) = &loaded {
            *self.token.write().await = Some(token.clone());
        }
        Ok(loaded)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CLIENT_SECRET: &str = r#"{
        "installed": {
            "client_id": "123-abc.apps.googleusercontent.com",
            "project_id": "geosheet",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "GOCSPX-s3cr3t",
            "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob", "http://localhost"]
        }
    }"#;

    fn oauth() -> OAuthClient {
        OAuthClient::from_json(reqwest::Client::new(), CLIENT_SECRET).unwrap()
    }

    fn token_expiring_in(seconds: i64) -> StoredToken {
        StoredToken {
            access_token: "ya29.test".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: Some(Utc::now() + chrono::Duration::seconds(seconds)),
        }
    }

    #[test]
    fn test_client_secret_installed() {
        let client = oauth();
        assert_eq!(client.client_id, "123-abc.apps.googleusercontent.com");
        assert_eq!(client.redirect_uri, "urn:ietf:wg:oauth:2.0:oob");
        assert_eq!(client.token_uri.as_str(), "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_client_secret_web_without_redirects() {
        let json = r#"{"web": {
            "client_id": "web-client",
            "client_secret": "GOCSPX-web",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token"
        }}"#;
        let client = OAuthClient::from_json(reqwest::Client::new(), json).unwrap();
        assert_eq!(client.client_id, "web-client");
        assert_eq!(client.redirect_uri, DEFAULT_REDIRECT_URI);
    }

    #[test]
    fn test_client_secret_rejects_other_documents() {
        let err = OAuthClient::from_json(reqwest::Client::new(), r#"{"type": "service_account"}"#)
            .unwrap_err();
        assert!(matches!(err, AuthError::ClientSecret(_)));

        let err = OAuthClient::from_json(reqwest::Client::new(), "not json").unwrap_err();
        assert!(matches!(err, AuthError::ClientSecret(_)));
    }

    #[test]
    fn test_client_debug_redacts_secret() {
        let debug_output = format!("{:?}", oauth());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("GOCSPX-s3cr3t"));
    }

    #[test]
    fn test_authorization_url() {
        let url = Url::parse(&oauth().authorization_url("st4te")).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(pairs["client_id"], "123-abc.apps.googleusercontent.com");
        assert_eq!(pairs["scope"], SHEETS_SCOPE);
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["state"], "st4te");
    }

    #[test]
    fn test_token_expiry() {
        assert!(token_expiring_in(-3600).is_expired());
        assert!(!token_expiring_in(3600).is_expired());
        // Within the 60 second buffer
        assert!(token_expiring_in(30).is_expired());
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        let mut token = token_expiring_in(0);
        token.expiry = None;
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_zero_time_never_expires() {
        let json = r#"{
            "access_token": "ya29.zero",
            "token_type": "Bearer",
            "refresh_token": "1//refresh",
            "expiry": "0001-01-01T00:00:00Z"
        }"#;
        let token: StoredToken = serde_json::from_str(json).unwrap();
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_cache_format() {
        let json = r#"{
            "access_token": "ya29.a0AfH6SMB",
            "token_type": "Bearer",
            "refresh_token": "1//0gLq-refresh",
            "expiry": "2021-03-01T17:04:05.123456-06:00"
        }"#;
        let token: StoredToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("1//0gLq-refresh"));
        assert_eq!(token.expiry.unwrap().to_rfc3339(), "2021-03-01T23:04:05.123456+00:00");

        let minimal: StoredToken = serde_json::from_str(r#"{"access_token": "a"}"#).unwrap();
        assert_eq!(minimal.token_type, "Bearer");
        assert_eq!(minimal.refresh_token, None);
    }

    #[test]
    fn test_token_debug_redacts_secrets() {
        let mut token = token_expiring_in(3600);
        token.refresh_token = Some("1//refresh-secret".to_string());
        let debug_output = format!("{token:?}");
        assert!(!debug_output.contains("ya29.test"));
        assert!(!debug_output.contains("1//refresh-secret"));
    }

    #[test]
    fn test_refresh_response_keeps_previous_refresh_token() {
        let response = TokenResponse {
            access_token: "ya29.new".to_string(),
            token_type: None,
            refresh_token: None,
            expires_in: Some(3599),
        };
        let token = response.into_token(Some("1//kept".to_string()));
        assert_eq!(token.refresh_token.as_deref(), Some("1//kept"));
        assert_eq!(token.token_type, "Bearer");
        assert!(!token.is_expired());
    }

    #[test]
    fn test_extract_code_bare() {
        assert_eq!(extract_code("  4/0AX4XfWh \n", "s").unwrap(), "4/0AX4XfWh");
        assert!(extract_code("   ", "s").is_err());
    }

    #[test]
    fn test_extract_code_from_redirect_url() {
        let code = extract_code("http://localhost/?state=abc&code=4%2F0AX4&scope=x", "abc").unwrap();
        assert_eq!(code, "4/0AX4");
    }

    #[test]
    fn test_extract_code_state_mismatch() {
        let err = extract_code("http://localhost/?state=evil&code=4%2F0AX4", "abc").unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
    }

    #[test]
    fn test_extract_code_access_denied() {
        let err = extract_code("http://localhost/?error=access_denied&state=abc", "abc").unwrap_err();
        assert!(matches!(err, AuthError::Exchange(ref msg) if msg == "access_denied"));
    }
}
