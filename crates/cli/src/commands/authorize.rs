//! Interactive Google authorization.
//!
//! # Usage
//!
//! ```bash
//! geosheet authorize
//! ```
//!
//! Prints an authorization URL, waits for the code (or the full redirect
//! URL) on stdin, and saves the resulting token to `GOOGLE_TOKEN_CACHE`.
//!
//! # Environment Variables
//!
//! - `GOOGLE_CLIENT_SECRET_FILE` - OAuth client secret JSON
//! - `GOOGLE_TOKEN_CACHE` - Where the token is saved

use geosheet::sheets::{Authenticator, extract_code};
use geosheet::{SyncConfig, build_http_client};
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandError, authenticator};

/// Length of the random OAuth `state` value.
const STATE_LEN: usize = 32;

/// Run the authorization flow and save the token.
pub async fn run(config: &SyncConfig) -> Result<(), CommandError> {
    let http = build_http_client(config.http_timeout)?;
    let auth = authenticator(http, config).await?;

    prompt_and_authorize(&auth).await?;

    tracing::info!(
        path = %config.sheets.token_cache_path.display(),
        "Token saved"
    );
    Ok(())
}

/// Ask the user to authorize in a browser and exchange the code they paste.
pub async fn prompt_and_authorize(auth: &Authenticator) -> Result<(), CommandError> {
    let state: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect();

    print_instructions(&auth.authorization_url(&state));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let input = lines.next_line().await?.unwrap_or_default();

    let code = extract_code(&input, &state)?;
    auth.authorize(&code).await?;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_instructions(url: &str) {
    println!("Go to the following link in your browser, then paste the authorization code");
    println!("(or the full URL you were redirected to):\n");
    println!("{url}\n");
}
