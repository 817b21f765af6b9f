//! Order export command.
//!
//! # Usage
//!
//! ```bash
//! # Export every order's shipping address
//! geosheet sync
//!
//! # Same, with settings from another env file
//! geosheet --env-file staging.env sync
//! ```
//!
//! Runs the interactive authorization first if no token is cached yet.

use geosheet::pacer::pacer_for;
use geosheet::sheets::SheetsClient;
use geosheet::shopify::ShopifyOrderSource;
use geosheet::{SyncConfig, SyncDriver, SyncReport, build_http_client};

use super::{CommandError, authenticator, authorize};

/// Export all orders into the configured spreadsheet.
pub async fn run(config: &SyncConfig) -> Result<SyncReport, CommandError> {
    let http = build_http_client(config.http_timeout)?;

    let auth = authenticator(http.clone(), config).await?;
    if !auth.is_authorized().await? {
        tracing::warn!("No cached Google token, starting authorization");
        authorize::prompt_and_authorize(&auth).await?;
    }

    let source = ShopifyOrderSource::new(http.clone(), &config.shopify)?;
    let sink = SheetsClient::new(http, &config.sheets, auth)?;
    let pacer = pacer_for(config.write_delay);

    tracing::info!(
        store = %config.shopify.store,
        sheet = %config.sheets.sheet_name,
        "Exporting shipping addresses"
    );

    let driver = SyncDriver::new(source, sink, pacer, config.sync);
    Ok(driver.run().await?)
}
