//! Google Sheets API v4 client for row writes.

use std::sync::Arc;

use async_trait::async_trait;
use geosheet_core::{CellValue, DestinationRow};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::auth::Authenticator;
use super::error::SheetsError;
use super::RowSink;
use crate::config::SheetsConfig;

/// Sheets API origin.
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/";

/// Values are parsed as if typed into the UI, so numbers stay numbers.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

/// Body of `spreadsheets.values.batchUpdate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest<'a> {
    value_input_option: &'static str,
    data: Vec<ValueRange<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: String,
    major_dimension: &'static str,
    values: [&'a [CellValue]; 1],
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Row sink backed by a Google spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: Url,
    spreadsheet_id: String,
    sheet_name: String,
    auth: Arc<Authenticator>,
}

impl SheetsClient {
    /// Create a client for the spreadsheet in `config`.
    ///
    /// # Errors
    ///
    /// Returns `SheetsError::InvalidUrl` if the API base URL is invalid.
    pub fn new(
        client: reqwest::Client,
        config: &SheetsConfig,
        auth: Arc<Authenticator>,
    ) -> Result<Self, SheetsError> {
        Self::with_base_url(client, SHEETS_BASE_URL, config, auth)
    }

    /// Create a client against an explicit API base URL.
    ///
    /// # Errors
    ///
    /// Returns `SheetsError::InvalidUrl` if `base_url` is not a valid URL.
    pub fn with_base_url(
        client: reqwest::Client,
        base_url: &str,
        config: &SheetsConfig,
        auth: Arc<Authenticator>,
    ) -> Result<Self, SheetsError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            auth,
        })
    }

    /// Endpoint for batch value updates on this spreadsheet.
    fn batch_update_url(&self) -> Result<Url, SheetsError> {
        let path = format!(
            "v4/spreadsheets/{}/values:batchUpdate",
            urlencoding::encode(&self.spreadsheet_id)
        );
        Ok(self.base_url.join(&path)?)
    }
}

#[async_trait]
impl RowSink for SheetsClient {
    #[instrument(skip(self, row), fields(row = %row.row()))]
    async fn write_row(&self, row: &DestinationRow) -> Result<(), SheetsError> {
        let request = BatchUpdateRequest {
            value_input_option: VALUE_INPUT_OPTION,
            data: vec![ValueRange {
                range: row.a1_range(&self.sheet_name),
                major_dimension: "ROWS",
                values: [row.cells().as_slice()],
            }],
        };

        let token = self.auth.access_token().await?;
        let response = self
            .client
            .post(self.batch_update_url()?)
            .bearer_auth(token.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Row written");
        Ok(())
    }
}
