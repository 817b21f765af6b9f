//! The export loop: orders in, rows out.
//!
//! # Flow
//!
//! 1. Ask the source for the total order count
//! 2. Fetch the first page (no cursor)
//! 3. For every position `i` in `0..count`, cross a page boundary when due,
//!    then write the order at local index `n` to row `i + header_row_offset`
//!
//! Rows are placed by sequence position only. Nothing is de-duplicated.
//!
//! # Page boundaries
//!
//! [`BoundaryMode::Legacy`] reproduces the historical behaviour: at every
//! position where `i % page_size == page_size - 1` the next page is requested
//! with the second-to-last order of the current page as cursor. The first
//! boundary lines up exactly; every later one writes the previous order a
//! second time.
//!
//! [`BoundaryMode::Exact`] fetches the next page once the current one is
//! used up, with the last order as cursor.

use std::fmt;
use std::str::FromStr;

use geosheet_core::{COLUMN_HEADERS, DestinationRow, OrderId, Page, RowNumber};
use tracing::{debug, info, instrument, warn};

use crate::error::SyncError;
use crate::pacer::Pacer;
use crate::sheets::RowSink;
use crate::shopify::OrderSource;

/// Largest page the order listing endpoint will return.
pub const MAX_PAGE_SIZE: u32 = 250;

/// How the driver decides when to request the next page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BoundaryMode {
    /// Fixed boundaries at `page_size - 1` with a second-to-last cursor.
    #[default]
    Legacy,
    /// Fetch when the page is exhausted, with a last-order cursor.
    Exact,
}

impl fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Exact => f.write_str("exact"),
        }
    }
}

impl FromStr for BoundaryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "exact" => Ok(Self::Exact),
            other => Err(format!("expected `legacy` or `exact`, got `{other}`")),
        }
    }
}

/// Pagination and row placement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Orders requested per page (1-250).
    pub page_size: u32,
    /// Row number of the first order; rows above it hold the header.
    pub header_row_offset: u64,
    /// Page boundary policy.
    pub boundary_mode: BoundaryMode,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            header_row_offset: 2,
            boundary_mode: BoundaryMode::Legacy,
        }
    }
}

impl SyncSettings {
    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            ));
        }
        // The legacy cursor is the second-to-last order of a page
        if self.boundary_mode == BoundaryMode::Legacy && self.page_size < 2 {
            return Err("legacy boundary mode needs a page size of at least 2".to_string());
        }
        if self.header_row_offset == 0 {
            return Err("header row offset must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Order count reported by the source at the start of the run.
    pub orders_expected: u64,
    /// Rows written to the sink.
    pub rows_written: u64,
    /// Pages fetched, including the first.
    pub pages_fetched: u64,
}

/// Drives one export from an [`OrderSource`] into a [`RowSink`].
#[derive(Debug)]
pub struct SyncDriver<S, W, P> {
    source: S,
    sink: W,
    pacer: P,
    settings: SyncSettings,
}

impl<S, W, P> SyncDriver<S, W, P>
where
    S: OrderSource,
    W: RowSink,
    P: Pacer,
{
    /// Create a driver.
    pub const fn new(source: S, sink: W, pacer: P, settings: SyncSettings) -> Self {
        Self {
            source,
            sink,
            pacer,
            settings,
        }
    }

    /// The order source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The row sink.
    pub const fn sink(&self) -> &W {
        &self.sink
    }

    /// Run the export to completion.
    ///
    /// Writes exactly as many rows as the source's count, or stops at the
    /// first failure. Rows already written stay written.
    ///
    /// # Errors
    ///
    /// - `SyncError::InvalidSettings` if the settings fail validation
    /// - `SyncError::Source` if the count or a page fetch fails
    /// - `SyncError::Auth` if the sink cannot obtain an access token
    /// - `SyncError::Write` if the sink rejects a row
    /// - `SyncError::OutOfRange` if a page holds fewer orders than needed
    #[instrument(skip(self), fields(page_size = self.settings.page_size, mode = %self.settings.boundary_mode))]
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        self.settings.validate().map_err(SyncError::InvalidSettings)?;

        let count = self.source.count().await?;
        info!(count, "Starting order export");
        info!("{}", COLUMN_HEADERS.join(", "));

        let mut report = SyncReport {
            orders_expected: count,
            ..SyncReport::default()
        };

        let mut page = self.fetch(None, &mut report).await?;
        let mut n: usize = 0;

        for i in 0..count {
            if self.at_boundary(i, n, &page) {
                let cursor = self.boundary_cursor(&page).ok_or(SyncError::OutOfRange {
                    position: i,
                    index: n,
                    page_len: page.len(),
                })?;
                page = self.fetch(Some(cursor), &mut report).await?;
                n = 0;
                info!(
                    position = i,
                    cursor = %cursor,
                    orders = page.len(),
                    "Fetched next page"
                );
            }

            let order = page.get(n).ok_or(SyncError::OutOfRange {
                position: i,
                index: n,
                page_len: page.len(),
            })?;

            let row_number = RowNumber::for_position(i, self.settings.header_row_offset);
            let row = DestinationRow::from_address(row_number, &order.shipping_address);

            self.pacer.ready().await;
            self.sink
                .write_row(&row)
                .await
                .map_err(|source| SyncError::write(row_number, source))?;

            debug!(row = %row_number, order_id = %order.id, "{row}");
            report.rows_written += 1;
            n += 1;
        }

        info!(
            rows = report.rows_written,
            pages = report.pages_fetched,
            "Order export complete"
        );
        Ok(report)
    }

    async fn fetch(
        &self,
        cursor: Option<OrderId>,
        report: &mut SyncReport,
    ) -> Result<Page, SyncError> {
        let page = self
            .source
            .fetch_page(cursor, self.settings.page_size)
            .await?;
        report.pages_fetched += 1;

        if page.is_empty() && cursor.is_some() {
            warn!(cursor = ?cursor, "Order source returned an empty page");
        }
        Ok(page)
    }

    /// Whether position `i` (local index `n`) needs the next page first.
    fn at_boundary(&self, i: u64, n: usize, page: &Page) -> bool {
        match self.settings.boundary_mode {
            BoundaryMode::Legacy => {
                let page_size = u64::from(self.settings.page_size);
                i % page_size == page_size - 1
            }
            BoundaryMode::Exact => i > 0 && n == page.len(),
        }
    }

    fn boundary_cursor(&self, page: &Page) -> Option<OrderId> {
        match self.settings.boundary_mode {
            BoundaryMode::Legacy => page.second_to_last_id(),
            BoundaryMode::Exact => page.last_id(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::testing::{CountingPacer, MockOrderSource, RecordingSink, fixture_orders};

    fn driver(
        orders: usize,
        page_size: u32,
        boundary_mode: BoundaryMode,
    ) -> SyncDriver<MockOrderSource, RecordingSink, CountingPacer> {
        SyncDriver::new(
            MockOrderSource::new(fixture_orders(orders)),
            RecordingSink::new(),
            CountingPacer::new(),
            SyncSettings {
                page_size,
                boundary_mode,
                ..SyncSettings::default()
            },
        )
    }

    #[test]
    fn test_boundary_mode_parse() {
        assert_eq!("legacy".parse::<BoundaryMode>().unwrap(), BoundaryMode::Legacy);
        assert_eq!("EXACT".parse::<BoundaryMode>().unwrap(), BoundaryMode::Exact);
        assert!("fastest".parse::<BoundaryMode>().is_err());
        assert_eq!(BoundaryMode::Exact.to_string(), "exact");
    }

    #[test]
    fn test_settings_validation() {
        assert!(SyncSettings::default().validate().is_ok());

        let too_big = SyncSettings {
            page_size: 251,
            ..SyncSettings::default()
        };
        assert!(too_big.validate().is_err());

        let zero = SyncSettings {
            page_size: 0,
            boundary_mode: BoundaryMode::Exact,
            ..SyncSettings::default()
        };
        assert!(zero.validate().is_err());

        let one_legacy = SyncSettings {
            page_size: 1,
            ..SyncSettings::default()
        };
        assert!(one_legacy.validate().is_err());
        let one_exact = SyncSettings {
            boundary_mode: BoundaryMode::Exact,
            ..one_legacy
        };
        assert!(one_exact.validate().is_ok());

        let no_rows = SyncSettings {
            header_row_offset: 0,
            ..SyncSettings::default()
        };
        assert!(no_rows.validate().is_err());
    }

    #[tokio::test]
    async fn test_legacy_small_pages_cursor_and_duplicate() {
        let driver = driver(7, 3, BoundaryMode::Legacy);
        let orders = fixture_orders(7);

        let report = driver.run().await.unwrap();

        assert_eq!(report.rows_written, 7);
        assert_eq!(report.pages_fetched, 3);
        // Second-to-last order of each page
        assert_eq!(
            driver.source().cursors(),
            vec![None, Some(orders[1].id), Some(orders[3].id)]
        );

        let cities: Vec<String> = driver
            .sink()
            .rows()
            .iter()
            .map(|row| row.cells()[2].to_string())
            .collect();
        // Order 4 is written twice; order 6 is never reached
        assert_eq!(
            cities,
            vec!["City 0", "City 1", "City 2", "City 3", "City 4", "City 4", "City 5"]
        );
    }

    #[tokio::test]
    async fn test_exact_small_pages_no_duplicates() {
        let driver = driver(7, 3, BoundaryMode::Exact);
        let orders = fixture_orders(7);

        let report = driver.run().await.unwrap();

        assert_eq!(report.rows_written, 7);
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(
            driver.source().cursors(),
            vec![None, Some(orders[2].id), Some(orders[5].id)]
        );

        let cities: Vec<String> = driver
            .sink()
            .rows()
            .iter()
            .map(|row| row.cells()[2].to_string())
            .collect();
        let expected: Vec<String> = (0..7).map(|k| format!("City {k}")).collect();
        assert_eq!(cities, expected);
    }

    #[tokio::test]
    async fn test_rows_follow_positions() {
        let driver = driver(5, 250, BoundaryMode::Legacy);

        driver.run().await.unwrap();

        let rows: Vec<u64> = driver.sink().rows().iter().map(|r| r.row().get()).collect();
        assert_eq!(rows, vec![2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_header_offset() {
        let driver = SyncDriver::new(
            MockOrderSource::new(fixture_orders(2)),
            RecordingSink::new(),
            CountingPacer::new(),
            SyncSettings {
                header_row_offset: 5,
                ..SyncSettings::default()
            },
        );

        driver.run().await.unwrap();

        let rows: Vec<u64> = driver.sink().rows().iter().map(|r| r.row().get()).collect();
        assert_eq!(rows, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_pacer_waits_before_every_write() {
        let driver = driver(12, 5, BoundaryMode::Exact);

        let report = driver.run().await.unwrap();

        assert_eq!(driver.pacer.calls(), 12);
        assert_eq!(report.rows_written, 12);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let driver = driver(0, 250, BoundaryMode::Legacy);

        let report = driver.run().await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                orders_expected: 0,
                rows_written: 0,
                pages_fetched: 1,
            }
        );
        assert!(driver.sink().rows().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_settings_fail_before_any_call() {
        let driver = driver(3, 1, BoundaryMode::Legacy);

        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, SyncError::InvalidSettings(_)));
        assert!(driver.source().cursors().is_empty());
    }
}
