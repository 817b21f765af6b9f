//! Spreadsheet destination rows.
//!
//! Each order maps to exactly one row. The row number comes from the order's
//! position in the run, never from its id.

use core::fmt;

use serde::Serialize;

use super::address::ShippingAddress;

/// Column headers, in cell order.
pub const COLUMN_HEADERS: [&str; 8] = [
    "Address 1",
    "Address 2",
    "City",
    "State",
    "Country",
    "Zip",
    "Latitude",
    "Longitude",
];

/// A 1-based spreadsheet row number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RowNumber(u64);

impl RowNumber {
    /// Create a row number.
    #[must_use]
    pub const fn new(row: u64) -> Self {
        Self(row)
    }

    /// Row for the order at 0-based `position` in the run, shifted past
    /// `header_offset - 1` reserved rows.
    ///
    /// ```
    /// use geosheet_core::RowNumber;
    ///
    /// // Row 1 holds the header, so the first order lands on row 2.
    /// assert_eq!(RowNumber::for_position(0, 2), RowNumber::new(2));
    /// assert_eq!(RowNumber::for_position(259, 2), RowNumber::new(261));
    /// ```
    #[must_use]
    pub const fn for_position(position: u64, header_offset: u64) -> Self {
        Self(position + header_offset)
    }

    /// Get the underlying row number.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cell value.
///
/// Serializes as a bare JSON string or number so the spreadsheet's
/// user-entered parsing keeps numbers numeric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Text cell.
    Text(String),
    /// Numeric cell.
    Number(f64),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// One spreadsheet row holding an order's shipping address.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRow {
    row: RowNumber,
    cells: [CellValue; 8],
}

impl DestinationRow {
    /// Build the row for an address.
    ///
    /// Missing text fields become empty cells. Missing coordinates become `0`,
    /// the value the sheet has always held for ungeocoded addresses.
    #[must_use]
    pub fn from_address(row: RowNumber, address: &ShippingAddress) -> Self {
        let text = |value: Option<&str>| CellValue::Text(value.unwrap_or_default().to_owned());
        let number = |value: Option<f64>| CellValue::Number(value.unwrap_or(0.0));

        Self {
            row,
            cells: [
                text(address.address1.as_deref()),
                text(address.address2.as_deref()),
                text(address.city.as_deref()),
                text(address.province.as_deref()),
                text(address.country.as_deref()),
                text(address.zip.as_deref()),
                number(address.latitude),
                number(address.longitude),
            ],
        }
    }

    /// Target row number.
    #[must_use]
    pub const fn row(&self) -> RowNumber {
        self.row
    }

    /// Cells in column order.
    #[must_use]
    pub const fn cells(&self) -> &[CellValue; 8] {
        &self.cells
    }

    /// A1 range covering this row on `sheet`, e.g. `sheet1!A2:M2`.
    #[must_use]
    pub fn a1_range(&self, sheet: &str) -> String {
        format!("{sheet}!A{row}:M{row}", row = self.row)
    }
}

impl fmt::Display for DestinationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.cells.iter().map(ToString::to_string).collect();
        write!(f, "{}", cells.join(", "))
    }
}
