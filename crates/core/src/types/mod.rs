//! Core types for geosheet.
//!
//! This module provides type-safe wrappers for the order export domain.

pub mod address;
pub mod id;
pub mod order;
pub mod row;

pub use address::ShippingAddress;
pub use id::*;
pub use order::{Order, Page};
pub use row::{COLUMN_HEADERS, CellValue, DestinationRow, RowNumber};
