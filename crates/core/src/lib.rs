//! geosheet Core - Shared types library.
//!
//! This crate provides the domain types shared by the geosheet components:
//! - `geosheet` - Order source client, spreadsheet sink, and sync driver
//! - `geosheet-cli` - Command-line entry point
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! filesystem access. This keeps the row-mapping rules testable in isolation.
//!
//! # Modules
//!
//! - [`types`] - Order ids, shipping addresses, pages, and destination rows

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
