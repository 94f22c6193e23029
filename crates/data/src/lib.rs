//! Price history storage for theta.
//!
//! This crate provides:
//! - CSV reading/writing of daily bars
//! - A directory-backed `MarketDataProvider`

pub mod csv_storage;
pub mod provider;

pub use csv_storage::CsvStorage;
pub use provider::CsvPriceProvider;
