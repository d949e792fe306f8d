//! Catalog and store access.
//!
//! The pipeline reads its desired subscription set and exchange connection
//! records from a relational catalog and writes top-of-book snapshots back
//! on a cadence. Both MySQL and PostgreSQL are supported; the two dialects
//! differ only in parameter placeholders and identifier case.

pub mod error;
pub mod sql;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::{Store, StoreConfig, StoreKind};
pub use types::{ExchangeRecord, MonitoredPair, PriceRow, SamplerPair};
