//! Oracle client layer for analytical scans.
//!
//! This crate wraps the native Oracle driver (`oracle`, the ODPI-C binding)
//! with the pieces an embedded analytical engine needs to treat an Oracle
//! database as a readable catalog:
//!
//! - connection parameters with key-value / EasyConnect parsing
//! - a thread-safe connection wrapper driving the fetch loop into Arrow
//!   record batches with an early-termination contract
//! - a bounded free-list connection pool shared between the catalog and
//!   every active scan
//! - data-dictionary readers for tables and columns
//! - the bidirectional type mapping between Oracle type descriptors and
//!   Arrow types, and between driver-native cells and Arrow values
//!
//! The DataFusion-facing surface (catalog providers, pushdown, execution
//! plans) lives in the `datafusion-oracle` crate; this crate depends on
//! Arrow only.

pub mod config;
pub mod connection;
pub mod error;
pub mod metadata;
pub mod pool;
pub mod types;
pub mod util;
pub mod value;

pub use config::ConnectionParameters;
pub use connection::{OracleConnection, DEFAULT_BATCH_SIZE};
pub use error::{OracleError, Result};
pub use metadata::{OracleColumnInfo, OracleTableInfo};
pub use pool::{OracleConnectionPool, PoolState, DEFAULT_POOL_CAPACITY};
pub use types::{to_arrow_type, to_oracle_ddl};
