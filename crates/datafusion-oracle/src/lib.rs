// SPDX-License-Identifier: Apache-2.0

//! Oracle catalog and scan surface for Apache Arrow DataFusion.
//!
//! This crate makes an Oracle database appear as an attached catalog
//! inside DataFusion. Table scans are translated into Oracle SQL —
//! including projection, comparison/conjunction/LIKE filter pushdown and
//! version-aware pagination — executed over a pooled native connection,
//! and streamed back as Arrow record batches.
//!
//! # Architecture
//!
//! ```text
//! SQL query
//!   ↓
//! OracleCatalog (CatalogProvider)
//!   ↓
//! OracleSchema (SchemaProvider, cached metadata)
//!   ↓
//! OracleTableProvider (TableProvider, pushdown)
//!   ↓
//! OracleScanExec (ExecutionPlan)
//!   ↓
//! Pooled connection fetch loop
//!   ↓
//! Arrow RecordBatches
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use datafusion::prelude::SessionContext;
//! use datafusion_oracle::{register_oracle, OracleCatalog};
//! use oracle_client::ConnectionParameters;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ConnectionParameters::parse(
//!     "host=db.example.com service=ORCLPDB user=scott password=tiger",
//! )?;
//! let catalog = OracleCatalog::attach("ora", params)?;
//!
//! let ctx = SessionContext::new();
//! register_oracle(&ctx, &catalog);
//! // SELECT * FROM ora.HR.EMPLOYEES WHERE EMP_ID = 42 LIMIT 10
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod ddl;
pub mod error;
pub mod exec;
pub mod functions;
pub mod provider;
pub mod pushdown;
pub mod sql;

pub use catalog::{OracleCatalog, OracleSchema};
pub use functions::register_oracle;
pub use provider::OracleTableProvider;
pub use sql::{ScanBindData, ROW_ID_COLUMN_ID};
