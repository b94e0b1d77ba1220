// SPDX-License-Identifier: Apache-2.0

//! Boundary conversion into DataFusion errors

use datafusion::common::DataFusionError;
use oracle_client::OracleError;

/// Wrap a client-layer error for the engine.
///
/// DataFusion surfaces external errors verbatim, so the context string
/// and driver message reach the user unchanged.
pub fn df_external(err: OracleError) -> DataFusionError {
    DataFusionError::External(Box::new(err))
}
