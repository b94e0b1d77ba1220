//! Thread-safe wrapper over one native Oracle connection

use std::cmp;
use std::sync::{Mutex, MutexGuard};

use arrow::array::RecordBatch;
use arrow_schema::SchemaRef;
use tracing::{debug, info};

use crate::config::ConnectionParameters;
use crate::error::{OracleError, Result};
use crate::util::lock;
use crate::value::{native_rep, ColumnSink};

/// Rows per record batch handed to the scan callback.
///
/// This matches the engine's standard batch size; the driver's prefetch
/// (`fetch_size`) is configured independently per scan.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Exclusive owner of one native driver connection.
///
/// The inner mutex serializes prepare/execute/fetch on the same physical
/// connection. Real exclusion is provided by the pool's acquire/release
/// discipline — a connection is borrowed for the duration of a scan — and
/// the mutex guarantees safety even if a caller violates that contract,
/// at the cost of blocking concurrent callers.
///
/// The process-wide ODPI-C context is owned by the driver crate and
/// lazily initialized once under its own lock; all connections share it.
pub struct OracleConnection {
    inner: Mutex<oracle::Connection>,
    params: ConnectionParameters,
}

impl OracleConnection {
    /// Open a connection using the given parameters.
    pub fn open(params: &ConnectionParameters) -> Result<Self> {
        let connect_string = params.build_connect_string();
        debug!(connect_string = %connect_string, user = %params.user, "opening oracle connection");

        let conn = oracle::Connection::connect(&params.user, &params.password, &connect_string)
            .map_err(|e| OracleError::connect("OracleConnection::open", e))?;

        info!(host = %params.host, port = params.port, "oracle connection established");
        Ok(Self {
            inner: Mutex::new(conn),
            params: params.clone(),
        })
    }

    /// Parameters this connection was opened with.
    pub fn params(&self) -> &ConnectionParameters {
        &self.params
    }

    /// Lock the underlying driver connection.
    pub(crate) fn raw(&self) -> MutexGuard<'_, oracle::Connection> {
        lock(&self.inner)
    }

    /// Server version as `(major, banner)`.
    ///
    /// The major version defaults to 12 when the server does not report
    /// one; the banner keeps the driver message in that case.
    pub fn server_version(&self) -> (i32, String) {
        let conn = self.raw();
        match conn.server_version() {
            Ok((version, _banner)) => (version.major(), version.to_string()),
            Err(e) => (12, format!("unknown: {e}")),
        }
    }

    /// Run a SELECT and deliver rows as bounded record batches.
    ///
    /// `schema` is the projected Arrow schema of the result. Batches of
    /// [`DEFAULT_BATCH_SIZE`] rows are passed to `on_batch`; a `false`
    /// return stops the fetch immediately and no further batch is
    /// delivered. A partial batch is flushed when the result set is
    /// exhausted. Cells the driver cannot convert become typed nulls
    /// rather than failing the scan.
    pub fn execute_query(
        &self,
        sql: &str,
        schema: &SchemaRef,
        fetch_size: u32,
        on_batch: &mut dyn FnMut(RecordBatch) -> bool,
    ) -> Result<()> {
        let conn = self.raw();

        let mut stmt = conn
            .statement(sql)
            .fetch_array_size(fetch_size)
            .build()
            .map_err(|e| OracleError::prepare("execute_query::prepare", e))?;

        let rows = stmt
            .query(&[])
            .map_err(|e| OracleError::execute("execute_query::execute", e))?;

        // Pick a driver-native representation per result column from the
        // metadata the executed statement reports.
        let column_info = rows.column_info().to_vec();
        let fetched_columns = cmp::min(column_info.len(), schema.fields().len());
        let reps: Vec<_> = column_info[..fetched_columns]
            .iter()
            .map(|info| native_rep(info.oracle_type()))
            .collect();

        let mut sinks: Vec<ColumnSink> = schema
            .fields()
            .iter()
            .map(|field| ColumnSink::new(field.data_type()))
            .collect();

        let mut rows_in_batch = 0usize;
        for row_result in rows {
            let row = row_result.map_err(|e| OracleError::fetch("execute_query::fetch", e))?;

            for (idx, sink) in sinks.iter_mut().enumerate() {
                if idx < fetched_columns {
                    sink.append_from_row(&row, idx, reps[idx]);
                } else {
                    sink.append_null();
                }
            }

            rows_in_batch += 1;
            if rows_in_batch == DEFAULT_BATCH_SIZE {
                let batch = finish_batch(schema, &mut sinks)?;
                rows_in_batch = 0;
                if !on_batch(batch) {
                    return Ok(());
                }
            }
        }

        if rows_in_batch > 0 {
            let batch = finish_batch(schema, &mut sinks)?;
            on_batch(batch);
        }
        Ok(())
    }

    /// Execute a single DML or DDL statement and commit it.
    pub fn execute_dml(&self, sql: &str) -> Result<()> {
        if self.params.read_only {
            return Err(OracleError::NotImplemented(
                "database is attached in read-only mode".to_string(),
            ));
        }

        let conn = self.raw();
        debug!(sql = %sql, "executing oracle dml");
        conn.execute(sql, &[])
            .map_err(|e| OracleError::execute("execute_dml::execute", e))?;
        conn.commit()
            .map_err(|e| OracleError::execute("execute_dml::commit", e))?;
        Ok(())
    }
}

impl std::fmt::Debug for OracleConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConnection")
            .field("host", &self.params.host)
            .field("port", &self.params.port)
            .field("user", &self.params.user)
            .finish()
    }
}

fn finish_batch(schema: &SchemaRef, sinks: &mut [ColumnSink]) -> Result<RecordBatch> {
    let arrays = sinks.iter_mut().map(|sink| sink.finish()).collect();
    RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| OracleError::fetch("execute_query::batch", e))
}
