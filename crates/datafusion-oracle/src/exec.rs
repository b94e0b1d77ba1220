// SPDX-License-Identifier: Apache-2.0

//! ExecutionPlan driving the Oracle fetch loop.
//!
//! The driver is synchronous: every call that touches it blocks its OS
//! thread for the duration of the network round-trip. Each partition
//! therefore runs the fetch loop on a blocking thread and forwards
//! batches over a bounded channel; the stream side dropping its receiver
//! is the early-termination signal that stops the fetch.

use std::any::Any;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use arrow::array::RecordBatch;
use arrow_schema::SchemaRef;
use datafusion::common::stats::Precision;
use datafusion::common::{DataFusionError, Result as DFResult, Statistics};
use datafusion::execution::TaskContext;
use datafusion::physical_expr::EquivalenceProperties;
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionMode, ExecutionPlan, Partitioning, PlanProperties,
    RecordBatchStream, SendableRecordBatchStream,
};
use futures::Stream;
use oracle_client::{OracleConnection, OracleConnectionPool};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::df_external;
use crate::sql::ScanBindData;

/// Row estimate reported in the absence of dictionary statistics.
// TODO: read ALL_TABLES.NUM_ROWS once ANALYZE'd tables are common enough
// among users to matter.
const DEFAULT_ROW_ESTIMATE: usize = 100_000;

/// One unit of scan work: a rowid range, empty strings meaning open ends.
#[derive(Debug, Clone, Default)]
pub struct ScanTask {
    pub rowid_lo: String,
    pub rowid_hi: String,
}

/// State shared by every worker of one scan: the task list and a cursor
/// over the next unclaimed task.
#[derive(Debug)]
pub struct OracleScanGlobalState {
    tasks: Vec<ScanTask>,
    cursor: Mutex<usize>,
    max_threads: usize,
}

impl OracleScanGlobalState {
    /// Plan the task set for a scan. A single open-ended task is planned
    /// per scan; `max_threads` is the bound advertised to the scheduler.
    pub fn new(_bind: &ScanBindData) -> Self {
        Self {
            tasks: vec![ScanTask::default()],
            cursor: Mutex::new(0),
            max_threads: 1,
        }
    }

    /// Claim the next unclaimed task, if any.
    pub fn next_task(&self) -> Option<ScanTask> {
        let mut cursor = oracle_client::util::lock(&self.cursor);
        let task = self.tasks.get(*cursor).cloned();
        if task.is_some() {
            *cursor += 1;
        }
        task
    }

    /// Upper bound on useful worker threads for this scan.
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }
}

/// Per-worker scan state: the borrowed connection and a done flag.
struct OracleScanLocalState {
    connection: Arc<OracleConnection>,
    done: bool,
}

impl OracleScanLocalState {
    fn init(pool: &OracleConnectionPool) -> Result<Self, oracle_client::OracleError> {
        Ok(Self {
            connection: pool.acquire()?,
            done: false,
        })
    }
}

/// Leaf ExecutionPlan scanning one Oracle table.
#[derive(Debug)]
pub struct OracleScanExec {
    bind: ScanBindData,
    projected_schema: SchemaRef,
    global: Arc<OracleScanGlobalState>,
    properties: PlanProperties,
}

impl OracleScanExec {
    pub fn new(bind: ScanBindData) -> Self {
        let projected_schema = bind.projected_schema();
        let global = Arc::new(OracleScanGlobalState::new(&bind));

        let properties = PlanProperties::new(
            EquivalenceProperties::new(projected_schema.clone()),
            Partitioning::UnknownPartitioning(global.max_threads()),
            ExecutionMode::Bounded,
        );

        Self {
            bind,
            projected_schema,
            global,
            properties,
        }
    }
}

impl DisplayAs for OracleScanExec {
    fn fmt_as(&self, _t: DisplayFormatType, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "OracleScanExec: table={}.{}, filters={}, limit={:?}",
            self.bind.schema,
            self.bind.table,
            self.bind.filters.len(),
            self.bind.limit,
        )
    }
}

impl ExecutionPlan for OracleScanExec {
    fn name(&self) -> &str {
        "OracleScanExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.projected_schema.clone()
    }

    fn properties(&self) -> &PlanProperties {
        &self.properties
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        // Leaf node
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        if !children.is_empty() {
            return Err(DataFusionError::Internal(
                "OracleScanExec should have no children".to_string(),
            ));
        }
        Ok(self)
    }

    fn execute(
        &self,
        partition: usize,
        _context: Arc<TaskContext>,
    ) -> DFResult<SendableRecordBatchStream> {
        if partition >= self.global.max_threads() {
            return Err(DataFusionError::Execution(format!(
                "invalid partition index: {partition}"
            )));
        }

        let (tx, rx) = mpsc::channel(2);
        let bind = self.bind.clone();
        let global = Arc::clone(&self.global);
        let schema = self.projected_schema.clone();

        tokio::task::spawn_blocking(move || scan_worker(bind, global, schema, tx));

        Ok(Box::pin(OracleScanStream {
            schema: self.projected_schema.clone(),
            inner: rx,
        }))
    }

    fn statistics(&self) -> DFResult<Statistics> {
        let mut statistics = Statistics::new_unknown(&self.projected_schema);
        statistics.num_rows = Precision::Inexact(DEFAULT_ROW_ESTIMATE);
        Ok(statistics)
    }
}

/// The blocking side of one scan worker.
///
/// Claims tasks from the global state, borrows a pooled connection for
/// the duration, and forwards batches into the channel. A closed channel
/// (the stream was dropped) makes the fetch callback return `false`,
/// which stops the driver loop without delivering further batches.
fn scan_worker(
    bind: ScanBindData,
    global: Arc<OracleScanGlobalState>,
    schema: SchemaRef,
    tx: mpsc::Sender<DFResult<RecordBatch>>,
) {
    let mut local = match OracleScanLocalState::init(&bind.pool) {
        Ok(local) => local,
        Err(e) => {
            let _ = tx.blocking_send(Err(df_external(e)));
            return;
        }
    };

    while !local.done {
        let Some(_task) = global.next_task() else {
            break;
        };

        let sql = bind.build_select_query();
        debug!(sql = %sql, "executing oracle scan");

        let result = local.connection.execute_query(
            &sql,
            &schema,
            bind.fetch_size,
            &mut |batch| tx.blocking_send(Ok(batch)).is_ok(),
        );

        if let Err(e) = result {
            let _ = tx.blocking_send(Err(df_external(e)));
            local.done = true;
        }
    }

    bind.pool.release(local.connection);
}

/// Record-batch stream fed by the blocking fetch loop.
struct OracleScanStream {
    schema: SchemaRef,
    inner: mpsc::Receiver<DFResult<RecordBatch>>,
}

impl Stream for OracleScanStream {
    type Item = DFResult<RecordBatch>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_recv(cx)
    }
}

impl RecordBatchStream for OracleScanStream {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_client::{ConnectionParameters, OracleColumnInfo};

    fn bind() -> ScanBindData {
        let pool = Arc::new(OracleConnectionPool::new(
            ConnectionParameters::default(),
            8,
        ));
        ScanBindData::new(
            pool,
            "HR",
            "EMPLOYEES",
            vec![OracleColumnInfo {
                name: "EMP_ID".to_string(),
                oracle_type_name: "NUMBER".to_string(),
                precision: 9,
                scale: 0,
                char_length: 0,
                nullable: false,
            }],
            12,
            10_000,
        )
    }

    #[test]
    fn test_global_state_hands_out_each_task_once() {
        let bind = bind();
        let global = OracleScanGlobalState::new(&bind);
        assert_eq!(global.max_threads(), 1);

        let first = global.next_task();
        assert!(first.is_some());
        // The planned task is open-ended on both sides.
        let task = first.unwrap();
        assert!(task.rowid_lo.is_empty());
        assert!(task.rowid_hi.is_empty());

        assert!(global.next_task().is_none());
        assert!(global.next_task().is_none());
    }

    #[test]
    fn test_exec_reports_row_estimate() {
        let exec = OracleScanExec::new(bind());
        let statistics = exec.statistics().unwrap();
        assert_eq!(statistics.num_rows, Precision::Inexact(DEFAULT_ROW_ESTIMATE));
    }

    #[test]
    fn test_exec_schema_is_projected() {
        let mut bind = bind();
        bind.projection = vec![0];
        let exec = OracleScanExec::new(bind);
        assert_eq!(exec.schema().fields().len(), 1);
        assert_eq!(exec.schema().field(0).name(), "EMP_ID");
    }

    #[tokio::test]
    async fn test_invalid_partition_is_rejected() {
        let exec = OracleScanExec::new(bind());
        let context = Arc::new(TaskContext::default());
        assert!(exec.execute(7, context).is_err());
    }
}
