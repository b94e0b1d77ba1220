// SPDX-License-Identifier: Apache-2.0

//! TableProvider for one Oracle table

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use arrow_schema::SchemaRef;
use datafusion::catalog::{Session, TableProvider};
use datafusion::common::Result as DFResult;
use datafusion::logical_expr::{Expr, TableProviderFilterPushDown, TableType};
use datafusion::physical_plan::ExecutionPlan;
use oracle_client::{OracleColumnInfo, OracleConnectionPool};

use crate::exec::OracleScanExec;
use crate::pushdown::{expr_to_sql, pushdown_filters};
use crate::sql::ScanBindData;

/// A scannable Oracle table or view.
///
/// Holds the column list read from the data dictionary; `scan` snapshots
/// it, together with the server version and fetch size, into immutable
/// per-scan bind data.
pub struct OracleTableProvider {
    schema_name: String,
    table_name: String,
    columns: Vec<OracleColumnInfo>,
    is_view: bool,
    table_schema: SchemaRef,
    pool: Arc<OracleConnectionPool>,
    server_major_version: i32,
    fetch_size: u32,
}

impl OracleTableProvider {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        columns: Vec<OracleColumnInfo>,
        is_view: bool,
        pool: Arc<OracleConnectionPool>,
        server_major_version: i32,
        fetch_size: u32,
    ) -> Self {
        let schema_name = schema_name.into();
        let table_name = table_name.into();
        let bind = ScanBindData::new(
            pool.clone(),
            schema_name.clone(),
            table_name.clone(),
            columns.clone(),
            server_major_version,
            fetch_size,
        );
        let table_schema = bind.table_schema();
        Self {
            schema_name,
            table_name,
            columns,
            is_view,
            table_schema,
            pool,
            server_major_version,
            fetch_size,
        }
    }

    /// Fresh bind data snapshotting this table's scan inputs.
    pub fn bind_data(&self) -> ScanBindData {
        ScanBindData::new(
            self.pool.clone(),
            self.schema_name.clone(),
            self.table_name.clone(),
            self.columns.clone(),
            self.server_major_version,
            self.fetch_size,
        )
    }
}

impl std::fmt::Debug for OracleTableProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleTableProvider")
            .field("schema", &self.schema_name)
            .field("table", &self.table_name)
            .field("columns", &self.columns.len())
            .field("is_view", &self.is_view)
            .finish()
    }
}

#[async_trait]
impl TableProvider for OracleTableProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.table_schema.clone()
    }

    fn table_type(&self) -> TableType {
        if self.is_view {
            TableType::View
        } else {
            TableType::Base
        }
    }

    fn supports_filters_pushdown(
        &self,
        filters: &[&Expr],
    ) -> DFResult<Vec<TableProviderFilterPushDown>> {
        // A filter the rewriter can render runs entirely on the Oracle
        // side; everything else stays in the engine.
        Ok(filters
            .iter()
            .map(|filter| {
                if expr_to_sql(filter, &self.columns).is_some() {
                    TableProviderFilterPushDown::Exact
                } else {
                    TableProviderFilterPushDown::Unsupported
                }
            })
            .collect())
    }

    async fn scan(
        &self,
        _session: &dyn Session,
        projection: Option<&Vec<usize>>,
        filters: &[Expr],
        limit: Option<usize>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        let mut bind = self.bind_data();
        if let Some(projection) = projection {
            bind.projection = projection.clone();
        }
        pushdown_filters(&mut bind, filters);
        bind.limit = limit;
        bind.validate().map_err(crate::error::df_external)?;

        Ok(Arc::new(OracleScanExec::new(bind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::DataType;
    use datafusion::common::Column;
    use datafusion::logical_expr::lit;
    use oracle_client::{ConnectionParameters, OracleTableInfo};

    fn provider_for(table_name: &str, is_view: bool) -> OracleTableProvider {
        let pool = Arc::new(OracleConnectionPool::new(
            ConnectionParameters::default(),
            8,
        ));
        OracleTableProvider::new(
            "HR",
            table_name,
            vec![
                OracleColumnInfo {
                    name: "EMP_ID".to_string(),
                    oracle_type_name: "NUMBER".to_string(),
                    precision: 9,
                    scale: 0,
                    char_length: 0,
                    nullable: false,
                },
                OracleColumnInfo {
                    name: "NAME".to_string(),
                    oracle_type_name: "VARCHAR2".to_string(),
                    precision: 0,
                    scale: -127,
                    char_length: 50,
                    nullable: true,
                },
            ],
            is_view,
            pool,
            12,
            10_000,
        )
    }

    fn provider() -> OracleTableProvider {
        provider_for("EMPLOYEES", false)
    }

    #[test]
    fn test_schema_reflects_column_mapping() {
        let provider = provider();
        let schema = provider.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int32);
        assert!(!schema.field(0).is_nullable());
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert!(schema.field(1).is_nullable());
    }

    #[test]
    fn test_table_type_follows_dictionary_classification() {
        // A row ALL_OBJECTS reports with OBJECT_TYPE = 'VIEW' surfaces as
        // a view; plain tables stay base tables.
        let view_info = OracleTableInfo {
            schema: "HR".to_string(),
            name: "EMP_SALARIES_V".to_string(),
            is_view: true,
        };
        let view = provider_for(&view_info.name, view_info.is_view);
        assert_eq!(view.table_type(), TableType::View);

        assert_eq!(provider().table_type(), TableType::Base);
    }

    #[test]
    fn test_pushdown_classification() {
        let provider = provider();
        let pushable = Expr::Column(Column::new_unqualified("EMP_ID")).eq(lit(42i32));
        let not_pushable = Expr::Not(Box::new(
            Expr::Column(Column::new_unqualified("NAME")).eq(lit("x")),
        ));

        let classes = provider
            .supports_filters_pushdown(&[&pushable, &not_pushable])
            .unwrap();
        assert_eq!(
            classes,
            vec![
                TableProviderFilterPushDown::Exact,
                TableProviderFilterPushDown::Unsupported,
            ]
        );
    }
}
