// SPDX-License-Identifier: Apache-2.0

//! SQL functions exposed alongside the catalog:
//! `oracle_scan`, `oracle_info` and `oracle_clear_cache`.

use std::any::Any;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use datafusion::catalog::TableProvider;
use datafusion::common::{plan_err, DataFusionError, Result as DFResult, ScalarValue};
use datafusion::datasource::function::TableFunctionImpl;
use datafusion::datasource::MemTable;
use datafusion::logical_expr::{
    ColumnarValue, Expr, ScalarUDF, ScalarUDFImpl, Signature, Volatility,
};
use datafusion::prelude::SessionContext;

use crate::catalog::OracleCatalog;
use crate::error::df_external;

/// Register the catalog and its SQL functions with a session.
pub fn register_oracle(ctx: &SessionContext, catalog: &Arc<OracleCatalog>) {
    ctx.register_catalog(catalog.name(), catalog.clone());
    ctx.register_udtf(
        "oracle_scan",
        Arc::new(OracleScanFunction {
            catalog: catalog.clone(),
        }),
    );
    ctx.register_udtf(
        "oracle_info",
        Arc::new(OracleInfoFunction {
            catalog: catalog.clone(),
        }),
    );
    ctx.register_udf(ScalarUDF::new_from_impl(OracleClearCacheFunction::new(
        catalog.clone(),
    )));
}

fn literal_string(expr: Option<&Expr>) -> Option<&String> {
    match expr {
        Some(Expr::Literal(ScalarValue::Utf8(Some(s)))) => Some(s),
        _ => None,
    }
}

/// `oracle_scan(schema_name, table_name)` — the scan surface as a table
/// function, with projection and complex-filter pushdown enabled.
#[derive(Debug)]
pub struct OracleScanFunction {
    catalog: Arc<OracleCatalog>,
}

impl TableFunctionImpl for OracleScanFunction {
    fn call(&self, args: &[Expr]) -> DFResult<Arc<dyn TableProvider>> {
        if args.len() != 2 {
            return plan_err!("oracle_scan requires exactly 2 arguments: (schema_name, table_name)");
        }
        let (Some(schema_name), Some(table_name)) =
            (literal_string(args.first()), literal_string(args.get(1)))
        else {
            return plan_err!("oracle_scan arguments must be string literals");
        };

        let schema = self.catalog.schema_entry(schema_name);
        match schema.load_table(table_name).map_err(df_external)? {
            Some(provider) => Ok(provider),
            None => plan_err!("oracle table not found: {schema_name}.{table_name}"),
        }
    }
}

/// `oracle_info(db_name)` — key/value rows describing the attached
/// database: at minimum the server version and the catalog type.
#[derive(Debug)]
pub struct OracleInfoFunction {
    catalog: Arc<OracleCatalog>,
}

impl TableFunctionImpl for OracleInfoFunction {
    fn call(&self, args: &[Expr]) -> DFResult<Arc<dyn TableProvider>> {
        if args.len() != 1 {
            return plan_err!("oracle_info requires exactly 1 argument: (db_name)");
        }
        let Some(db_name) = literal_string(args.first()) else {
            return plan_err!("oracle_info argument must be a string literal");
        };
        if db_name != self.catalog.name() {
            return plan_err!("database '{db_name}' is not an attached oracle database");
        }

        let server_version = self.catalog.server_version().map_err(df_external)?;

        let schema = Arc::new(Schema::new(vec![
            Field::new("key", DataType::Utf8, false),
            Field::new("value", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["server_version", "catalog_type"])) as ArrayRef,
                Arc::new(StringArray::from(vec![server_version.as_str(), "oracle"])),
            ],
        )?;
        Ok(Arc::new(MemTable::try_new(schema, vec![vec![batch]])?))
    }
}

/// `oracle_clear_cache(db_name)` — drop cached metadata and idle
/// connections; returns 1 on success and 0 on any error, never failing
/// the query.
#[derive(Debug)]
pub struct OracleClearCacheFunction {
    catalog: Arc<OracleCatalog>,
    signature: Signature,
}

impl OracleClearCacheFunction {
    pub fn new(catalog: Arc<OracleCatalog>) -> Self {
        Self {
            catalog,
            signature: Signature::exact(vec![DataType::Utf8], Volatility::Volatile),
        }
    }
}

impl ScalarUDFImpl for OracleClearCacheFunction {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "oracle_clear_cache"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _arg_types: &[DataType]) -> DFResult<DataType> {
        Ok(DataType::Int32)
    }

    fn invoke(&self, args: &[ColumnarValue]) -> DFResult<ColumnarValue> {
        let arg = args
            .first()
            .ok_or_else(|| DataFusionError::Execution("oracle_clear_cache needs an argument".to_string()))?;

        let clear = |name: Option<&str>| -> i32 {
            match name {
                Some(name) if name == self.catalog.name() => {
                    self.catalog.clear_cache();
                    1
                }
                _ => 0,
            }
        };

        match arg {
            ColumnarValue::Scalar(ScalarValue::Utf8(value)) => Ok(ColumnarValue::Scalar(
                ScalarValue::Int32(Some(clear(value.as_deref()))),
            )),
            ColumnarValue::Array(array) => {
                let names = array
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| {
                        DataFusionError::Execution(
                            "oracle_clear_cache expects a string argument".to_string(),
                        )
                    })?;
                let results: Int32Array = names
                    .iter()
                    .map(|name| Some(clear(name)))
                    .collect();
                Ok(ColumnarValue::Array(Arc::new(results)))
            }
            _ => Ok(ColumnarValue::Scalar(ScalarValue::Int32(Some(0)))),
        }
    }
}
