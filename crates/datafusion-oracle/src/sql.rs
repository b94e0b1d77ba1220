// SPDX-License-Identifier: Apache-2.0

//! Per-scan bind data and the version-aware SELECT builder

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};
use oracle_client::util::quote_identifier;
use oracle_client::{to_arrow_type, OracleColumnInfo, OracleConnectionPool, OracleError};

/// Projection id denoting Oracle's `ROWID` pseudo-column rather than a
/// positional column.
pub const ROW_ID_COLUMN_ID: usize = usize::MAX;

/// Everything one scan needs, snapshotted at planning time.
///
/// Immutable after bind and cheap to clone: the pool handle is a shared
/// reference, so cloning bumps a refcount. The engine may copy bind data
/// across planning stages.
#[derive(Debug, Clone)]
pub struct ScanBindData {
    /// Shared pool the scan borrows its connection from
    pub pool: Arc<OracleConnectionPool>,

    /// Owning schema, upper-cased
    pub schema: String,

    /// Table name, upper-cased
    pub table: String,

    /// Full column list of the table
    pub columns: Vec<OracleColumnInfo>,

    /// Arrow types parallel to `columns`
    pub arrow_types: Vec<DataType>,

    /// Pushed-down filter fragments, each already parenthesized
    pub filters: Vec<String>,

    /// Projected column ids; empty means all columns. May contain
    /// [`ROW_ID_COLUMN_ID`].
    pub projection: Vec<usize>,

    /// Row limit; `None` means unlimited
    pub limit: Option<usize>,

    /// Rows to skip before the limit; must be 0 when `limit` is unset
    pub offset: usize,

    /// Major version of the target server, used to pick the pagination
    /// dialect
    pub server_major_version: i32,

    /// Driver prefetch size for this scan
    pub fetch_size: u32,
}

impl ScanBindData {
    pub fn new(
        pool: Arc<OracleConnectionPool>,
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<OracleColumnInfo>,
        server_major_version: i32,
        fetch_size: u32,
    ) -> Self {
        let arrow_types = columns.iter().map(to_arrow_type).collect();
        Self {
            pool,
            schema: schema.into(),
            table: table.into(),
            columns,
            arrow_types,
            filters: Vec::new(),
            projection: Vec::new(),
            limit: None,
            offset: 0,
            server_major_version,
            fetch_size,
        }
    }

    /// Check the bind-data invariants.
    pub fn validate(&self) -> Result<(), OracleError> {
        for &id in &self.projection {
            if id != ROW_ID_COLUMN_ID && id >= self.columns.len() {
                return Err(OracleError::Bind(format!(
                    "projected column id {id} out of range for {} columns",
                    self.columns.len()
                )));
            }
        }
        if self.limit.is_none() && self.offset != 0 {
            return Err(OracleError::Bind(
                "offset requires a limit".to_string(),
            ));
        }
        Ok(())
    }

    /// Arrow schema of the table's full column list.
    pub fn table_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .zip(&self.arrow_types)
            .map(|(col, dt)| Field::new(&col.name, dt.clone(), col.nullable))
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Arrow schema of the projected result, in projection order. The
    /// row-id sentinel contributes a non-null `ROWID` text field; ids out
    /// of range are skipped, mirroring the emitted SELECT list.
    pub fn projected_schema(&self) -> SchemaRef {
        if self.projection.is_empty() {
            return self.table_schema();
        }
        let mut fields = Vec::with_capacity(self.projection.len());
        for &id in &self.projection {
            if id == ROW_ID_COLUMN_ID {
                fields.push(Field::new("ROWID", DataType::Utf8, false));
            } else if id < self.columns.len() {
                fields.push(Field::new(
                    &self.columns[id].name,
                    self.arrow_types[id].clone(),
                    self.columns[id].nullable,
                ));
            }
        }
        if fields.is_empty() {
            return self.table_schema();
        }
        Arc::new(Schema::new(fields))
    }

    /// Compose the Oracle SELECT for this scan.
    ///
    /// Servers of major version 12 and later get the ANSI
    /// `OFFSET .. ROWS FETCH FIRST .. ROWS ONLY` form; older servers get
    /// the classic `ROWNUM` wrapping.
    pub fn build_select_query(&self) -> String {
        let mut sql = String::from("SELECT ");

        if self.projection.is_empty() {
            sql.push('*');
        } else {
            let mut first = true;
            for &id in &self.projection {
                let item = if id == ROW_ID_COLUMN_ID {
                    "ROWID".to_string()
                } else if id < self.columns.len() {
                    quote_identifier(&self.columns[id].name)
                } else {
                    continue;
                };
                if !first {
                    sql.push_str(", ");
                }
                sql.push_str(&item);
                first = false;
            }
            if first {
                sql.push('*');
            }
        }

        sql.push_str(" FROM ");
        sql.push_str(&quote_identifier(&self.schema));
        sql.push('.');
        sql.push_str(&quote_identifier(&self.table));

        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }

        if let Some(limit) = self.limit {
            if self.server_major_version >= 12 {
                if self.offset > 0 {
                    sql.push_str(&format!(" OFFSET {} ROWS", self.offset));
                }
                sql.push_str(&format!(" FETCH FIRST {limit} ROWS ONLY"));
            } else {
                return format!(
                    "SELECT * FROM (SELECT ROWNUM rn__, t__.* FROM ({sql}) t__ \
                     WHERE ROWNUM <= {}) WHERE rn__ > {}",
                    self.offset + limit,
                    self.offset
                );
            }
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_client::ConnectionParameters;

    fn employees_bind() -> ScanBindData {
        let pool = Arc::new(OracleConnectionPool::new(
            ConnectionParameters::default(),
            8,
        ));
        let columns = vec![
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
        ];
        ScanBindData::new(pool, "HR", "EMPLOYEES", columns, 12, 10_000)
    }

    #[test]
    fn test_projection_and_limit_on_v12() {
        let mut bind = employees_bind();
        bind.projection = vec![0, 1];
        bind.limit = Some(10);
        assert_eq!(
            bind.build_select_query(),
            "SELECT \"EMP_ID\", \"NAME\" FROM \"HR\".\"EMPLOYEES\" FETCH FIRST 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_offset_only_appears_when_positive() {
        let mut bind = employees_bind();
        bind.limit = Some(10);
        bind.offset = 20;
        assert_eq!(
            bind.build_select_query(),
            "SELECT * FROM \"HR\".\"EMPLOYEES\" OFFSET 20 ROWS FETCH FIRST 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_legacy_pagination_uses_rownum() {
        let mut bind = employees_bind();
        bind.server_major_version = 11;
        bind.limit = Some(5);
        bind.offset = 10;
        assert_eq!(
            bind.build_select_query(),
            "SELECT * FROM (SELECT ROWNUM rn__, t__.* FROM \
             (SELECT * FROM \"HR\".\"EMPLOYEES\") t__ WHERE ROWNUM <= 15) WHERE rn__ > 10"
        );
    }

    #[test]
    fn test_filters_are_chained_with_and() {
        let mut bind = employees_bind();
        bind.filters = vec![
            "(\"EMP_ID\" = 42)".to_string(),
            "(\"NAME\" LIKE 'A%')".to_string(),
        ];
        assert_eq!(
            bind.build_select_query(),
            "SELECT * FROM \"HR\".\"EMPLOYEES\" WHERE (\"EMP_ID\" = 42) AND (\"NAME\" LIKE 'A%')"
        );
    }

    #[test]
    fn test_rowid_sentinel_and_out_of_range_ids() {
        let mut bind = employees_bind();
        bind.projection = vec![ROW_ID_COLUMN_ID, 1, 99];
        assert_eq!(
            bind.build_select_query(),
            "SELECT ROWID, \"NAME\" FROM \"HR\".\"EMPLOYEES\""
        );
    }

    #[test]
    fn test_projection_of_only_invalid_ids_falls_back_to_star() {
        let mut bind = employees_bind();
        bind.projection = vec![99];
        assert_eq!(
            bind.build_select_query(),
            "SELECT * FROM \"HR\".\"EMPLOYEES\""
        );
    }

    #[test]
    fn test_projected_schema_follows_projection_order() {
        let mut bind = employees_bind();
        bind.projection = vec![1, ROW_ID_COLUMN_ID];
        let schema = bind.projected_schema();
        assert_eq!(schema.field(0).name(), "NAME");
        assert_eq!(schema.field(1).name(), "ROWID");
        assert!(!schema.field(1).is_nullable());
    }

    #[test]
    fn test_empty_projection_keeps_full_schema() {
        let bind = employees_bind();
        let schema = bind.projected_schema();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(0).data_type(), &DataType::Int32);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_validate_rejects_offset_without_limit() {
        let mut bind = employees_bind();
        bind.offset = 5;
        assert!(bind.validate().is_err());
        bind.limit = Some(1);
        assert!(bind.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_projection() {
        let mut bind = employees_bind();
        bind.projection = vec![2];
        assert!(bind.validate().is_err());
        bind.projection = vec![ROW_ID_COLUMN_ID, 0];
        assert!(bind.validate().is_ok());
    }
}
