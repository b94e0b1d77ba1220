//! Data-dictionary readers for tables and columns

use tracing::debug;

use crate::connection::OracleConnection;
use crate::error::{OracleError, Result};
use crate::types::UNSPECIFIED_SCALE;
use crate::util::to_upper;

/// One table or view owned by a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleTableInfo {
    pub schema: String,
    pub name: String,
    pub is_view: bool,
}

/// One column as described by `ALL_TAB_COLUMNS`.
///
/// `precision` is 0 when unset; `scale` is −127 when unspecified, which
/// is how Oracle reports a plain `NUMBER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleColumnInfo {
    pub name: String,
    pub oracle_type_name: String,
    pub precision: i32,
    pub scale: i32,
    pub char_length: i32,
    pub nullable: bool,
}

const LIST_TABLES_SQL: &str = "SELECT OBJECT_NAME, OBJECT_TYPE \
     FROM ALL_OBJECTS \
     WHERE OWNER = :owner AND OBJECT_TYPE IN ('TABLE', 'VIEW') \
     ORDER BY OBJECT_NAME";

const TABLE_INFO_SQL: &str = "SELECT OBJECT_NAME, OBJECT_TYPE \
     FROM ALL_OBJECTS \
     WHERE OWNER = :owner AND OBJECT_NAME = :object_name \
       AND OBJECT_TYPE IN ('TABLE', 'VIEW')";

const LIST_COLUMNS_SQL: &str = "SELECT COLUMN_NAME, DATA_TYPE, DATA_PRECISION, DATA_SCALE, \
            CHAR_LENGTH, NULLABLE \
     FROM ALL_TAB_COLUMNS \
     WHERE OWNER = :owner AND TABLE_NAME = :table_name \
     ORDER BY COLUMN_ID";

impl OracleConnection {
    /// List the tables and views owned by `schema`.
    ///
    /// Schemas the connected user cannot see simply produce an empty
    /// list; that is a lookup miss, not an error.
    pub fn list_tables(&self, schema: &str) -> Result<Vec<OracleTableInfo>> {
        let owner = to_upper(schema);
        debug!(schema = %owner, "listing oracle tables");

        let conn = self.raw();
        let rows = conn
            .query_as::<(String, String)>(LIST_TABLES_SQL, &[&owner])
            .map_err(|e| OracleError::metadata("list_tables::execute", e))?;

        let mut tables = Vec::new();
        for row in rows {
            let (name, object_type) = row.map_err(|e| OracleError::metadata("list_tables::fetch", e))?;
            tables.push(OracleTableInfo {
                schema: owner.clone(),
                name,
                is_view: object_type == "VIEW",
            });
        }
        Ok(tables)
    }

    /// Describe a single table or view, mainly to learn which of the two
    /// it is. `Ok(None)` when no such object is visible.
    pub fn table_info(&self, schema: &str, table: &str) -> Result<Option<OracleTableInfo>> {
        let owner = to_upper(schema);
        let object_name = to_upper(table);

        let conn = self.raw();
        let rows = conn
            .query_as::<(String, String)>(TABLE_INFO_SQL, &[&owner, &object_name])
            .map_err(|e| OracleError::metadata("table_info::execute", e))?;

        for row in rows {
            let (name, object_type) =
                row.map_err(|e| OracleError::metadata("table_info::fetch", e))?;
            return Ok(Some(OracleTableInfo {
                schema: owner,
                name,
                is_view: object_type == "VIEW",
            }));
        }
        Ok(None)
    }

    /// Describe the columns of `schema.table` in column-id order.
    ///
    /// An empty result means the table does not exist (or is invisible to
    /// the connected user); callers treat that as a miss.
    pub fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<OracleColumnInfo>> {
        let owner = to_upper(schema);
        let table_name = to_upper(table);
        debug!(schema = %owner, table = %table_name, "describing oracle table");

        let conn = self.raw();
        let rows = conn
            .query_as::<(String, String, Option<i32>, Option<i32>, Option<i32>, String)>(
                LIST_COLUMNS_SQL,
                &[&owner, &table_name],
            )
            .map_err(|e| OracleError::metadata("list_columns::execute", e))?;

        let mut columns = Vec::new();
        for row in rows {
            let (name, data_type, precision, scale, char_length, nullable) =
                row.map_err(|e| OracleError::metadata("list_columns::fetch", e))?;
            columns.push(OracleColumnInfo {
                name,
                oracle_type_name: data_type,
                precision: precision.unwrap_or(0),
                scale: scale.unwrap_or(UNSPECIFIED_SCALE),
                char_length: char_length.unwrap_or(0),
                nullable: nullable == "Y",
            });
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_queries_use_binds() {
        assert!(LIST_TABLES_SQL.contains(":owner"));
        assert!(LIST_COLUMNS_SQL.contains(":owner"));
        assert!(LIST_COLUMNS_SQL.contains(":table_name"));
        assert!(LIST_COLUMNS_SQL.contains("ORDER BY COLUMN_ID"));
        assert!(TABLE_INFO_SQL.contains(":owner"));
        assert!(TABLE_INFO_SQL.contains(":object_name"));
        assert!(TABLE_INFO_SQL.contains("'TABLE', 'VIEW'"));
    }

    #[test]
    fn test_column_info_equality() {
        let col = OracleColumnInfo {
            name: "EMP_ID".to_string(),
            oracle_type_name: "NUMBER".to_string(),
            precision: 9,
            scale: 0,
            char_length: 0,
            nullable: false,
        };
        assert_eq!(col, col.clone());
    }
}
