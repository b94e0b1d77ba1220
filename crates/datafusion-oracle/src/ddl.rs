// SPDX-License-Identifier: Apache-2.0

//! DDL string emission for Oracle-side table management.
//!
//! Only the statement builders live here; the catalog's DDL entry points
//! report not-implemented, and callers wanting DDL run these through
//! [`oracle_client::OracleConnection::execute_dml`] themselves.

use arrow_schema::Fields;
use oracle_client::util::quote_identifier;
use oracle_client::to_oracle_ddl;

/// Emit `CREATE TABLE "schema"."table" (...)` from Arrow fields.
pub fn build_create_table_ddl(schema: &str, table: &str, fields: &Fields) -> String {
    let mut ddl = format!(
        "CREATE TABLE {}.{} (",
        quote_identifier(schema),
        quote_identifier(table)
    );
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            ddl.push_str(", ");
        }
        ddl.push_str(&quote_identifier(field.name()));
        ddl.push(' ');
        ddl.push_str(&to_oracle_ddl(field.data_type()));
        if !field.is_nullable() {
            ddl.push_str(" NOT NULL");
        }
    }
    ddl.push(')');
    ddl
}

/// Emit `DROP TABLE "schema"."table"`, optionally purging the recycle
/// bin.
pub fn build_drop_table_ddl(schema: &str, table: &str, purge: bool) -> String {
    let mut ddl = format!(
        "DROP TABLE {}.{}",
        quote_identifier(schema),
        quote_identifier(table)
    );
    if purge {
        ddl.push_str(" PURGE");
    }
    ddl
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::{DataType, Field, Schema};

    #[test]
    fn test_create_table_ddl() {
        let schema = Schema::new(vec![
            Field::new("EMP_ID", DataType::Int32, false),
            Field::new("NAME", DataType::Utf8, true),
            Field::new("SALARY", DataType::Decimal128(10, 2), true),
        ]);
        assert_eq!(
            build_create_table_ddl("HR", "EMPLOYEES", schema.fields()),
            "CREATE TABLE \"HR\".\"EMPLOYEES\" (\"EMP_ID\" NUMBER(10) NOT NULL, \
             \"NAME\" VARCHAR2(4000), \"SALARY\" NUMBER(10,2))"
        );
    }

    #[test]
    fn test_drop_table_ddl() {
        assert_eq!(
            build_drop_table_ddl("HR", "EMPLOYEES", false),
            "DROP TABLE \"HR\".\"EMPLOYEES\""
        );
        assert_eq!(
            build_drop_table_ddl("HR", "EMPLOYEES", true),
            "DROP TABLE \"HR\".\"EMPLOYEES\" PURGE"
        );
    }
}
