//! Bidirectional type mapping between Oracle descriptors and Arrow types

use arrow_schema::{DataType, TimeUnit};

use crate::metadata::OracleColumnInfo;

/// Scale value Oracle reports when the scale is unspecified
pub const UNSPECIFIED_SCALE: i32 = -127;

/// Map an Oracle column descriptor to the Arrow type it scans as.
///
/// The mapping is total: anything unrecognized falls back to `Utf8`,
/// which Oracle can always render as text.
pub fn to_arrow_type(col: &OracleColumnInfo) -> DataType {
    let name = col.oracle_type_name.as_str();

    if name == "NUMBER" {
        // NUMBER with neither precision nor scale is a float in disguise.
        if col.precision == 0 && col.scale == UNSPECIFIED_SCALE {
            return DataType::Float64;
        }
        if col.scale == 0 || col.scale == UNSPECIFIED_SCALE {
            if col.precision <= 4 {
                return DataType::Int16;
            }
            if col.precision <= 9 {
                return DataType::Int32;
            }
            if col.precision <= 18 {
                return DataType::Int64;
            }
            if col.precision <= 38 {
                return DataType::Decimal128(38, 0);
            }
        }
        if (1..=38).contains(&col.precision) && (0..=col.precision).contains(&col.scale) {
            return DataType::Decimal128(col.precision as u8, col.scale as i8);
        }
        return DataType::Float64;
    }

    match name {
        "VARCHAR2" | "NVARCHAR2" | "CHAR" | "NCHAR" | "ROWID" | "CLOB" | "NCLOB" => {
            DataType::Utf8
        }
        "BLOB" | "RAW" => DataType::Binary,
        "BINARY_FLOAT" => DataType::Float32,
        "BINARY_DOUBLE" => DataType::Float64,
        "DATE" => DataType::Timestamp(TimeUnit::Microsecond, None),
        _ => {
            // The dictionary reports fractional-second precision inline,
            // e.g. "TIMESTAMP(6) WITH TIME ZONE" or "INTERVAL DAY(2) TO
            // SECOND(6)", so these families match on their prefix.
            if name.starts_with("TIMESTAMP") {
                if name.ends_with("WITH TIME ZONE") && !name.contains("LOCAL") {
                    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
                } else {
                    DataType::Timestamp(TimeUnit::Microsecond, None)
                }
            } else if name.starts_with("INTERVAL") {
                DataType::Interval(arrow_schema::IntervalUnit::MonthDayNano)
            } else {
                DataType::Utf8
            }
        }
    }
}

/// Map an Arrow type to the Oracle column type used in emitted DDL.
///
/// The inverse of [`to_arrow_type`] up to category: numeric types land in
/// the NUMBER family, strings in VARCHAR2, and so on, though exact widths
/// are not preserved.
pub fn to_oracle_ddl(data_type: &DataType) -> String {
    match data_type {
        DataType::Boolean => "NUMBER(1)".to_string(),
        DataType::Int8 => "NUMBER(3)".to_string(),
        DataType::Int16 => "NUMBER(5)".to_string(),
        DataType::Int32 => "NUMBER(10)".to_string(),
        DataType::Int64 => "NUMBER(19)".to_string(),
        DataType::Decimal128(38, 0) => "NUMBER(38)".to_string(),
        DataType::Decimal128(precision, scale) => format!("NUMBER({precision},{scale})"),
        DataType::Float32 => "BINARY_FLOAT".to_string(),
        DataType::Float64 => "BINARY_DOUBLE".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 => "VARCHAR2(4000)".to_string(),
        DataType::Binary | DataType::LargeBinary => "BLOB".to_string(),
        DataType::Date32 | DataType::Date64 => "DATE".to_string(),
        DataType::Timestamp(_, Some(_)) => "TIMESTAMP WITH TIME ZONE".to_string(),
        DataType::Timestamp(_, None) => "TIMESTAMP".to_string(),
        DataType::Interval(_) => "INTERVAL DAY(9) TO SECOND(9)".to_string(),
        _ => "VARCHAR2(4000)".to_string(),
    }
}
