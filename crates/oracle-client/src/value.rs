//! Conversion of driver-native cells into Arrow column values

use arrow::array::{
    ArrayRef, BinaryBuilder, Decimal128Builder, Float32Builder, Float64Builder, Int16Builder,
    Int32Builder, Int64Builder, IntervalMonthDayNanoBuilder, StringBuilder,
    TimestampMicrosecondBuilder,
};
use arrow::datatypes::IntervalMonthDayNano;
use arrow_schema::DataType;
use chrono::NaiveDate;
use oracle::sql_type::{IntervalDS, IntervalYM, OracleType, Timestamp};
use oracle::Row;

use std::sync::Arc;

/// Driver-native representation chosen for a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeRep {
    Int64,
    Double,
    Float,
    Bytes,
    Timestamp,
    IntervalYm,
    IntervalDs,
    Lob,
}

/// Choose the native representation for a result column from the Oracle
/// type the executed statement reports.
pub fn native_rep(oracle_type: &OracleType) -> NativeRep {
    match oracle_type {
        OracleType::Number(precision, scale) => {
            if *scale == 0 && (1..=18).contains(precision) {
                NativeRep::Int64
            } else {
                NativeRep::Double
            }
        }
        OracleType::Float(_) => NativeRep::Double,
        OracleType::Int64 | OracleType::UInt64 => NativeRep::Int64,
        OracleType::BinaryFloat => NativeRep::Float,
        OracleType::BinaryDouble => NativeRep::Double,
        OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => NativeRep::Timestamp,
        OracleType::CLOB | OracleType::NCLOB | OracleType::BLOB => NativeRep::Lob,
        OracleType::IntervalYM(_) => NativeRep::IntervalYm,
        OracleType::IntervalDS(_, _) => NativeRep::IntervalDs,
        _ => NativeRep::Bytes,
    }
}

/// One cell in its native representation. `Null` also stands in for
/// cells the driver could not convert and for unknown representations.
#[derive(Debug, Clone)]
pub enum NativeCell {
    Null,
    Int(i64),
    Double(f64),
    Float(f32),
    Text(String),
    Bytes(Vec<u8>),
    Stamp(Timestamp),
    YearMonth(IntervalYM),
    DaySecond(IntervalDS),
}

/// A per-column Arrow builder that appends one native cell per row.
///
/// Conversion rules: doubles scale-and-round into decimals (ties away
/// from zero) and truncate toward zero into integers, saturating instead
/// of overflowing; int64 narrows; byte cells become text or binary by
/// target; timestamps are microseconds since the epoch, shifted to UTC
/// for zoned targets; a null or unconvertible cell appends a typed null.
pub enum ColumnSink {
    Int16(Int16Builder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    Decimal128 { builder: Decimal128Builder, scale: i8 },
    Float32(Float32Builder),
    Float64(Float64Builder),
    Utf8(StringBuilder),
    Binary(BinaryBuilder),
    Timestamp { builder: TimestampMicrosecondBuilder, utc: bool },
    Interval(IntervalMonthDayNanoBuilder),
}

impl ColumnSink {
    /// Build a sink for the target Arrow type. Targets outside the scan
    /// type mapping fall back to text.
    pub fn new(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int16 => Self::Int16(Int16Builder::new()),
            DataType::Int32 => Self::Int32(Int32Builder::new()),
            DataType::Int64 => Self::Int64(Int64Builder::new()),
            DataType::Decimal128(precision, scale) => Self::Decimal128 {
                builder: Decimal128Builder::new()
                    .with_precision_and_scale(*precision, *scale)
                    .unwrap_or_else(|_| Decimal128Builder::new()),
                scale: *scale,
            },
            DataType::Float32 => Self::Float32(Float32Builder::new()),
            DataType::Float64 => Self::Float64(Float64Builder::new()),
            DataType::Binary => Self::Binary(BinaryBuilder::new()),
            DataType::Timestamp(_, tz) => Self::Timestamp {
                builder: match tz {
                    Some(tz) => TimestampMicrosecondBuilder::new().with_timezone(tz.clone()),
                    None => TimestampMicrosecondBuilder::new(),
                },
                utc: tz.is_some(),
            },
            DataType::Interval(_) => Self::Interval(IntervalMonthDayNanoBuilder::new()),
            _ => Self::Utf8(StringBuilder::new()),
        }
    }

    /// True when this sink wants raw bytes rather than text from byte-
    /// string and LOB cells.
    fn wants_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Fetch column `idx` of `row` in representation `rep` and append it.
    pub fn append_from_row(&mut self, row: &Row, idx: usize, rep: NativeRep) {
        let fetched: std::result::Result<Option<NativeCell>, oracle::Error> = match rep {
            NativeRep::Int64 => row.get::<usize, Option<i64>>(idx).map(|v| v.map(NativeCell::Int)),
            NativeRep::Double => row
                .get::<usize, Option<f64>>(idx)
                .map(|v| v.map(NativeCell::Double)),
            NativeRep::Float => row
                .get::<usize, Option<f32>>(idx)
                .map(|v| v.map(NativeCell::Float)),
            NativeRep::Timestamp => row
                .get::<usize, Option<Timestamp>>(idx)
                .map(|v| v.map(NativeCell::Stamp)),
            NativeRep::IntervalYm => row
                .get::<usize, Option<IntervalYM>>(idx)
                .map(|v| v.map(NativeCell::YearMonth)),
            NativeRep::IntervalDs => row
                .get::<usize, Option<IntervalDS>>(idx)
                .map(|v| v.map(NativeCell::DaySecond)),
            NativeRep::Bytes | NativeRep::Lob => {
                if self.wants_binary() {
                    row.get::<usize, Option<Vec<u8>>>(idx)
                        .map(|v| v.map(NativeCell::Bytes))
                } else {
                    row.get::<usize, Option<String>>(idx)
                        .map(|v| v.map(NativeCell::Text))
                }
            }
        };

        // A cell the driver cannot convert becomes a typed null; a bad
        // cell never fails the scan.
        match fetched {
            Ok(Some(cell)) => self.append(cell),
            Ok(None) | Err(_) => self.append_null(),
        }
    }

    /// Append one native cell, converting to the sink's target type.
    pub fn append(&mut self, cell: NativeCell) {
        match self {
            Self::Int16(builder) => match cell {
                NativeCell::Int(v) => builder.append_value(v as i16),
                NativeCell::Double(v) => builder.append_value(v as i16),
                _ => builder.append_null(),
            },
            Self::Int32(builder) => match cell {
                NativeCell::Int(v) => builder.append_value(v as i32),
                NativeCell::Double(v) => builder.append_value(v as i32),
                _ => builder.append_null(),
            },
            Self::Int64(builder) => match cell {
                NativeCell::Int(v) => builder.append_value(v),
                NativeCell::Double(v) => builder.append_value(v as i64),
                _ => builder.append_null(),
            },
            Self::Decimal128 { builder, scale } => match cell {
                NativeCell::Int(v) => builder.append_value(scale_integer(v, *scale)),
                NativeCell::Double(v) => match scale_double(v, *scale) {
                    Some(scaled) => builder.append_value(scaled),
                    None => builder.append_null(),
                },
                _ => builder.append_null(),
            },
            Self::Float32(builder) => match cell {
                NativeCell::Float(v) => builder.append_value(v),
                NativeCell::Double(v) => builder.append_value(v as f32),
                NativeCell::Int(v) => builder.append_value(v as f32),
                _ => builder.append_null(),
            },
            Self::Float64(builder) => match cell {
                NativeCell::Double(v) => builder.append_value(v),
                NativeCell::Float(v) => builder.append_value(f64::from(v)),
                NativeCell::Int(v) => builder.append_value(v as f64),
                _ => builder.append_null(),
            },
            Self::Utf8(builder) => match cell {
                NativeCell::Text(v) => builder.append_value(v),
                NativeCell::Int(v) => builder.append_value(v.to_string()),
                NativeCell::Double(v) => builder.append_value(v.to_string()),
                _ => builder.append_null(),
            },
            Self::Binary(builder) => match cell {
                NativeCell::Bytes(v) => builder.append_value(&v),
                NativeCell::Text(v) => builder.append_value(v.as_bytes()),
                _ => builder.append_null(),
            },
            Self::Timestamp { builder, utc } => match cell {
                NativeCell::Stamp(ts) => match timestamp_micros(&ts, *utc) {
                    Some(micros) => builder.append_value(micros),
                    None => builder.append_null(),
                },
                _ => builder.append_null(),
            },
            Self::Interval(builder) => match cell {
                NativeCell::YearMonth(iv) => builder.append_value(IntervalMonthDayNano::new(
                    iv.years() * 12 + iv.months(),
                    0,
                    0,
                )),
                NativeCell::DaySecond(iv) => builder.append_value(IntervalMonthDayNano::new(
                    0,
                    iv.days(),
                    day_second_nanos(&iv),
                )),
                _ => builder.append_null(),
            },
        }
    }

    /// Append a typed null.
    pub fn append_null(&mut self) {
        match self {
            Self::Int16(b) => b.append_null(),
            Self::Int32(b) => b.append_null(),
            Self::Int64(b) => b.append_null(),
            Self::Decimal128 { builder, .. } => builder.append_null(),
            Self::Float32(b) => b.append_null(),
            Self::Float64(b) => b.append_null(),
            Self::Utf8(b) => b.append_null(),
            Self::Binary(b) => b.append_null(),
            Self::Timestamp { builder, .. } => builder.append_null(),
            Self::Interval(b) => b.append_null(),
        }
    }

    /// Finish the accumulated column, resetting the builder.
    pub fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Int16(b) => Arc::new(b.finish()),
            Self::Int32(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
            Self::Decimal128 { builder, .. } => Arc::new(builder.finish()),
            Self::Float32(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::Utf8(b) => Arc::new(b.finish()),
            Self::Binary(b) => Arc::new(b.finish()),
            Self::Timestamp { builder, .. } => Arc::new(builder.finish()),
            Self::Interval(b) => Arc::new(b.finish()),
        }
    }
}

/// Scale an integer cell into a decimal's storage value.
fn scale_integer(value: i64, scale: i8) -> i128 {
    i128::from(value) * 10i128.pow(scale.max(0) as u32)
}

/// Scale a double cell into a decimal's storage value, rounding to
/// nearest with ties away from zero. Non-finite inputs yield `None`.
fn scale_double(value: f64, scale: i8) -> Option<i128> {
    let scaled = value * 10f64.powi(i32::from(scale));
    if scaled.is_finite() {
        Some(scaled.round() as i128)
    } else {
        None
    }
}

/// Microseconds since the epoch for a decomposed driver timestamp.
///
/// For zoned targets the stored instant is UTC: the reported offset is
/// subtracted from the wall-clock value.
fn timestamp_micros(ts: &Timestamp, utc: bool) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(ts.year(), ts.month(), ts.day())?;
    let datetime = date.and_hms_opt(ts.hour(), ts.minute(), ts.second())?;
    let mut micros = datetime
        .and_utc()
        .timestamp()
        .checked_mul(1_000_000)?
        .checked_add(i64::from(ts.nanosecond() / 1_000))?;
    if utc {
        let offset_seconds =
            i64::from(ts.tz_hour_offset() * 60 + ts.tz_minute_offset()) * 60;
        micros = micros.checked_sub(offset_seconds.checked_mul(1_000_000)?)?;
    }
    Some(micros)
}

/// Nanoseconds in the sub-day part of a day-to-second interval.
fn day_second_nanos(iv: &IntervalDS) -> i64 {
    i64::from(iv.hours()) * 3_600_000_000_000
        + i64::from(iv.minutes()) * 60_000_000_000
        + i64::from(iv.seconds()) * 1_000_000_000
        + i64::from(iv.nanoseconds())
}
