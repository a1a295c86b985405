use crate::clean::date_parser;
use anyhow::Result;
use arrow::{
    array::{Array, ArrayRef, Date32Builder, Float64Builder, Int64Builder, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::debug;

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn date_to_days(d: NaiveDate) -> i32 {
    d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// A coerced numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Lenient numeric parse; integers stay integers. Unparseable text and `NaN`
/// give `None`.
pub fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::Int(i));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| !f.is_nan())
        .map(Number::Float)
}

/// Parse a string column into `Date32`; unparseable entries become null.
pub fn to_date32(sarr: &StringArray) -> ArrayRef {
    let mut b = Date32Builder::with_capacity(sarr.len());
    for opt in sarr.iter() {
        b.append_option(opt.and_then(date_parser::parse_date).map(date_to_days));
    }
    Arc::new(b.finish())
}

/// Parse a string column into `Int64` when every parsed value is integral,
/// `Float64` otherwise; unparseable entries become null.
pub fn to_numeric(sarr: &StringArray) -> ArrayRef {
    let parsed: Vec<Option<Number>> = sarr.iter().map(|o| o.and_then(parse_number)).collect();

    if parsed.iter().flatten().all(|n| matches!(n, Number::Int(_))) {
        let mut b = Int64Builder::with_capacity(parsed.len());
        for v in parsed {
            b.append_option(v.map(|n| match n {
                Number::Int(i) => i,
                Number::Float(f) => f as i64,
            }));
        }
        Arc::new(b.finish())
    } else {
        let mut b = Float64Builder::with_capacity(parsed.len());
        for v in parsed {
            b.append_option(v.map(|n| match n {
                Number::Int(i) => i as f64,
                Number::Float(f) => f,
            }));
        }
        Arc::new(b.finish())
    }
}

/// Rebuild `batch`, passing every `Utf8` column named in `columns` through
/// `convert`. Absent names and non-string columns are left alone.
fn convert_columns<F>(batch: &RecordBatch, columns: &[&str], convert: F) -> Result<RecordBatch>
where
    F: Fn(&StringArray) -> ArrayRef,
{
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut out = Vec::with_capacity(batch.num_columns());

    for (arr, fld) in batch.columns().iter().zip(schema.fields()) {
        match arr.as_any().downcast_ref::<StringArray>() {
            Some(sarr) if columns.contains(&fld.name().as_str()) => {
                let converted = convert(sarr);
                debug!(
                    column = %fld.name(),
                    to = %converted.data_type(),
                    nulls_before = sarr.null_count(),
                    nulls_after = converted.null_count(),
                    "coerced"
                );
                fields.push(Field::new(fld.name(), converted.data_type().clone(), true));
                out.push(converted);
            }
            _ => {
                fields.push(fld.as_ref().clone());
                out.push(arr.clone());
            }
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), out).map_err(Into::into)
}

/// Coerce the named date columns that are present.
pub fn coerce_dates(batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch> {
    convert_columns(batch, columns, to_date32)
}

/// Coerce the named numeric columns that are present.
pub fn coerce_numerics(batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch> {
    convert_columns(batch, columns, to_numeric)
}
