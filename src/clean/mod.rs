//! Turn the raw orders CSV into a typed, deduplicated table and write it back
//! out as the cleaned CSV.

use anyhow::{bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Date32Array, Date32Builder},
    compute::concat_batches,
    csv::{ReaderBuilder, WriterBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, instrument};

use crate::config::EtlConfig;

pub mod columns;
pub mod convert;
pub mod date_parser;
pub mod dedup;

pub use columns::{normalize_column, normalize_columns, rename_columns};
pub use convert::{coerce_dates, coerce_numerics};
pub use dedup::drop_duplicates;

/// Placeholders this dataset uses for missing values.
pub const NA_TOKENS: &[&str] = &["Not Available", "unknown", "N/A", "na", "NA"];
/// Generic missing-value spellings recognised on top of [`NA_TOKENS`].
pub const DEFAULT_NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];
pub const DATE_COLUMNS: &[&str] = &["order_date", "ship_date"];
pub const NUMERIC_COLUMNS: &[&str] = &[
    "sales",
    "discount",
    "profit",
    "shipping_cost",
    "quantity",
    "postal_code",
];
pub const ORDER_DATE: &str = "order_date";
pub const ORDER_MONTH: &str = "order_month";

static NA_REGEX: Lazy<Regex> = Lazy::new(|| {
    let alts: Vec<String> = NA_TOKENS
        .iter()
        .chain(DEFAULT_NA_TOKENS)
        .map(|t| regex::escape(t))
        .collect();
    Regex::new(&format!("^(?:|{})$", alts.join("|"))).expect("static regex")
});

/// Row counts from one cleaning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub path: PathBuf,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl CleanReport {
    pub fn duplicates_dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Header row exactly as written in the file.
fn read_headers(path: &Path) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("reading header row of {}", path.display()))?;
    Ok(headers.iter().map(str::to_string).collect())
}

/// Read the whole CSV as `Utf8` columns under their raw names. Empty cells
/// and [`NA_TOKENS`] are null.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_raw(path: impl AsRef<Path>) -> Result<RecordBatch> {
    let path = path.as_ref();
    let headers = read_headers(path)?;
    let schema = Arc::new(Schema::new(
        headers
            .iter()
            .map(|h| Field::new(h, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_null_regex(NA_REGEX.clone())
        .build(file)
        .context("creating CSV reader")?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("CSV parse error in {}", path.display()))?;

    let batch = concat_batches(&schema, &batches)?;
    info!(rows = batch.num_rows(), columns = batch.num_columns(), "read raw");
    Ok(batch)
}

fn month_start(d: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1)
}

/// Append (or overwrite) `order_month`: `order_date` truncated to the first of
/// its month. No-op when there is no `order_date` column.
pub fn add_order_month(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let Ok(idx) = schema.index_of(ORDER_DATE) else {
        return Ok(batch.clone());
    };
    let Some(dates) = batch.column(idx).as_any().downcast_ref::<Date32Array>() else {
        bail!(
            "{} must be a date column before deriving {}, found {}",
            ORDER_DATE,
            ORDER_MONTH,
            batch.column(idx).data_type()
        );
    };

    let mut b = Date32Builder::with_capacity(dates.len());
    for i in 0..dates.len() {
        let month = if dates.is_null(i) {
            None
        } else {
            dates.value_as_date(i).and_then(month_start)
        };
        b.append_option(month.map(convert::date_to_days));
    }
    let month_col = Arc::new(b.finish()) as ArrayRef;

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut cols = batch.columns().to_vec();
    let month_field = Field::new(ORDER_MONTH, DataType::Date32, true);
    match schema.index_of(ORDER_MONTH) {
        Ok(existing) => {
            fields[existing] = month_field;
            cols[existing] = month_col;
        }
        Err(_) => {
            fields.push(month_field);
            cols.push(month_col);
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), cols).map_err(Into::into)
}

/// Write `batch` with a header row; dates as `YYYY-MM-DD`, nulls as empty.
pub fn write_csv(batch: &RecordBatch, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_date_format("%Y-%m-%d".to_string())
        .build(file);
    writer
        .write(batch)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// The full transform, in order: normalize names, coerce dates and numerics,
/// drop duplicates, derive `order_month`.
pub fn transform(raw: &RecordBatch) -> Result<RecordBatch> {
    let batch = rename_columns(raw)?;
    let batch = coerce_dates(&batch, DATE_COLUMNS)?;
    let batch = coerce_numerics(&batch, NUMERIC_COLUMNS)?;
    let batch = drop_duplicates(&batch)?;
    add_order_month(&batch)
}

/// Clean `input` into `output`.
#[instrument(level = "info", skip_all, fields(input = %input.as_ref().display()))]
pub fn clean_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<CleanReport> {
    let raw = read_raw(input)?;
    let cleaned = transform(&raw)?;
    write_csv(&cleaned, &output)?;

    let report = CleanReport {
        path: output.as_ref().to_path_buf(),
        rows_in: raw.num_rows(),
        rows_out: cleaned.num_rows(),
    };
    info!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        dropped = report.duplicates_dropped(),
        "cleaned"
    );
    Ok(report)
}

/// Clean stage: `csv_path` → `clean_csv_path`.
#[instrument(level = "info", skip(cfg))]
pub fn clean(cfg: &EtlConfig) -> Result<CleanReport> {
    cfg.ensure_dirs()?;
    let report = clean_file(&cfg.csv_path, &cfg.clean_csv_path)?;
    println!(
        "[OK] Cleaned -> {} ({} rows)",
        report.path.display(),
        thousands(report.rows_out)
    );
    Ok(report)
}

/// `1234567` → `"1,234,567"`.
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
