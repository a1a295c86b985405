use anyhow::Result;
use arrow::{
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::HashSet, sync::Arc};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("static regex"));

/// Trim, lowercase, collapse every run of non-word characters into `_`.
///
/// Runs at either end would become a dangling underscore and are dropped
/// instead. Returns an empty string if nothing word-like remains.
pub fn normalize_column(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    NON_WORD
        .split(&lowered)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalize a full header row. Empty results become `column_<i>`, repeats
/// get a `_<n>` suffix.
pub fn normalize_columns<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(headers.len());
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let mut name = normalize_column(h.as_ref());
            if name.is_empty() {
                name = format!("column_{}", i);
            }
            if seen.contains(&name) {
                let base = name.clone();
                let mut n = 1;
                while seen.contains(&name) {
                    name = format!("{}_{}", base, n);
                    n += 1;
                }
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Same columns, normalized names.
pub fn rename_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let raw: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let fields: Vec<Field> = normalize_columns(&raw)
        .into_iter()
        .zip(schema.fields().iter())
        .map(|(name, f)| Field::new(name, f.data_type().clone(), f.is_nullable()))
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
        .map_err(Into::into)
}
