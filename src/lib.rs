//! Retail orders ETL: fetch the Kaggle archive, clean the orders CSV, load it
//! into Postgres or SQLite.

pub mod clean;
pub mod config;
pub mod fetch;
pub mod load;

use anyhow::Result;

use crate::{clean::CleanReport, config::EtlConfig, load::LoadReport};

/// Fetch, clean and load, stopping at the first stage that fails.
pub fn run(cfg: &EtlConfig) -> Result<(CleanReport, LoadReport)> {
    fetch::download(cfg)?;
    let cleaned = clean::clean(cfg)?;
    let loaded = load::load_to_db(cfg, &cleaned.path)?;
    Ok((cleaned, loaded))
}
