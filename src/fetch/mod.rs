//! Download the dataset archive from Kaggle and extract the raw orders CSV.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::{fs, path::PathBuf};
use tracing::{info, instrument};

use crate::config::EtlConfig;

pub mod archive;
pub mod credentials;
pub mod zips;

pub use archive::extract_member;
pub use credentials::KaggleCredentials;
pub use zips::download_dataset;

/// Fetch stage: authenticate, download into `data_dir`, settle the archive at
/// `zip_path`, extract the orders CSV to `csv_path`. Returns `csv_path`.
#[instrument(level = "info", skip(cfg), fields(dataset = %cfg.dataset))]
pub fn download(cfg: &EtlConfig) -> Result<PathBuf> {
    cfg.ensure_dirs()?;
    let creds = KaggleCredentials::resolve()?;

    let client = Client::builder()
        .build()
        .context("building HTTP client")?;
    let saved = download_dataset(&client, &creds, &cfg.dataset, &cfg.data_dir)?;

    if saved != cfg.zip_path {
        fs::rename(&saved, &cfg.zip_path).with_context(|| {
            format!("renaming {} to {}", saved.display(), cfg.zip_path.display())
        })?;
        info!(from = %saved.display(), to = %cfg.zip_path.display(), "renamed archive");
    }

    extract_member(
        &cfg.zip_path,
        &cfg.member_suffix,
        &cfg.data_dir,
        &cfg.csv_path,
    )?;

    println!("[OK] Downloaded -> {}", cfg.csv_path.display());
    Ok(cfg.csv_path.clone())
}
