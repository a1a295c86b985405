use anyhow::Result;
use retail_etl::{config::EtlConfig, run};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) resolve config (.env, ETL_ROOT, DB_BACKEND, PG_URI) ──────
    let cfg = EtlConfig::from_env()?;
    info!(
        root = %cfg.root.display(),
        backend = %cfg.db_backend,
        dataset = %cfg.dataset,
        "startup"
    );

    // ─── 3) fetch → clean → load ─────────────────────────────────────
    let start = Instant::now();
    let (cleaned, loaded) = run(&cfg)?;
    info!(
        rows_in = cleaned.rows_in,
        rows_out = cleaned.rows_out,
        loaded = loaded.rows,
        elapsed = ?start.elapsed(),
        "pipeline finished"
    );

    println!("[DONE]");
    Ok(())
}
