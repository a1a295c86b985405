use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Kaggle API username + key.
#[derive(Clone, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl KaggleCredentials {
    /// `KAGGLE_USERNAME` + `KAGGLE_KEY` first, then `kaggle.json` under
    /// `KAGGLE_CONFIG_DIR` or `~/.kaggle`.
    pub fn resolve() -> Result<Self> {
        if let (Ok(username), Ok(key)) = (env::var("KAGGLE_USERNAME"), env::var("KAGGLE_KEY")) {
            debug!(%username, "kaggle credentials from environment");
            return Ok(Self { username, key });
        }

        let path = config_file().ok_or_else(|| {
            anyhow!("no Kaggle credentials: set KAGGLE_USERNAME/KAGGLE_KEY or provide kaggle.json")
        })?;
        if !path.exists() {
            return Err(anyhow!(
                "no Kaggle credentials: KAGGLE_USERNAME/KAGGLE_KEY unset and {} missing",
                path.display()
            ));
        }
        Self::from_file(&path)
    }

    /// Parse a `kaggle.json` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading Kaggle credentials {}", path.display()))?;
        let creds: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing Kaggle credentials {}", path.display()))?;
        debug!(username = %creds.username, path = %path.display(), "kaggle credentials from file");
        Ok(creds)
    }
}

fn config_file() -> Option<PathBuf> {
    let dir = env::var_os("KAGGLE_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".kaggle")))?;
    Some(dir.join("kaggle.json"))
}
