use anyhow::{anyhow, Context, Result};
use reqwest::{blocking::Client, header::CONTENT_DISPOSITION};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};
use url::Url;

use super::credentials::KaggleCredentials;

const KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1/";

/// `…/api/v1/datasets/download/<owner>/<name>`
pub fn dataset_download_url(owner: &str, name: &str) -> Result<Url> {
    let mut url = Url::parse(KAGGLE_API_BASE)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("{} cannot carry a path", KAGGLE_API_BASE))?
        .pop_if_empty()
        .extend(["datasets", "download", owner, name]);
    Ok(url)
}

/// Pull the filename out of a `Content-Disposition` header value, keeping
/// only the final path component.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let raw = value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"');
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Download the archive at `url` into `dest_dir`, authenticating with `creds`.
/// The server's filename wins over `fallback_name`. Returns the saved path.
pub fn download_zip(
    client: &Client,
    url: &Url,
    creds: &KaggleCredentials,
    dest_dir: impl AsRef<Path>,
    fallback_name: &str,
) -> Result<PathBuf> {
    let dest_dir = dest_dir.as_ref();
    fs::create_dir_all(dest_dir).with_context(|| format!("creating {:?}", dest_dir))?;

    let mut resp = client
        .get(url.as_str())
        .basic_auth(&creds.username, Some(&creds.key))
        .send()
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?;

    let filename = resp
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| fallback_name.to_string());
    debug!(%filename, "saving archive");
    let dest_path = dest_dir.join(filename);

    let mut file =
        File::create(&dest_path).with_context(|| format!("creating {}", dest_path.display()))?;
    let bytes = resp
        .copy_to(&mut file)
        .with_context(|| format!("writing body of {} to {}", url, dest_path.display()))?;
    info!(path = %dest_path.display(), bytes, "downloaded");

    Ok(dest_path)
}

/// Download Kaggle dataset `<owner>/<name>` into `data_dir`. Falls back to
/// `<name>.zip` when the server sends no filename.
#[instrument(level = "info", skip(client, creds, data_dir))]
pub fn download_dataset(
    client: &Client,
    creds: &KaggleCredentials,
    dataset: &str,
    data_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let (owner, name) = dataset
        .split_once('/')
        .filter(|(o, n)| !o.is_empty() && !n.is_empty())
        .ok_or_else(|| anyhow!("dataset {:?} is not <owner>/<name>", dataset))?;
    let url = dataset_download_url(owner, name)?;
    download_zip(client, &url, creds, data_dir, &format!("{}.zip", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_download_url() -> Result<()> {
        let url = dataset_download_url("ankitbansal06", "retail-orders")?;
        assert_eq!(
            url.as_str(),
            "https://www.kaggle.com/api/v1/datasets/download/ankitbansal06/retail-orders"
        );
        Ok(())
    }

    #[test]
    fn test_download_dataset_rejects_bare_name() {
        let creds = KaggleCredentials {
            username: "u".into(),
            key: "k".into(),
        };
        let tmp = tempfile::tempdir().unwrap();
        let err = download_dataset(&Client::new(), &creds, "retail-orders", tmp.path())
            .unwrap_err();
        assert!(err.to_string().contains("<owner>/<name>"));
    }

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition("attachment; filename=retail-orders.zip"),
            Some("retail-orders.zip".to_string())
        );
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="retail-orders.zip""#),
            Some("retail-orders.zip".to_string())
        );
        // no traversal out of the data dir
        assert_eq!(
            filename_from_disposition("attachment; filename=../../etc/passwd"),
            Some("passwd".to_string())
        );
        assert_eq!(filename_from_disposition("inline"), None);
        assert_eq!(filename_from_disposition(r#"attachment; filename="""#), None);
    }

    /// Live download; needs Kaggle credentials in the environment.
    #[test]
    #[ignore]
    fn test_download_live() -> Result<()> {
        let creds = KaggleCredentials::resolve()?;
        let tmp = tempfile::tempdir()?;
        let client = Client::new();
        let path = download_dataset(&client, &creds, "ankitbansal06/retail-orders", tmp.path())?;
        assert!(fs::metadata(&path)?.len() > 0);
        Ok(())
    }
}
