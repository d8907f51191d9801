//! MNIST downloader
//!
//! Fetches the gzipped IDX files from public mirrors and stores them
//! uncompressed under `<data_dir>/MNIST/raw`.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::idx::{parse_images, parse_labels};

/// Mirrors tried in order
pub const MNIST_MIRRORS: [&str; 2] = [
    "https://ossci-datasets.s3.amazonaws.com/mnist/",
    "http://yann.lecun.com/exdb/mnist/",
];

/// Training images file name
pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
/// Training labels file name
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
/// Test images file name
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
/// Test labels file name
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// All files making up the dataset
pub const MNIST_FILES: [&str; 4] = [TRAIN_IMAGES, TRAIN_LABELS, TEST_IMAGES, TEST_LABELS];

/// Directory holding the uncompressed IDX files for a data root
pub fn raw_dir<P: AsRef<Path>>(data_dir: P) -> PathBuf {
    data_dir.as_ref().join("MNIST").join("raw")
}

/// Files from [`MNIST_FILES`] not yet present in `dir`
pub fn missing_files(dir: &Path) -> Vec<&'static str> {
    MNIST_FILES
        .iter()
        .copied()
        .filter(|name| !dir.join(name).is_file())
        .collect()
}

/// Decompress a gzip payload
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .context("Failed to decompress gzip payload")?;
    Ok(out)
}

/// Decompress a downloaded `<name>.gz` and check that it holds the IDX file `name`
pub fn decode_payload(name: &str, compressed: &[u8]) -> Result<Vec<u8>> {
    let raw = gunzip(compressed)?;
    if name.contains("idx3") {
        parse_images(&raw).with_context(|| format!("{} is not an IDX image file", name))?;
    } else if name.contains("idx1") {
        parse_labels(&raw).with_context(|| format!("{} is not an IDX label file", name))?;
    }
    Ok(raw)
}

/// MNIST download client
#[derive(Debug, Clone)]
pub struct MnistDownloader {
    client: Client,
    mirrors: Vec<String>,
}

impl Default for MnistDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl MnistDownloader {
    /// Create a downloader using the default mirrors
    pub fn new() -> Self {
        Self::with_mirrors(MNIST_MIRRORS.iter().map(|m| m.to_string()).collect())
    }

    /// Create a downloader with custom mirror base URLs
    pub fn with_mirrors(mirrors: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            mirrors,
        }
    }

    /// Make sure all dataset files exist under `data_dir`, downloading the missing ones
    ///
    /// # Returns
    ///
    /// Directory containing the uncompressed IDX files
    pub async fn ensure(&self, data_dir: &Path) -> Result<PathBuf> {
        let dir = raw_dir(data_dir);
        let missing = missing_files(&dir);

        if missing.is_empty() {
            debug!("MNIST already present in {}", dir.display());
            return Ok(dir);
        }

        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        info!("Downloading {} MNIST files into {}", missing.len(), dir.display());
        for name in missing {
            self.fetch_file(name, &dir).await?;
        }

        Ok(dir)
    }

    /// Download `<name>.gz` from the first mirror that serves a valid copy and write it uncompressed
    pub async fn fetch_file(&self, name: &str, dir: &Path) -> Result<PathBuf> {
        let target = dir.join(name);

        for mirror in &self.mirrors {
            let url = format!("{}{}.gz", mirror, name);
            debug!("Fetching {}", url);

            let raw = match self.fetch_bytes(&url).await {
                Ok(compressed) => match decode_payload(name, &compressed) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("Bad payload from {}: {:#}", url, e);
                        continue;
                    }
                },
                Err(e) => {
                    warn!("Download from {} failed: {}", url, e);
                    continue;
                }
            };

            let partial = target.with_extension("part");
            std::fs::write(&partial, &raw)
                .with_context(|| format!("Failed to write {}", partial.display()))?;
            std::fs::rename(&partial, &target)
                .with_context(|| format!("Failed to move {}", partial.display()))?;

            info!("Saved {} ({} bytes)", target.display(), raw.len());
            return Ok(target);
        }

        Err(anyhow!("Failed to download {} from any mirror", name))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Download MNIST into `data_dir` if needed, using the default mirrors
pub async fn ensure_mnist(data_dir: &Path) -> Result<PathBuf> {
    MnistDownloader::new().ensure(data_dir).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::idx::encode_labels;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    /// Serve fixed bodies by path on a local port, 404 for anything else
    async fn serve(routes: Vec<(String, Vec<u8>)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("").to_string();

                let (status, body) = match routes.iter().find(|(p, _)| *p == path) {
                    Some((_, body)) => ("200 OK", body.clone()),
                    None => ("404 Not Found", Vec::new()),
                };
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&body).await;
            }
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_gunzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"idx payload").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(gunzip(&compressed).unwrap(), b"idx payload".to_vec());
        assert!(gunzip(b"not gzip").is_err());
    }

    #[test]
    fn test_decode_payload_checks_magic() {
        let labels = encode_labels(&[1, 2, 3]);
        assert_eq!(decode_payload(TEST_LABELS, &gzip(&labels)).unwrap(), labels);

        // Valid gzip, wrong IDX kind
        assert!(decode_payload(TEST_IMAGES, &gzip(&labels)).is_err());
        assert!(decode_payload(TEST_LABELS, b"<html>Not here</html>").is_err());
    }

    #[test]
    fn test_raw_dir_layout() {
        let dir = raw_dir("data");
        assert_eq!(dir, PathBuf::from("data").join("MNIST").join("raw"));
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(missing_files(dir.path()).len(), 4);

        std::fs::write(dir.path().join(TRAIN_IMAGES), b"x").unwrap();
        std::fs::write(dir.path().join(TRAIN_LABELS), b"x").unwrap();

        assert_eq!(missing_files(dir.path()), vec![TEST_IMAGES, TEST_LABELS]);
    }

    #[tokio::test]
    async fn test_ensure_skips_present_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = raw_dir(root.path());
        std::fs::create_dir_all(&dir).unwrap();
        for name in MNIST_FILES {
            std::fs::write(dir.join(name), b"x").unwrap();
        }

        // No mirrors: any network attempt would fail
        let downloader = MnistDownloader::with_mirrors(vec![]);
        assert_eq!(downloader.ensure(root.path()).await.unwrap(), dir);
    }

    #[tokio::test]
    async fn test_no_mirror_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let downloader = MnistDownloader::with_mirrors(vec![]);

        assert!(downloader.ensure(root.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_falls_through_bad_mirrors() {
        let labels = encode_labels(&[4, 2]);
        let base = serve(vec![
            (format!("/html/{}.gz", TEST_LABELS), b"<html>captive portal</html>".to_vec()),
            (format!("/good/{}.gz", TEST_LABELS), gzip(&labels)),
        ])
        .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = MnistDownloader::with_mirrors(vec![
            format!("{}/missing/", base),
            format!("{}/html/", base),
            format!("{}/good/", base),
        ]);

        let path = downloader.fetch_file(TEST_LABELS, dir.path()).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), labels);
    }

    #[tokio::test]
    async fn test_fetch_fails_when_every_mirror_is_bad() {
        let base = serve(vec![(format!("/html/{}.gz", TEST_LABELS), b"<html></html>".to_vec())]).await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = MnistDownloader::with_mirrors(vec![format!("{}/html/", base)]);

        assert!(downloader.fetch_file(TEST_LABELS, dir.path()).await.is_err());
        assert!(!dir.path().join(TEST_LABELS).exists());
    }
}
