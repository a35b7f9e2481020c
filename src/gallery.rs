use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::fs;
use tracing::{info, warn};

use crate::common::image_utils::url_file_name;

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("Failed to read manifest {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse manifest {path}: {source}")]
    ParseManifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// URL manifest as produced by the image scraper: category -> term -> urls.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest(pub BTreeMap<String, BTreeMap<String, Vec<String>>>);

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped: usize,
}

/// Downloads the images of a manifest into a local gallery folder with a
/// bounded concurrent fan-out.
pub struct GalleryDownloader {
    client: Client,
    max_concurrent: usize,
}

impl GalleryDownloader {
    /// # Errors
    /// When the HTTP client can't be created.
    pub fn new(max_concurrent: usize) -> Result<Self, GalleryError> {
        Ok(Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(60))
                .build()?,
            max_concurrent: max_concurrent.max(1),
        })
    }

    /// Read a JSON manifest from disk and download its images into `dest`.
    ///
    /// # Errors
    /// When the manifest can't be read or parsed, or when the index file
    /// can't be written. Individual download failures are logged and counted
    /// as skipped instead.
    pub async fn download_manifest(
        &self,
        manifest_path: &Path,
        dest: &Path,
    ) -> Result<DownloadSummary, GalleryError> {
        let raw = fs::read_to_string(manifest_path)
            .await
            .map_err(|source| GalleryError::ReadManifest {
                path: manifest_path.to_path_buf(),
                source,
            })?;
        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|source| GalleryError::ParseManifest {
                path: manifest_path.to_path_buf(),
                source,
            })?;

        self.download(&manifest, dest).await
    }

    /// Download every manifest URL into `dest/{category}/{term}/`, then
    /// write a sorted `filename.txt` index of the stored files.
    ///
    /// # Errors
    /// When the destination folder or the index file can't be written.
    pub async fn download(
        &self,
        manifest: &Manifest,
        dest: &Path,
    ) -> Result<DownloadSummary, GalleryError> {
        let mut targets = Vec::new();
        let mut skipped = 0;
        for (category, terms) in &manifest.0 {
            for (term, urls) in terms {
                for url in urls {
                    if let Some(name) = url_file_name(url) {
                        targets.push((url.clone(), dest.join(category).join(term).join(name)));
                    } else {
                        warn!("Skipping url with no usable file name: {}", url);
                        skipped += 1;
                    }
                }
            }
        }

        let total = targets.len();
        let stored: Vec<PathBuf> = stream::iter(targets)
            .map(|(url, target)| self.fetch_one(url, target))
            .buffer_unordered(self.max_concurrent)
            .filter_map(|stored| async move { stored })
            .collect()
            .await;

        let summary = DownloadSummary {
            downloaded: stored.len(),
            skipped: skipped + (total - stored.len()),
        };

        fs::create_dir_all(dest).await?;
        let mut index: Vec<String> = stored
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        index.sort();
        index.push(String::new());
        fs::write(dest.join("filename.txt"), index.join("\n")).await?;

        info!(
            "Gallery download finished: {} stored, {} skipped",
            summary.downloaded, summary.skipped
        );
        Ok(summary)
    }

    async fn fetch_one(&self, url: String, target: PathBuf) -> Option<PathBuf> {
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to download {}: {}", url, e);
                return None;
            }
        };
        if response.status() != StatusCode::OK {
            warn!("Skipping {}: status {}", url, response.status());
            return None;
        }

        let is_image = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|content_type| content_type.starts_with("image"));
        if !is_image {
            warn!("Skipping non-image url: {}", url);
            return None;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read body of {}: {}", url, e);
                return None;
            }
        };

        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                warn!("Failed to create {}: {}", parent.display(), e);
                return None;
            }
        }
        match fs::write(&target, &bytes).await {
            Ok(()) => Some(target),
            Err(e) => {
                warn!("Failed to write {}: {}", target.display(), e);
                None
            }
        }
    }
}
