use std::time::Duration;

use reqwest::{multipart, Client, StatusCode};
use tracing::debug;

use crate::api::similarity_structs::{ResolvedImage, SimilarityResult};

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {text}")]
    UnexpectedStatus { status: StatusCode, text: String },
}

pub struct ApiClient {
    http_client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create api client
    ///
    /// # Panics
    /// if it can't create the client.
    #[must_use]
    pub fn new(base_url: &str, connect_timeout_secs: u64, request_timeout_secs: u64) -> Self {
        Self {
            http_client: Client::builder()
                .connect_timeout(Duration::from_secs(connect_timeout_secs))
                .timeout(Duration::from_secs(request_timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload an image as a multipart form and get the ranked similarity
    /// results back.
    ///
    /// # Errors
    /// * If the POST request can't be made to the url.
    /// * If the body can't be read or the json can't be parsed.
    /// * If an unexpected status code is received.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<SimilarityResult>, ApiClientError> {
        let url = format!("{}/upload", self.base_url);
        let mime_type = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type.as_ref())?;
        let form = multipart::Form::new().part("file", part);

        let response = self.http_client.post(&url).multipart(form).send().await?;
        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => {
                let text = response.text().await?;
                Err(ApiClientError::UnexpectedStatus { status, text })
            }
        }
    }

    /// Fetch one result image from the backend.
    ///
    /// # Errors
    /// * If the GET request can't be made to the url.
    /// * If the body can't be read.
    /// * If an unexpected status code is received.
    pub async fn fetch_image(&self, image_path: &str) -> Result<ResolvedImage, ApiClientError> {
        let url = format!("{}/images/{}", self.base_url, image_path);
        let response = self.http_client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let mime_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map_or_else(
                        || mime::APPLICATION_OCTET_STREAM.to_string(),
                        ToString::to_string,
                    );
                let bytes = response.bytes().await?.to_vec();
                debug!("Fetched {} ({} bytes)", image_path, bytes.len());
                Ok(ResolvedImage { bytes, mime_type })
            }
            status => {
                let text = response.text().await?;
                Err(ApiClientError::UnexpectedStatus { status, text })
            }
        }
    }
}
