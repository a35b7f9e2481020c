use serde::{Deserialize, Serialize};

/// One entry of the ranked response from `POST /upload`.
///
/// Response order implies the ranking (highest similarity first); the client
/// does not re-sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub image_path: String,
    pub score: f64,
}

/// Image content fetched from `GET /images/{image_path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}
