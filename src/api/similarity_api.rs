use futures::future::join_all;
use tracing::{info, warn};

use crate::api::similarity_structs::{ResolvedImage, SimilarityResult};
use crate::common::api_client::{ApiClient, ApiClientError};

/// Submit an image to the similarity backend and return the ranked results.
///
/// # Errors
/// * When the upload request fails.
/// * When the backend answers with an unexpected status code.
pub async fn search_similar(
    client: &ApiClient,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<Vec<SimilarityResult>, ApiClientError> {
    let results = client.upload_image(file_name, bytes).await?;
    info!(
        "Backend returned {} similarity results for {}",
        results.len(),
        file_name
    );
    Ok(results)
}

/// Resolve every result's `image_path` into displayable image content.
///
/// All fetches start together and the call returns once every one has
/// settled. A failed fetch yields `None` at that position and never fails
/// the batch; the returned sequence always has the same length and order as
/// `results`.
pub async fn resolve_images(
    client: &ApiClient,
    results: &[SimilarityResult],
) -> Vec<Option<ResolvedImage>> {
    let fetches = results.iter().map(|result| {
        let image_path = result.image_path.clone();
        async move {
            match client.fetch_image(&image_path).await {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    warn!("Failed to resolve image {}: {}", image_path, e);
                    None
                }
            }
        }
    });

    join_all(fetches).await
}
