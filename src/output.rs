use std::path::{Path, PathBuf};

use path_clean::clean;
use tokio::fs;
use tracing::warn;

use crate::api::similarity_structs::{ResolvedImage, SimilarityResult};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Format a similarity score the way the result listing shows it:
/// exactly two decimal places.
#[must_use]
pub fn format_score(score: f64) -> String {
    format!("{score:.2}")
}

/// Write the resolved images under `output_folder`, clearing whatever a
/// previous submission left there.
///
/// Returns the stored location per entry, positionally aligned with
/// `results`. Unresolved entries stay `None`, as do backend paths that would
/// escape the output folder or can't be written; a bad entry never fails the
/// batch.
///
/// # Errors
/// When the output folder itself can't be cleared or created.
pub async fn save_resolved_images(
    output_folder: &Path,
    results: &[SimilarityResult],
    resolved: &[Option<ResolvedImage>],
) -> Result<Vec<Option<PathBuf>>, OutputError> {
    // Normalized so that the escape check below compares like with like.
    let base = clean(output_folder);
    if fs::try_exists(&base).await? {
        fs::remove_dir_all(&base).await?;
    }
    fs::create_dir_all(&base).await?;

    let mut stored = Vec::with_capacity(results.len());
    for (result, image) in results.iter().zip(resolved) {
        let Some(image) = image else {
            stored.push(None);
            continue;
        };

        let target = clean(base.join(&result.image_path));
        if !target.starts_with(&base) {
            warn!(
                "Blocked image path escaping the output folder: {}",
                result.image_path
            );
            stored.push(None);
            continue;
        }

        stored.push(write_image(&target, &image.bytes).await);
    }

    Ok(stored)
}

async fn write_image(target: &Path, bytes: &[u8]) -> Option<PathBuf> {
    if let Some(parent) = target.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            warn!("Failed to create {}: {}", parent.display(), e);
            return None;
        }
    }
    match fs::write(target, bytes).await {
        Ok(()) => Some(target.to_path_buf()),
        Err(e) => {
            warn!("Failed to store {}: {}", target.display(), e);
            None
        }
    }
}

/// Print the ranked listing for one submission.
pub fn render_results(results: &[SimilarityResult], stored: &[Option<PathBuf>]) {
    if results.is_empty() {
        println!("No similar images found.");
        return;
    }

    println!("Similar images:");
    for (index, (result, path)) in results.iter().zip(stored).enumerate() {
        let location = path
            .as_ref()
            .map_or_else(|| "unavailable".to_string(), |p| p.display().to_string());
        println!(
            "{:>3}. score {}  {}  [{}]",
            index + 1,
            format_score(result.score),
            result.image_path,
            location
        );
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0.873, "0.87")]
    #[case(1.0, "1.00")]
    #[case(0.999, "1.00")]
    #[case(0.0, "0.00")]
    #[case(-0.25, "-0.25")]
    #[case(12.3456, "12.35")]
    fn test_format_score_two_decimals(#[case] score: f64, #[case] expected: &str) {
        assert_eq!(format_score(score), expected);
    }

    fn result(image_path: &str) -> SimilarityResult {
        SimilarityResult {
            image_path: image_path.to_string(),
            score: 0.5,
        }
    }

    fn image(bytes: &[u8]) -> Option<ResolvedImage> {
        Some(ResolvedImage {
            bytes: bytes.to_vec(),
            mime_type: "image/jpeg".to_string(),
        })
    }

    #[tokio::test]
    async fn test_save_writes_resolved_and_skips_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("session");
        let results = vec![result("processed/a.jpg"), result("processed/b.jpg")];
        let resolved = vec![image(b"aaa"), None];

        let stored = save_resolved_images(&output, &results, &resolved)
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        let first = stored[0].as_ref().unwrap();
        assert_eq!(tokio::fs::read(first).await.unwrap(), b"aaa");
        assert!(stored[1].is_none());
    }

    #[tokio::test]
    async fn test_save_clears_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("session");

        let first = vec![result("old.jpg")];
        save_resolved_images(&output, &first, &[image(b"old")])
            .await
            .unwrap();

        let second = vec![result("new.jpg")];
        save_resolved_images(&output, &second, &[image(b"new")])
            .await
            .unwrap();

        assert!(!output.join("old.jpg").exists());
        assert!(output.join("new.jpg").exists());
    }

    #[tokio::test]
    async fn test_save_accepts_dot_components_in_output_folder() {
        let dir = tempfile::tempdir().unwrap();
        // As passed on the command line, e.g. `--output-folder ./results`.
        let output = dir.path().join(".").join("session");
        let results = vec![result("processed/a.jpg")];

        let stored = save_resolved_images(&output, &results, &[image(b"aaa")])
            .await
            .unwrap();

        let first = stored[0].as_ref().unwrap();
        assert_eq!(tokio::fs::read(first).await.unwrap(), b"aaa");
    }

    #[tokio::test]
    async fn test_degenerate_image_path_does_not_fail_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("session");
        let results = vec![result(""), result("processed/b.jpg")];
        let resolved = vec![image(b"xxx"), image(b"bbb")];

        let stored = save_resolved_images(&output, &results, &resolved)
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert!(stored[0].is_none());
        let second = stored[1].as_ref().unwrap();
        assert_eq!(tokio::fs::read(second).await.unwrap(), b"bbb");
    }

    #[tokio::test]
    async fn test_save_blocks_directory_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("session");
        let results = vec![result("../escape.jpg")];

        let stored = save_resolved_images(&output, &results, &[image(b"x")])
            .await
            .unwrap();

        assert_eq!(stored, vec![None]);
        assert!(!dir.path().join("escape.jpg").exists());
    }
}
