use tracing::error;

use crate::api::similarity_api;
use crate::api::similarity_structs::{ResolvedImage, SimilarityResult};
use crate::common::api_client::{ApiClient, ApiClientError};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Please select an image first")]
    NoFileSelected,
    #[error("A submission is already in progress")]
    SubmissionInProgress,
    #[error("Upload failed: {0}")]
    Upload(#[from] ApiClientError),
}

/// Where the workflow currently is in its submit/resolve cycle.
///
/// `Failed` is not terminal; selecting a file or submitting again moves the
/// workflow forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    FileSelected,
    Submitting,
    ResultsReceived,
    ResolvingImages,
    Ready,
    Failed,
}

/// A locally selected image. Nothing about the content is validated here.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Single-owner session state for one upload-and-fetch cycle: the selected
/// file, the ranked results of the latest successful submission, and the
/// resolved image per result.
pub struct UploadWorkflow {
    client: ApiClient,
    state: WorkflowState,
    file: Option<SelectedFile>,
    results: Vec<SimilarityResult>,
    resolved: Vec<Option<ResolvedImage>>,
}

impl UploadWorkflow {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: WorkflowState::Idle,
            file: None,
            results: Vec::new(),
            resolved: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Ranked results of the latest successful submission.
    #[must_use]
    pub fn results(&self) -> &[SimilarityResult] {
        &self.results
    }

    /// Resolved image per result, positionally aligned with `results()`.
    /// `None` marks an image that could not be fetched.
    #[must_use]
    pub fn resolved_images(&self) -> &[Option<ResolvedImage>] {
        &self.resolved
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(
            self.state,
            WorkflowState::Submitting | WorkflowState::ResolvingImages
        )
    }

    /// Store a selection, replacing any previous one.
    pub fn select_file(&mut self, file: SelectedFile) {
        self.file = Some(file);
        self.state = WorkflowState::FileSelected;
    }

    /// Run one full submit/resolve cycle against the backend.
    ///
    /// On success the previous results are replaced entirely. On upload
    /// failure they are left untouched, the workflow enters `Failed` and can
    /// be retried. Per-image resolution failures never fail the cycle; the
    /// affected positions are `None`.
    ///
    /// # Errors
    /// * `NoFileSelected`, before any network call, when nothing is selected.
    /// * `SubmissionInProgress` when a cycle is already running.
    /// * `Upload` when the upload request fails or is rejected.
    pub async fn submit(&mut self) -> Result<(), WorkflowError> {
        if self.is_loading() {
            return Err(WorkflowError::SubmissionInProgress);
        }
        let Some(file) = self.file.clone() else {
            return Err(WorkflowError::NoFileSelected);
        };

        self.state = WorkflowState::Submitting;
        let results =
            match similarity_api::search_similar(&self.client, &file.file_name, file.bytes).await {
                Ok(results) => results,
                Err(e) => {
                    error!("Upload of {} failed: {}", file.file_name, e);
                    self.state = WorkflowState::Failed;
                    return Err(e.into());
                }
            };

        self.results = results;
        self.resolved.clear();
        self.state = WorkflowState::ResultsReceived;

        if !self.results.is_empty() {
            self.state = WorkflowState::ResolvingImages;
            self.resolved = similarity_api::resolve_images(&self.client, &self.results).await;
        }
        self.state = WorkflowState::Ready;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_workflow() -> UploadWorkflow {
        // Port 9 is discard; nothing in these tests may reach the network.
        UploadWorkflow::new(ApiClient::new("http://localhost:9", 1, 1))
    }

    #[tokio::test]
    async fn test_submit_without_selection_is_a_validation_error() {
        let mut workflow = offline_workflow();

        let err = workflow.submit().await.unwrap_err();

        assert!(matches!(err, WorkflowError::NoFileSelected));
        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert!(workflow.results().is_empty());
    }

    #[test]
    fn test_select_file_replaces_previous_selection() {
        let mut workflow = offline_workflow();

        workflow.select_file(SelectedFile {
            file_name: "first.png".to_string(),
            bytes: vec![1],
        });
        workflow.select_file(SelectedFile {
            file_name: "second.png".to_string(),
            bytes: vec![2],
        });

        assert_eq!(workflow.state(), WorkflowState::FileSelected);
        assert_eq!(workflow.file.as_ref().unwrap().file_name, "second.png");
    }

    #[test]
    fn test_fresh_workflow_is_idle_and_not_loading() {
        let workflow = offline_workflow();

        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert!(!workflow.is_loading());
        assert!(workflow.resolved_images().is_empty());
    }
}
