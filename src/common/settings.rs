use std::path::Path;

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid settings: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Client configuration: an optional settings file overlaid with
/// `SIMFINDER__*` environment variables.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the similarity backend.
    #[validate(url)]
    pub backend_url: String,
    /// Folder where the resolved images of the latest submission are stored.
    pub output_folder: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Fan-out cap for the gallery downloader.
    #[validate(range(min = 1))]
    pub max_concurrent_downloads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            output_folder: "similar-images".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            max_concurrent_downloads: 4,
        }
    }
}

impl Settings {
    /// Load settings from `config_path` (when given) plus environment
    /// variables like `SIMFINDER__BACKEND_URL`.
    ///
    /// # Errors
    /// * When the settings file can't be read or deserialized.
    /// * When the resulting settings don't validate.
    pub fn load(config_path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        let loaded = builder
            .add_source(
                config::Environment::with_prefix("SIMFINDER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = loaded.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}
