use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use simfinder::common::api_client::ApiClient;
use simfinder::common::image_utils::is_image_file;
use simfinder::common::settings::Settings;
use simfinder::gallery::GalleryDownloader;
use simfinder::output;
use simfinder::workflow::{SelectedFile, UploadWorkflow};

#[derive(Parser)]
#[command(
    name = "simfinder",
    about = "Find visually similar images via a similarity backend",
    version
)]
struct Cli {
    /// Path to a settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an image and list the similar images the backend returns.
    Search {
        /// The image to search with.
        image: PathBuf,

        /// Base URL of the similarity backend.
        #[arg(long, env = "SIMFINDER__BACKEND_URL")]
        backend_url: Option<String>,

        /// Folder where the resolved result images are stored.
        #[arg(long)]
        output_folder: Option<PathBuf>,
    },
    /// Download the images of a URL manifest into a local gallery.
    Fetch {
        /// JSON manifest of the form {category: {term: [url, ...]}}.
        manifest: PathBuf,

        /// Destination folder for the gallery.
        #[arg(long, default_value = "data/raw")]
        dest: PathBuf,

        /// Maximum number of concurrent downloads.
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Command::Search {
            image,
            backend_url,
            output_folder,
        } => search(&settings, &image, backend_url, output_folder).await,
        Command::Fetch {
            manifest,
            dest,
            max_concurrent,
        } => {
            let downloader = GalleryDownloader::new(
                max_concurrent.unwrap_or(settings.max_concurrent_downloads),
            )?;
            let summary = downloader.download_manifest(&manifest, &dest).await?;
            println!(
                "Downloaded {} images ({} skipped) into {}",
                summary.downloaded,
                summary.skipped,
                dest.display()
            );
            Ok(())
        }
    }
}

async fn search(
    settings: &Settings,
    image: &Path,
    backend_url: Option<String>,
    output_folder: Option<PathBuf>,
) -> anyhow::Result<()> {
    if !is_image_file(image) {
        warn!("{} does not look like an image file", image.display());
    }
    let file_name = image
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToString::to_string)
        .with_context(|| format!("Invalid image file name: {}", image.display()))?;
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;

    let backend_url = backend_url.as_deref().unwrap_or(&settings.backend_url);
    let client = ApiClient::new(
        backend_url,
        settings.connect_timeout_secs,
        settings.request_timeout_secs,
    );
    let mut workflow = UploadWorkflow::new(client);
    workflow.select_file(SelectedFile { file_name, bytes });

    if let Err(e) = workflow.submit().await {
        error!("Submission failed: {}", e);
        anyhow::bail!("There was an error processing your request");
    }

    let output_folder = output_folder.unwrap_or_else(|| PathBuf::from(&settings.output_folder));
    let stored =
        output::save_resolved_images(&output_folder, workflow.results(), workflow.resolved_images())
            .await?;
    output::render_results(workflow.results(), &stored);
    Ok(())
}
