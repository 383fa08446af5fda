use anyhow::{Context, bail};
use b2_media_gallery::client::{
    DEFAULT_PART_SIZE, GalleryClient, MultipartOrchestrator, PendingUploads, local_file_name,
};
use b2_media_gallery::models::content_type_from_extension;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gallery", about = "Browse and upload to a shared B2 media gallery")]
struct Cli {
    /// Base URL of the gallery server
    #[arg(long, env = "GALLERY_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List shared media, newest first
    List,
    /// Upload images or videos through the multipart flow
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Part size in bytes
        #[arg(long, default_value_t = DEFAULT_PART_SIZE)]
        part_size: usize,
        /// Override the detected media type for every file
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Download one object
    Download {
        key: String,
        /// Destination file (defaults to the key's file name)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Download every listed object into a directory
    DownloadAll {
        /// Target directory, created if missing
        #[arg(long, short, default_value = ".")]
        dir: PathBuf,
    },
    /// Delete one object
    Delete { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gallery=info,b2_media_gallery=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let client = GalleryClient::new(&cli.server)?;

    match cli.command {
        Command::List => {
            let images = client.list_images().await?;
            if images.is_empty() {
                println!("No media yet.");
            }
            for image in images {
                let modified = image
                    .last_modified
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<5}  {:>12}  {:<25}  {}", image.kind, image.size, modified, image.key);
            }
        }
        Command::Upload {
            files,
            part_size,
            content_type,
        } => {
            let mut pending = PendingUploads::new();
            for path in &files {
                let detected = match &content_type {
                    Some(ct) => ct.clone(),
                    None => detect_content_type(path)?,
                };
                match pending.stage(path, &detected).await {
                    Ok(item) => info!(
                        "📎 Staged {} as {} ({} bytes)",
                        item.file_name, item.kind, item.size
                    ),
                    Err(e) => warn!("⚠️  Skipping: {}", e),
                }
            }

            if pending.is_empty() {
                bail!("Nothing to upload: select at least one image or video.");
            }

            let orchestrator =
                MultipartOrchestrator::new(&client, &client).with_part_size(part_size);
            let sessions = pending.submit(&orchestrator).await?;
            for session in sessions {
                println!("{}", session.key);
            }
        }
        Command::Download { key, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(local_file_name(&key)));
            let mut file = tokio::fs::File::create(&output)
                .await
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let summary = client.download_to(&key, &mut file).await?;
            info!(
                "💾 Saved {} bytes ({}) to {}",
                summary.bytes,
                summary.content_type.as_deref().unwrap_or("unknown type"),
                output.display()
            );
        }
        Command::DownloadAll { dir } => {
            let saved = client.download_all(&dir).await?;
            if saved.is_empty() {
                println!("No media yet.");
            }
            for path in &saved {
                println!("{}", path.display());
            }
            info!("💾 Downloaded {} file(s) to {}", saved.len(), dir.display());
        }
        Command::Delete { key } => {
            client.delete_image(&key).await?;
            info!("🗑️  Deleted {}", key);
        }
    }

    Ok(())
}

/// Sniff the media type from the file's leading bytes, falling back to the
/// extension for formats without a reliable signature. Anything else is
/// reported as `application/octet-stream` so staging refuses it.
fn detect_content_type(path: &Path) -> anyhow::Result<String> {
    if let Some(kind) = infer::get_from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
    {
        return Ok(kind.mime_type().to_string());
    }

    let fallback = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(content_type_from_extension)
        .unwrap_or("application/octet-stream");
    Ok(fallback.to_string())
}
