use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use reelpost_http::HttpClient;
use reelpost_models::{AssetId, MediaAsset, MediaKind, MediaSource};
use reelpost_platforms::PlatformsConfig;
use reelpost_storage::{content_type_for_key, InMemoryStore, ObjectStore, R2Client, ScratchDir};
use reelpost_worker::{LogSink, MediaStager, MultiPlatformPublisher, WorkerConfig};

/// Post `VIDEO_URL`, `IMAGE_URL` or `MEDIA_FILE` with `CAPTION` to the
/// configured platforms once. Exits non-zero if any platform failed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider was already installed");
    }
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WorkerConfig::from_env();
    let asset = asset_from_env()?;

    let store: Arc<dyn ObjectStore> = match R2Client::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) if matches!(asset.source, MediaSource::LocalFile(_)) => {
            return Err(e).context("MEDIA_FILE needs object storage to obtain a public URL");
        }
        // Public URLs pass through staging without touching storage
        Err(_) => Arc::new(InMemoryStore::default()),
    };

    let scratch = ScratchDir::new(&config.scratch_dir);
    let staging = Arc::new(MediaStager::new(scratch, store, config.staging_prefix.clone()));
    let http = HttpClient::from_env().context("failed to create HTTP client")?;
    let publisher =
        MultiPlatformPublisher::from_config(&config, &PlatformsConfig::from_env(), &http, staging);

    println!("reelpost-publish: posting to {:?}", publisher.platforms());
    let report = publisher.publish_all(&asset, &LogSink).await;

    for result in &report.results {
        println!("{}", result.status_line());
    }
    println!("{}", report.summary());

    if !report.all_succeeded() {
        bail!("{} of {} platforms failed", report.failed().len(), report.results.len());
    }
    Ok(())
}

fn asset_from_env() -> anyhow::Result<MediaAsset> {
    let caption = std::env::var("CAPTION").unwrap_or_default();

    let asset = if let Ok(url) = std::env::var("VIDEO_URL") {
        MediaAsset::from_url(url, MediaKind::Video)
    } else if let Ok(url) = std::env::var("IMAGE_URL") {
        MediaAsset::from_url(url, MediaKind::Photo)
    } else if let Ok(path) = std::env::var("MEDIA_FILE") {
        let path = PathBuf::from(path);
        if !path.is_file() {
            bail!("MEDIA_FILE {} does not exist", path.display());
        }
        let mime_type = content_type_for_key(&path.to_string_lossy()).to_string();
        let kind = if mime_type.starts_with("image/") {
            MediaKind::Photo
        } else {
            MediaKind::Video
        };
        MediaAsset {
            id: AssetId::new(),
            source: MediaSource::LocalFile(path),
            kind,
            caption: None,
            mime_type,
        }
    } else {
        bail!("set one of VIDEO_URL, IMAGE_URL or MEDIA_FILE");
    };

    Ok(asset.with_caption(caption))
}
