// tubedl CLI - resolve a URL (video, playlist, or channel), download the
// best matching variants, and merge separate streams where needed.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tubedl::config::{DownloadConfig, NetworkConfig};
use tubedl::downloader::{
    BatchCoordinator, ContainerMerger, ContentIdentifier, DownloadPipeline, DownloadRequest,
    MediaKind, ProgressObserver, Resolution, VariantCatalog, YtDlpCatalog,
};
use tubedl::files;

#[derive(Parser, Debug)]
#[command(name = "tubedl", version, about = "Download YouTube videos, playlists, and channels")]
struct Args {
    /// Video, playlist, or channel URL
    url: String,

    /// Download audio only
    #[arg(short, long)]
    audio: bool,

    /// Output container (mp4, webm, ... for video; mp3, m4a, ... for audio)
    #[arg(short, long)]
    format: Option<String>,

    /// Target resolution for video downloads
    #[arg(short, long, default_value = "720p")]
    resolution: String,

    /// Archive the finished directory into a ZIP
    #[arg(short, long)]
    zip: bool,

    /// Concurrent downloads for playlists and channels
    #[arg(short, long, default_value_t = 4)]
    jobs: usize,

    /// Proxy URL (e.g. socks5://127.0.0.1:1080)
    #[arg(long)]
    proxy: Option<String>,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u32,

    /// Base directory for the Download folder (defaults to the home directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Logs phase transitions and coarse progress milestones for one item
struct LogProgress {
    label: Mutex<String>,
    total: AtomicU64,
    done: AtomicU64,
    last_decile: AtomicU64,
}

impl LogProgress {
    fn new() -> Self {
        Self {
            label: Mutex::new(String::new()),
            total: AtomicU64::new(0),
            done: AtomicU64::new(0),
            last_decile: AtomicU64::new(0),
        }
    }
}

impl ProgressObserver for LogProgress {
    fn begin(&self, label: &str, total: u64) {
        if let Ok(mut current) = self.label.lock() {
            current.clear();
            current.push_str(label);
        }
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        self.last_decile.store(0, Ordering::Relaxed);
        info!("starting {}", label);
    }

    fn on_progress(&self, delta: u64) {
        let done = self.done.fetch_add(delta, Ordering::Relaxed) + delta;
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return;
        }
        let decile = (done * 10 / total).min(10);
        if decile > self.last_decile.swap(decile, Ordering::Relaxed) {
            let label = self
                .label
                .lock()
                .map(|l| l.clone())
                .unwrap_or_default();
            info!("{}: {}%", label, decile * 10);
        }
    }

    fn finish(&self) {
        let label = self
            .label
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default();
        info!("finished {}", label);
    }
}

fn build_config(args: &Args) -> Result<DownloadConfig, String> {
    let media_kind = if args.audio {
        MediaKind::Audio
    } else {
        MediaKind::Video
    };

    let container = match &args.format {
        Some(format) => format.to_lowercase(),
        None => match media_kind {
            MediaKind::Video => "mp4".to_string(),
            MediaKind::Audio => "mp3".to_string(),
        },
    };

    let resolution: Resolution = args.resolution.parse().map_err(|e| format!("{}", e))?;

    let config = DownloadConfig {
        media_kind,
        container,
        resolution,
        create_zip: args.zip,
        concurrency: args.jobs,
        network: NetworkConfig::default()
            .with_proxy(args.proxy.clone())
            .with_timeout(args.timeout),
    };
    config.validate().map_err(|e| format!("{}", e))?;
    Ok(config)
}

async fn run(args: Args) -> Result<(), String> {
    let config = build_config(&args)?;

    let base = match args.output {
        Some(path) => path,
        None => dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
    };

    // Video requests may need a merge step; warn up front rather than
    // failing halfway through a batch
    if config.media_kind == MediaKind::Video && !ContainerMerger::new().is_available() {
        warn!("ffmpeg not found; downloads needing a merge will fail");
    }

    let catalog = Arc::new(YtDlpCatalog::new(config.network.clone()));
    let identifier = ContentIdentifier::new(args.url);

    info!("resolving {}", identifier);
    let identifiers = catalog
        .enumerate(&identifier)
        .await
        .map_err(|e| format!("{}", e))?;
    if identifiers.is_empty() {
        return Err("nothing to download".to_string());
    }
    info!("{} item(s) to download", identifiers.len());

    let pipeline = Arc::new(
        DownloadPipeline::new(catalog, &config.network).map_err(|e| format!("{}", e))?,
    );
    let coordinator = BatchCoordinator::new(pipeline, config.concurrency);

    let dest_dir =
        files::provision_download_dir(&base).map_err(|e| format!("cannot create download directory: {}", e))?;
    info!("downloading into {:?}", dest_dir);

    let request = DownloadRequest {
        media_kind: config.media_kind,
        container: config.container.clone(),
        resolution: config.resolution,
    };

    let result = coordinator
        .run_batch(identifiers, &request, &dest_dir, |_| Arc::new(LogProgress::new()))
        .await;

    for outcome in &result.outcomes {
        match &outcome.result {
            Ok(path) => info!("done: {:?}", path),
            Err(e) => warn!("failed: {} ({})", outcome.identifier, e),
        }
    }
    info!(
        "{} succeeded, {} failed out of {}",
        result.succeeded(),
        result.failed(),
        result.outcomes.len()
    );

    if let Err(e) = files::normalize_extensions(&dest_dir, &config.container) {
        warn!("extension normalization failed: {}", e);
    }

    if config.create_zip {
        let zip_path =
            files::create_zip_archive(&dest_dir).map_err(|e| format!("archiving failed: {}", e))?;
        info!("archive ready: {:?}", zip_path);
    }

    if result.succeeded() == 0 {
        return Err("all downloads failed".to_string());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}
