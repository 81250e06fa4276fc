// tubedl - YouTube download core: variant selection, streamed transfers,
// ffmpeg merging, and bounded-concurrency batch runs.

pub mod config;
pub mod downloader;
pub mod files;

pub use config::{DownloadConfig, NetworkConfig};
pub use downloader::{
    BatchCoordinator, BatchResult, ContainerMerger, ContentIdentifier, DownloadError,
    DownloadPipeline, DownloadRequest, ItemExecutor, ItemOutcome, MediaKind, NullProgress,
    ProgressObserver, Resolution, Selection, TransferExecutor, UrlKind, VariantCatalog,
    VariantDescriptor, VariantSelector, YtDlpCatalog,
};
