// Download core - catalog resolution, selection, transfer, merge, batching

pub mod batch;
pub mod catalog;
pub mod errors;
pub mod merger;
pub mod models;
pub mod pipeline;
pub mod selector;
pub mod traits;
pub mod transfer;
pub mod utils;

pub use batch::BatchCoordinator;
pub use catalog::YtDlpCatalog;
pub use errors::DownloadError;
pub use merger::ContainerMerger;
pub use models::{
    BatchResult, ContentIdentifier, DownloadRequest, ItemMetadata, ItemOutcome, MediaKind,
    Resolution, StreamKind, UrlKind, VariantDescriptor,
};
pub use pipeline::DownloadPipeline;
pub use selector::{Selection, VariantSelector};
pub use traits::{ItemExecutor, NullProgress, ProgressObserver, VariantCatalog};
pub use transfer::TransferExecutor;
