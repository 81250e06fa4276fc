// Core trait seams: catalog resolution, per-item execution, progress observation

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::errors::DownloadError;
use super::models::{ContentIdentifier, DownloadRequest, ItemMetadata, ItemOutcome};

/// Resolves content identifiers into variant listings
#[async_trait]
pub trait VariantCatalog: Send + Sync {
    /// Name of the catalog backend (for logging)
    fn name(&self) -> &'static str;

    /// Resolve an identifier into item metadata with all available variants.
    /// Makes no quality judgment: a faithful listing in upstream order.
    async fn resolve(&self, identifier: &ContentIdentifier)
        -> Result<ItemMetadata, DownloadError>;

    /// Expand a playlist/channel identifier into its item identifiers.
    /// Single identifiers expand to themselves.
    async fn enumerate(
        &self,
        identifier: &ContentIdentifier,
    ) -> Result<Vec<ContentIdentifier>, DownloadError>;
}

/// Runs the whole pipeline for one identifier; the seam the batch
/// coordinator fans out over.
///
/// Never panics and never propagates: every error kind is folded into the
/// returned outcome so one bad item cannot abort its siblings.
#[async_trait]
pub trait ItemExecutor: Send + Sync {
    async fn run_item(
        &self,
        identifier: &ContentIdentifier,
        request: &DownloadRequest,
        dest_dir: &Path,
        observer: Arc<dyn ProgressObserver>,
    ) -> ItemOutcome;
}

/// Receives incremental progress from transfer and merge jobs.
///
/// Injected per job; implementations must not block and must tolerate
/// being called from a worker task rather than the caller's context.
pub trait ProgressObserver: Send + Sync {
    /// A new phase begins. `total` is advisory (0 when unknown): bytes for
    /// transfers, milliseconds of media time for merges.
    fn begin(&self, label: &str, total: u64) {
        let _ = (label, total);
    }

    /// Monotonic non-negative increment within the current phase.
    fn on_progress(&self, delta: u64);

    /// The current phase reached a terminal state.
    fn finish(&self) {}
}

/// Observer that discards everything
pub struct NullProgress;

impl ProgressObserver for NullProgress {
    fn on_progress(&self, _delta: u64) {}
}
