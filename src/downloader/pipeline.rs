// Per-item download pipeline: resolve -> select -> transfer -> merge
//
// Strictly sequential within one item: selection needs the resolved
// catalog, and a merge may only start after both transfers of a pair have
// completed. Staging filenames are derived from the sanitized title plus a
// role suffix, so concurrently running items never collide.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::errors::DownloadError;
use super::merger::ContainerMerger;
use super::models::{
    ContentIdentifier, DownloadRequest, ItemMetadata, ItemOutcome, MediaKind,
};
use super::selector::{Selection, VariantSelector};
use super::traits::{ItemExecutor, ProgressObserver, VariantCatalog};
use super::transfer::TransferExecutor;
use super::utils::sanitize_title;
use crate::config::NetworkConfig;

pub struct DownloadPipeline {
    catalog: Arc<dyn VariantCatalog>,
    transfers: TransferExecutor,
    merger: ContainerMerger,
}

impl DownloadPipeline {
    pub fn new(
        catalog: Arc<dyn VariantCatalog>,
        network: &NetworkConfig,
    ) -> Result<Self, DownloadError> {
        Ok(Self {
            catalog,
            transfers: TransferExecutor::new(network)?,
            merger: ContainerMerger::new(),
        })
    }

    async fn fetch_resolved(
        &self,
        meta: &ItemMetadata,
        request: &DownloadRequest,
        dest_dir: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf, DownloadError> {
        let title = sanitize_title(&meta.title);

        match VariantSelector::select(&meta.variants, request) {
            Selection::Single(variant) => {
                info!(
                    "'{}': single {} stream, format {}",
                    meta.title,
                    variant.container,
                    variant.format_id
                );
                let filename = format!("{}.{}", title, variant.container);
                self.transfers
                    .transfer(variant, dest_dir, &filename, observer)
                    .await
            }
            Selection::Pair { video, audio } => {
                info!(
                    "'{}': merging video format {} ({}) with audio format {} ({} kbps)",
                    meta.title,
                    video.format_id,
                    video
                        .resolution
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "unknown".into()),
                    audio.format_id,
                    audio.abr_kbps.unwrap_or(0)
                );

                let video_name = format!("{}-video-temp.{}", title, video.container);
                let audio_name = format!("{}-audio-temp.{}", title, audio.container);

                let video_path = self
                    .transfers
                    .transfer(video, dest_dir, &video_name, observer)
                    .await?;
                let audio_path = self
                    .transfers
                    .transfer(audio, dest_dir, &audio_name, observer)
                    .await?;

                let output = dest_dir.join(format!("{}.{}", title, request.container));
                self.merger
                    .merge(
                        &video_path,
                        &audio_path,
                        &output,
                        meta.duration_seconds,
                        observer,
                    )
                    .await
            }
            Selection::Unavailable => {
                let kind = match request.media_kind {
                    MediaKind::Video => "video",
                    MediaKind::Audio => "audio",
                };
                Err(DownloadError::Unavailable(format!(
                    "no {} variant available for '{}'",
                    kind, meta.title
                )))
            }
        }
    }
}

#[async_trait]
impl ItemExecutor for DownloadPipeline {
    async fn run_item(
        &self,
        identifier: &ContentIdentifier,
        request: &DownloadRequest,
        dest_dir: &Path,
        observer: Arc<dyn ProgressObserver>,
    ) -> ItemOutcome {
        let meta = match self.catalog.resolve(identifier).await {
            Ok(meta) => meta,
            Err(e) => {
                return ItemOutcome {
                    identifier: identifier.clone(),
                    title: None,
                    result: Err(e),
                }
            }
        };

        info!(
            "'{}' by {} ({}:{:02})",
            meta.title,
            meta.uploader,
            meta.duration_seconds / 60,
            meta.duration_seconds % 60
        );

        let result = self
            .fetch_resolved(&meta, request, dest_dir, observer.as_ref())
            .await;

        ItemOutcome {
            identifier: identifier.clone(),
            title: Some(meta.title),
            result,
        }
    }
}
