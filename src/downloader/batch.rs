// Batch coordinator - bounded fan-out over many identifiers
//
// Items run on a semaphore-capped worker pool; outcomes land in result
// slots preallocated by input index, so BatchResult order matches the
// enumeration order no matter how workers interleave. One failing item
// never aborts its siblings.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::errors::DownloadError;
use super::models::{BatchResult, ContentIdentifier, DownloadRequest, ItemOutcome};
use super::traits::{ItemExecutor, ProgressObserver};

pub struct BatchCoordinator {
    executor: Arc<dyn ItemExecutor>,
    concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(executor: Arc<dyn ItemExecutor>, concurrency: usize) -> Self {
        Self {
            executor,
            concurrency: concurrency.max(1),
        }
    }

    /// Run every identifier through the item executor, at most
    /// `concurrency` at a time. `observers` supplies one progress observer
    /// per input index.
    pub async fn run_batch(
        &self,
        identifiers: Vec<ContentIdentifier>,
        request: &DownloadRequest,
        dest_dir: &Path,
        observers: impl Fn(usize) -> Arc<dyn ProgressObserver>,
    ) -> BatchResult {
        let total = identifiers.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(total);

        for (index, identifier) in identifiers.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let executor = self.executor.clone();
            let request = request.clone();
            let dest_dir = dest_dir.to_path_buf();
            let observer = observers(index);

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            index,
                            ItemOutcome {
                                identifier: identifier.clone(),
                                title: None,
                                result: Err(DownloadError::Transfer(
                                    "worker pool shut down".to_string(),
                                )),
                            },
                        )
                    }
                };

                info!("[{}/{}] processing {}", index + 1, total, identifier);
                let outcome = executor
                    .run_item(&identifier, &request, &dest_dir, observer)
                    .await;
                (index, outcome)
            }));
        }

        // Slots keyed by input index, never by completion order
        let mut slots: Vec<Option<ItemOutcome>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        for handle in handles {
            match handle.await {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!("batch worker panicked: {}", e),
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(identifiers)
            .map(|(slot, identifier)| {
                slot.unwrap_or_else(|| ItemOutcome {
                    identifier,
                    title: None,
                    result: Err(DownloadError::Transfer("worker panicked".to_string())),
                })
            })
            .collect();

        BatchResult { outcomes }
    }
}
