// Transfer executor - streams one variant's bytes to local storage
//
// Bytes land in a `.part` staging file that is renamed into place only on
// success; a failed transfer removes its staging file so nothing on disk
// can be mistaken for a finished download.

use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::errors::DownloadError;
use super::models::VariantDescriptor;
use super::traits::ProgressObserver;
use crate::config::NetworkConfig;

pub struct TransferExecutor {
    client: reqwest::Client,
}

impl TransferExecutor {
    pub fn new(network: &NetworkConfig) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(
                network.timeout_seconds() as u64
            ));

        if let Some(proxy_url) = network.proxy() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| DownloadError::Transfer(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DownloadError::Transfer(format!("failed to build client: {}", e)))?;

        Ok(Self { client })
    }

    /// Fetch `variant` into `dest_dir/filename`, reporting each received
    /// chunk to `observer`. The declared byte size is advisory: it seeds the
    /// progress total but a differing actual size is not an error.
    pub async fn transfer(
        &self,
        variant: &VariantDescriptor,
        dest_dir: &Path,
        filename: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf, DownloadError> {
        let final_path = dest_dir.join(filename);
        let part_path = staging_path(dest_dir, filename);

        debug!("transferring format {} to {:?}", variant.format_id, part_path);
        observer.begin(filename, variant.byte_size.unwrap_or(0));

        match self.stream_to(variant, &part_path, observer).await {
            Ok(written) => {
                fs::rename(&part_path, &final_path).await.map_err(|e| {
                    DownloadError::Transfer(format!("failed to finalize download: {}", e))
                })?;
                observer.finish();
                debug!("transferred {} bytes to {:?}", written, final_path);
                Ok(final_path)
            }
            Err(e) => {
                // Never leave a truncated file that could pass for a result
                let _ = fs::remove_file(&part_path).await;
                observer.finish();
                Err(e)
            }
        }
    }

    async fn stream_to(
        &self,
        variant: &VariantDescriptor,
        part_path: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(&variant.url)
            .send()
            .await
            .map_err(|e| DownloadError::Transfer(e.to_string()))?
            .error_for_status()
            .map_err(|e| DownloadError::Transfer(e.to_string()))?;

        let mut file = fs::File::create(part_path)
            .await
            .map_err(|e| DownloadError::Transfer(format!("cannot create staging file: {}", e)))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let data = chunk.map_err(|e| DownloadError::Transfer(e.to_string()))?;
            file.write_all(&data)
                .await
                .map_err(|e| DownloadError::Transfer(e.to_string()))?;
            written += data.len() as u64;
            observer.on_progress(data.len() as u64);
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::Transfer(e.to_string()))?;

        Ok(written)
    }
}

/// Staging name for an in-flight transfer
pub(crate) fn staging_path(dest_dir: &Path, filename: &str) -> PathBuf {
    dest_dir.join(format!("{}.part", filename))
}
