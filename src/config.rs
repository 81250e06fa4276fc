// Run configuration and validation tables

use serde::{Deserialize, Serialize};

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{MediaKind, Resolution};

/// Containers accepted for video requests
pub const VALID_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "wmv", "webm"];

/// Containers accepted for audio requests
pub const VALID_AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "ogg", "wma", "flac", "m4a"];

/// Network settings shared by catalog lookups and transfers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g. "socks5://127.0.0.1:1080")
    proxy: Option<String>,

    /// Request timeout in seconds
    timeout_seconds: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_seconds: 30,
        }
    }
}

impl NetworkConfig {
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds
    }
}

/// Whole-run configuration, fixed before the first catalog lookup
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub media_kind: MediaKind,
    pub container: String,
    pub resolution: Resolution,
    /// Archive the finished directory into a ZIP and remove it
    pub create_zip: bool,
    /// Worker cap for batch runs
    pub concurrency: usize,
    pub network: NetworkConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            media_kind: MediaKind::Video,
            container: "mp4".to_string(),
            resolution: Resolution::P720,
            create_zip: false,
            concurrency: 4,
            network: NetworkConfig::default(),
        }
    }
}

impl DownloadConfig {
    /// Reject containers that make no sense for the requested kind
    pub fn validate(&self) -> Result<(), DownloadError> {
        let table = match self.media_kind {
            MediaKind::Video => VALID_VIDEO_EXTENSIONS,
            MediaKind::Audio => VALID_AUDIO_EXTENSIONS,
        };
        if table.contains(&self.container.as_str()) {
            Ok(())
        } else {
            Err(DownloadError::InvalidRequest(format!(
                "'{}' is not a valid {} container (expected one of {})",
                self.container,
                match self.media_kind {
                    MediaKind::Video => "video",
                    MediaKind::Audio => "audio",
                },
                table.join(", ")
            )))
        }
    }
}
