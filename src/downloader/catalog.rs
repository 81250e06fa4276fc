// Variant catalog backed by the yt-dlp binary
//
// Resolution shells out to `yt-dlp --dump-json` and maps the formats array
// onto typed VariantDescriptors. Playlist and channel identifiers are
// expanded with `--flat-playlist`, one JSON entry per line; playlists found
// while enumerating a channel are expanded once more.

use async_trait::async_trait;
use std::process::Command as StdCommand;
use tracing::{debug, warn};

use super::errors::DownloadError;
use super::models::{
    ContentIdentifier, ItemMetadata, Resolution, StreamKind, UrlKind, VariantDescriptor,
};
use super::traits::VariantCatalog;
use super::utils::run_output_with_timeout;
use crate::config::NetworkConfig;

pub struct YtDlpCatalog {
    ytdlp_path: String,
    network: NetworkConfig,
}

impl YtDlpCatalog {
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            ytdlp_path: Self::find_ytdlp(),
            network,
        }
    }

    /// Find the yt-dlp binary
    fn find_ytdlp() -> String {
        let common_paths = vec![
            "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
            "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
            "/usr/bin/yt-dlp",          // System installation
            "yt-dlp",                   // In PATH
        ];

        for path in common_paths {
            if std::path::Path::new(path).exists() {
                return path.to_string();
            }
        }

        if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
            if output.status.success() {
                if let Ok(path) = String::from_utf8(output.stdout) {
                    let trimmed = path.trim();
                    if !trimmed.is_empty() {
                        return trimmed.to_string();
                    }
                }
            }
        }

        "yt-dlp".to_string()
    }

    pub fn is_available(&self) -> bool {
        match StdCommand::new(&self.ytdlp_path).arg("--version").output() {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.network.timeout_seconds().to_string(),
            "--retries".to_string(),
            "2".to_string(),
        ];

        if let Some(proxy) = self.network.proxy() {
            args.push("--proxy".to_string());
            args.push(proxy.to_string());
        }

        args
    }

    fn resolve_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["--dump-json".to_string(), "--no-playlist".to_string()];
        args.extend(self.base_args());
        args.push(url.to_string());
        args
    }

    fn enumerate_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["--dump-json".to_string(), "--flat-playlist".to_string()];
        args.extend(self.base_args());
        args.push(url.to_string());
        args
    }

    fn parse_metadata(stdout: &[u8]) -> Result<ItemMetadata, DownloadError> {
        let json_str = String::from_utf8_lossy(stdout);
        let json: serde_json::Value = serde_json::from_str(&json_str)
            .map_err(|e| DownloadError::Parse(format!("Invalid JSON: {}", e)))?;

        let variants = Self::parse_variants(&json)?;

        Ok(ItemMetadata {
            id: json["id"].as_str().unwrap_or("unknown").to_string(),
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
            duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
            variants,
        })
    }

    fn parse_variants(json: &serde_json::Value) -> Result<Vec<VariantDescriptor>, DownloadError> {
        let formats_array = json["formats"]
            .as_array()
            .ok_or_else(|| DownloadError::Parse("No formats array in JSON".to_string()))?;

        let mut variants = Vec::new();

        for f in formats_array {
            // No fetch handle means nothing downloadable
            let url = match f["url"].as_str() {
                Some(u) if !u.is_empty() => u.to_string(),
                _ => continue,
            };

            let has_video = f["vcodec"].as_str().map_or(false, |v| v != "none");
            let has_audio = f["acodec"].as_str().map_or(false, |a| a != "none");

            let kind = match (has_video, has_audio) {
                (true, true) => StreamKind::Progressive,
                (true, false) => StreamKind::VideoOnly,
                (false, true) => StreamKind::AudioOnly,
                // Storyboards and other track-less entries
                (false, false) => continue,
            };

            variants.push(VariantDescriptor {
                format_id: f["format_id"].as_str().unwrap_or("").to_string(),
                kind,
                container: f["ext"].as_str().unwrap_or("").to_string(),
                resolution: f["height"]
                    .as_u64()
                    .and_then(|h| Resolution::from_height(h as u32)),
                abr_kbps: f["abr"].as_f64().map(|a| a.round() as u32),
                byte_size: f["filesize"].as_u64().or(f["filesize_approx"].as_u64()),
                url,
            });
        }

        Ok(variants)
    }

    /// One flat-playlist JSON object per stdout line
    fn parse_entries(stdout: &[u8]) -> Vec<ContentIdentifier> {
        let text = String::from_utf8_lossy(stdout);
        let mut entries = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let json: serde_json::Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    warn!("skipping malformed playlist entry: {}", e);
                    continue;
                }
            };

            if let Some(url) = json["url"].as_str() {
                entries.push(ContentIdentifier::new(url));
            } else if let Some(id) = json["id"].as_str() {
                entries.push(ContentIdentifier::new(format!(
                    "https://www.youtube.com/watch?v={}",
                    id
                )));
            }
        }

        entries
    }

    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>, DownloadError> {
        if !self.is_available() {
            return Err(DownloadError::ToolNotFound(
                "yt-dlp binary not found".to_string(),
            ));
        }

        let timeout = self.network.timeout_seconds() as u64 * 4;
        let output = run_output_with_timeout(&self.ytdlp_path, args, timeout)
            .await
            .map_err(DownloadError::from)?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DownloadError::from(stderr.to_string()))
        }
    }

    async fn expand_flat(
        &self,
        identifier: &ContentIdentifier,
    ) -> Result<Vec<ContentIdentifier>, DownloadError> {
        debug!("enumerating {}", identifier);
        let stdout = self.run(self.enumerate_args(identifier.as_str())).await?;
        Ok(Self::parse_entries(&stdout))
    }
}

#[async_trait]
impl VariantCatalog for YtDlpCatalog {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(
        &self,
        identifier: &ContentIdentifier,
    ) -> Result<ItemMetadata, DownloadError> {
        debug!("resolving {}", identifier);
        let stdout = self.run(self.resolve_args(identifier.as_str())).await?;
        Self::parse_metadata(&stdout)
    }

    async fn enumerate(
        &self,
        identifier: &ContentIdentifier,
    ) -> Result<Vec<ContentIdentifier>, DownloadError> {
        match identifier.kind() {
            UrlKind::Single => Ok(vec![identifier.clone()]),
            UrlKind::Playlist => self.expand_flat(identifier).await,
            UrlKind::Channel => {
                let entries = self.expand_flat(identifier).await?;
                let mut items = Vec::with_capacity(entries.len());
                for entry in entries {
                    // Channels may surface playlists; expand those one level,
                    // skipping any that fail to enumerate
                    if entry.kind() == UrlKind::Playlist {
                        match self.expand_flat(&entry).await {
                            Ok(nested) => items.extend(nested),
                            Err(e) => warn!("skipping playlist {}: {}", entry, e),
                        }
                    } else {
                        items.push(entry);
                    }
                }
                Ok(items)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM_JSON: &str = r#"{
        "id": "abc123",
        "title": "Test Video",
        "uploader": "Tester",
        "duration": 212.4,
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none",
             "url": "https://cdn.test/sb"},
            {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2",
             "height": 360, "filesize": 1000, "url": "https://cdn.test/18"},
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none",
             "height": 1080, "filesize_approx": 9000, "url": "https://cdn.test/137"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2",
             "abr": 129.5, "filesize": 500, "url": "https://cdn.test/140"},
            {"format_id": "nourl", "ext": "mp4", "vcodec": "avc1", "acodec": "none"}
        ]
    }"#;

    #[test]
    fn parses_metadata_and_variant_kinds() {
        let meta = YtDlpCatalog::parse_metadata(ITEM_JSON.as_bytes()).unwrap();
        assert_eq!(meta.id, "abc123");
        assert_eq!(meta.title, "Test Video");
        assert_eq!(meta.duration_seconds, 212);

        // Storyboard and the url-less entry are dropped
        assert_eq!(meta.variants.len(), 3);
        assert_eq!(meta.variants[0].kind, StreamKind::Progressive);
        assert_eq!(meta.variants[0].resolution, Some(Resolution::P360));
        assert_eq!(meta.variants[1].kind, StreamKind::VideoOnly);
        assert_eq!(meta.variants[1].byte_size, Some(9000));
        assert_eq!(meta.variants[2].kind, StreamKind::AudioOnly);
        assert_eq!(meta.variants[2].abr_kbps, Some(130));
    }

    #[test]
    fn rejects_json_without_formats() {
        let err = YtDlpCatalog::parse_metadata(br#"{"id": "x"}"#).unwrap_err();
        assert!(matches!(err, DownloadError::Parse(_)));
    }

    #[test]
    fn parses_flat_playlist_entries_line_by_line() {
        let lines = concat!(
            r#"{"id": "one", "url": "https://www.youtube.com/watch?v=one"}"#,
            "\n",
            "not json\n",
            r#"{"id": "two"}"#,
            "\n",
        );
        let entries = YtDlpCatalog::parse_entries(lines.as_bytes());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].as_str(), "https://www.youtube.com/watch?v=one");
        assert_eq!(entries[1].as_str(), "https://www.youtube.com/watch?v=two");
    }
}
