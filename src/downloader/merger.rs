// Container merger - combines a video-only and an audio-only file via ffmpeg
//
// The video track is stream-copied (never re-encoded); audio is re-encoded
// to AAC because mp4 containers reject some source codecs. Progress comes
// from sampling `time=` lines on ffmpeg's stderr, normalized by the expected
// duration. On success both inputs are deleted; on failure both are kept for
// inspection and any partial output is removed.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use super::errors::DownloadError;
use super::traits::ProgressObserver;

lazy_static! {
    static ref TIME_RE: Regex = Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").unwrap();
}

/// Parse the elapsed media time from an ffmpeg stderr line like
/// `frame= 123 fps= 30 ... time=00:01:23.45 bitrate= ...`
fn parse_ffmpeg_time(line: &str) -> Option<f64> {
    let caps = TIME_RE.captures(line)?;
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Turns noisy media-time samples into clamped, never-regressing deltas
/// (milliseconds of media time, bounded by the expected duration)
struct MergeProgress {
    total_ms: u64,
    emitted_ms: u64,
}

impl MergeProgress {
    fn new(expected_duration_seconds: u64) -> Self {
        Self {
            total_ms: expected_duration_seconds * 1000,
            emitted_ms: 0,
        }
    }

    fn observe(&mut self, sample_seconds: f64, observer: &dyn ProgressObserver) {
        if self.total_ms == 0 || !sample_seconds.is_finite() {
            return;
        }
        let sample_ms = (sample_seconds.max(0.0) * 1000.0) as u64;
        let clamped = sample_ms.min(self.total_ms);
        if clamped > self.emitted_ms {
            observer.on_progress(clamped - self.emitted_ms);
            self.emitted_ms = clamped;
        }
    }

    fn complete(&mut self, observer: &dyn ProgressObserver) {
        if self.total_ms > self.emitted_ms {
            observer.on_progress(self.total_ms - self.emitted_ms);
            self.emitted_ms = self.total_ms;
        }
    }
}

pub struct ContainerMerger {
    ffmpeg_path: String,
}

impl ContainerMerger {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: Self::find_ffmpeg(),
        }
    }

    /// Use a specific ffmpeg binary instead of discovering one
    pub(crate) fn with_path(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Find the ffmpeg binary
    fn find_ffmpeg() -> String {
        let common_paths = vec![
            "/opt/homebrew/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            "/usr/bin/ffmpeg",
            "ffmpeg",
        ];

        for path in common_paths {
            if std::path::Path::new(path).exists() {
                return path.to_string();
            }
        }

        if let Ok(output) = std::process::Command::new("which").arg("ffmpeg").output() {
            if output.status.success() {
                if let Ok(path) = String::from_utf8(output.stdout) {
                    let trimmed = path.trim();
                    if !trimmed.is_empty() {
                        return trimmed.to_string();
                    }
                }
            }
        }

        "ffmpeg".to_string()
    }

    pub fn is_available(&self) -> bool {
        match std::process::Command::new(&self.ffmpeg_path)
            .arg("-version")
            .output()
        {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    /// Merge `video_path` and `audio_path` into `output_path`.
    ///
    /// Both inputs must exist and be non-empty. Returns the output path on
    /// success, after deleting both inputs.
    pub async fn merge(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        expected_duration_seconds: u64,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf, DownloadError> {
        for input in [video_path, audio_path] {
            let len = fs::metadata(input)
                .await
                .map_err(|e| DownloadError::Merge(format!("missing input {:?}: {}", input, e)))?
                .len();
            if len == 0 {
                return Err(DownloadError::Merge(format!("input {:?} is empty", input)));
            }
        }

        debug!(
            "merging {:?} + {:?} -> {:?}",
            video_path, audio_path, output_path
        );
        observer.begin("merge", expected_duration_seconds * 1000);

        let mut child = TokioCommand::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(video_path)
            .arg("-i")
            .arg(audio_path)
            .args(["-c:v", "copy", "-c:a", "aac", "-y"])
            .arg(output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DownloadError::Merge(
                        "ffmpeg not found; install FFmpeg to merge separate streams".to_string(),
                    )
                } else {
                    DownloadError::Merge(format!("failed to start ffmpeg: {}", e))
                }
            })?;

        let mut progress = MergeProgress::new(expected_duration_seconds);
        let mut stderr_tail = String::new();

        // ffmpeg terminates progress lines with \r, everything else with \n
        if let Some(mut stderr) = child.stderr.take() {
            let mut line = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = match stderr.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(_) => break,
                };
                for &byte in &buf[..n] {
                    if byte == b'\r' || byte == b'\n' {
                        if !line.is_empty() {
                            let text = String::from_utf8_lossy(&line);
                            if let Some(seconds) = parse_ffmpeg_time(&text) {
                                progress.observe(seconds, observer);
                            } else {
                                stderr_tail.push_str(&text);
                                stderr_tail.push('\n');
                                if stderr_tail.len() > 4096 {
                                    let cut = stderr_tail.len() - 4096;
                                    stderr_tail.drain(..cut);
                                }
                            }
                            line.clear();
                        }
                    } else {
                        line.push(byte);
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::Merge(format!("failed to wait for ffmpeg: {}", e)))?;

        let output_ok = match fs::metadata(output_path).await {
            Ok(meta) => meta.len() > 0,
            Err(_) => false,
        };

        if !status.success() || !output_ok {
            // Keep the inputs for manual recovery, drop the partial output
            let _ = fs::remove_file(output_path).await;
            observer.finish();
            let reason = if status.success() {
                "ffmpeg produced no output".to_string()
            } else {
                format!("ffmpeg exited with {}: {}", status, stderr_tail.trim())
            };
            return Err(DownloadError::Merge(reason));
        }

        progress.complete(observer);
        observer.finish();

        for input in [video_path, audio_path] {
            if let Err(e) = fs::remove_file(input).await {
                warn!("could not remove merged input {:?}: {}", input, e);
            }
        }

        Ok(output_path.to_path_buf())
    }
}

impl Default for ContainerMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::traits::NullProgress;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct Recorder {
        deltas: Mutex<Vec<u64>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                deltas: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressObserver for Recorder {
        fn on_progress(&self, delta: u64) {
            self.deltas.lock().unwrap().push(delta);
        }
    }

    #[test]
    fn parses_ffmpeg_time_lines() {
        let line = "frame=  454 fps= 52 q=-1.0 size=    4096kB time=00:01:23.45 bitrate= 401.3kbits/s";
        let seconds = parse_ffmpeg_time(line).unwrap();
        assert!((seconds - 83.45).abs() < 0.001);
        assert_eq!(parse_ffmpeg_time("no progress here"), None);
    }

    #[test]
    fn noisy_samples_never_emit_negative_or_regressing_deltas() {
        let recorder = Recorder::new();
        let mut progress = MergeProgress::new(100);

        progress.observe(10.0, &recorder);
        progress.observe(5.0, &recorder); // regression in the sample stream
        progress.observe(30.0, &recorder);
        progress.observe(30.0, &recorder); // repeat

        let deltas = recorder.deltas.lock().unwrap().clone();
        assert_eq!(deltas, vec![10_000, 20_000]);
    }

    #[test]
    fn samples_are_clamped_to_expected_duration() {
        let recorder = Recorder::new();
        let mut progress = MergeProgress::new(60);

        progress.observe(59.0, &recorder);
        progress.observe(600.0, &recorder); // garbage way past the end
        progress.complete(&recorder);

        let deltas = recorder.deltas.lock().unwrap().clone();
        assert_eq!(deltas.iter().sum::<u64>(), 60_000);
    }

    #[test]
    fn zero_duration_emits_nothing_until_complete() {
        let recorder = Recorder::new();
        let mut progress = MergeProgress::new(0);

        progress.observe(10.0, &recorder);
        progress.complete(&recorder);

        assert!(recorder.deltas.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_input_is_rejected_before_spawning_ffmpeg() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("clip-video-temp.mp4");
        let audio = dir.path().join("clip-audio-temp.m4a");
        let output = dir.path().join("clip.mp4");
        std::fs::write(&audio, b"audio bytes").unwrap();

        let merger = ContainerMerger::with_path("ffmpeg-that-does-not-exist");
        let err = merger
            .merge(&video, &audio, &output, 60, &NullProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Merge(_)));
        // The surviving input is untouched and no output appeared
        assert_eq!(std::fs::read(&audio).unwrap(), b"audio bytes");
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_spawning_ffmpeg() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("clip-video-temp.mp4");
        let audio = dir.path().join("clip-audio-temp.m4a");
        let output = dir.path().join("clip.mp4");
        std::fs::write(&video, b"").unwrap();
        std::fs::write(&audio, b"audio bytes").unwrap();

        let merger = ContainerMerger::with_path("ffmpeg-that-does-not-exist");
        let err = merger
            .merge(&video, &audio, &output, 60, &NullProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Merge(_)));
        assert!(video.exists());
        assert_eq!(std::fs::read(&audio).unwrap(), b"audio bytes");
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn failed_merge_keeps_both_inputs_and_no_partial_output() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("clip-video-temp.mp4");
        let audio = dir.path().join("clip-audio-temp.m4a");
        let output = dir.path().join("clip.mp4");
        std::fs::write(&video, b"video bytes").unwrap();
        std::fs::write(&audio, b"audio bytes").unwrap();

        let merger = ContainerMerger::with_path("ffmpeg-that-does-not-exist");
        let err = merger
            .merge(&video, &audio, &output, 60, &NullProgress)
            .await
            .unwrap_err();

        match err {
            DownloadError::Merge(reason) => assert!(reason.contains("ffmpeg")),
            other => panic!("expected Merge, got {:?}", other),
        }
        assert_eq!(std::fs::read(&video).unwrap(), b"video bytes");
        assert_eq!(std::fs::read(&audio).unwrap(), b"audio bytes");
        assert!(!output.exists());
    }
}
