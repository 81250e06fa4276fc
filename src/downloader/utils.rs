// Helper functions shared by catalog and merger

use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

/// Run a command, capture stdout/stderr, kill it past the timeout
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, String> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| format!("Failed to capture stdout from {}", program))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| format!("Failed to capture stderr from {}", program))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stdout: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stderr: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });

    let waited = timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res.map_err(|e| format!("Failed to wait for {}: {}", program, e))?;
            let stdout = stdout_task
                .await
                .map_err(|e| format!("stdout task failed: {}", e))??;
            let stderr = stderr_task
                .await
                .map_err(|e| format!("stderr task failed: {}", e))??;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(format!("Timed out after {}s", timeout_secs))
        }
    }
}

/// Make a video title safe to use as a file name.
///
/// Replaces path separators and shell-hostile characters, collapses
/// whitespace, and trims to a sane length so derived staging names
/// (`<title>-video-temp.<ext>`) never collide with the filesystem rules.
pub fn sanitize_title(title: &str) -> String {
    const MAX_LEN: usize = 120;

    let mut out = String::with_capacity(title.len());
    let mut last_was_space = false;
    for ch in title.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        };
        if mapped.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(mapped);
            last_was_space = false;
        }
    }

    let trimmed = out.trim().trim_matches('.');
    let mut result: String = trimmed.chars().take(MAX_LEN).collect();
    if result.is_empty() {
        result = "untitled".to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_separators() {
        assert_eq!(sanitize_title("a/b\\c"), "a_b_c");
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(sanitize_title("  My   Video \n Title  "), "My Video Title");
    }

    #[test]
    fn empty_titles_fall_back() {
        assert_eq!(sanitize_title("///"), "___");
        assert_eq!(sanitize_title("   "), "untitled");
    }

    #[test]
    fn long_titles_are_truncated() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_title(&long).len(), 120);
    }
}
