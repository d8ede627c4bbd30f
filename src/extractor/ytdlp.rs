//! yt-dlp wrapper for media extraction
//!
//! This module drives the `yt-dlp` binary as a child process. Format
//! selection, muxing and transcoding are left entirely to yt-dlp (and the
//! ffmpeg it shells out to); we only build the argument list and interpret
//! the outcome.

use crate::extractor::models::{MediaKind, ProducedFile};
use crate::extractor::traits::Extractor;
use crate::utils::error::{ExtractionError, ExtractionErrorKind};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// Media extractor backed by yt-dlp
pub struct YtDlpExtractor {
    ytdlp_path: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl YtDlpExtractor {
    /// Locate yt-dlp (honouring an explicit override) and build the extractor.
    ///
    /// A missing binary is not fatal here: the server still starts and every
    /// extraction fails with [`ExtractionErrorKind::ToolMissing`].
    pub fn new(override_path: Option<PathBuf>, timeout: Option<Duration>) -> Self {
        let ytdlp_path = find_ytdlp(override_path.as_deref());
        match &ytdlp_path {
            Some(path) => info!("Found yt-dlp at: {}", path.display()),
            None => warn!("yt-dlp not found, extraction requests will fail"),
        }
        Self {
            ytdlp_path,
            timeout,
        }
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> Option<&Path> {
        self.ytdlp_path.as_deref()
    }

    async fn run(&self, ytdlp: &Path, args: Vec<OsString>) -> Result<Output, ExtractionError> {
        let mut command = AsyncCommand::new(ytdlp);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output();
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, output).await {
                Ok(result) => result,
                Err(_) => {
                    error!("yt-dlp timed out after {}s", limit.as_secs_f64());
                    return Err(ExtractionError::new(
                        ExtractionErrorKind::Timeout,
                        format!("yt-dlp timed out after {}s", limit.as_secs_f64()),
                    ));
                }
            },
            None => output.await,
        };

        result.map_err(|e| {
            ExtractionError::new(
                ExtractionErrorKind::Spawn,
                format!("failed to run {}: {}", ytdlp.display(), e),
            )
        })
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn id(&self) -> &'static str {
        "ytdlp"
    }

    async fn extract(
        &self,
        url: &str,
        kind: MediaKind,
        output_dir: &Path,
    ) -> Result<ProducedFile, ExtractionError> {
        let Some(ytdlp) = self.ytdlp_path.as_deref() else {
            return Err(ExtractionError::new(
                ExtractionErrorKind::ToolMissing,
                "yt-dlp not found. Please install yt-dlp",
            ));
        };

        let args = build_args(url, kind, output_dir);
        debug!("Running {} {:?}", ytdlp.display(), args);

        let output = self.run(ytdlp, args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp extraction failed: {}", stderr.trim());
            return Err(classify_failure(&stderr, output.status.code()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        resolve_output(&stdout, kind, output_dir).await
    }
}

/// Build the yt-dlp argument list for one extraction.
pub fn build_args(url: &str, kind: MediaKind, output_dir: &Path) -> Vec<OsString> {
    let template = output_dir.join("%(title)s.%(ext)s");
    let mut args: Vec<OsString> = Vec::new();

    match kind {
        MediaKind::Audio => {
            args.extend(
                [
                    "--format",
                    "bestaudio/best",
                    "--extract-audio",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    "192K",
                ]
                .map(OsString::from),
            );
        }
        MediaKind::Video => {
            args.extend(
                [
                    "--format",
                    "bestvideo+bestaudio/best",
                    "--merge-output-format",
                    "mp4",
                ]
                .map(OsString::from),
            );
        }
    }

    args.push("--output".into());
    args.push(template.into_os_string());
    args.extend(
        [
            "--ignore-config",
            "--quiet",
            "--no-warnings",
            "--no-progress",
            "--no-simulate",
            "--print",
            "after_move:filepath",
            "--",
        ]
        .map(OsString::from),
    );
    args.push(url.into());
    args
}

/// Turn a failed run's stderr into a structured error
pub fn classify_failure(stderr: &str, code: Option<i32>) -> ExtractionError {
    let message = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("ERROR:"))
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| stderr.trim().to_string());

    let message = if message.is_empty() {
        match code {
            Some(code) => format!("yt-dlp exited with status {}", code),
            None => "yt-dlp was terminated by a signal".to_string(),
        }
    } else {
        message
    };

    let lower = stderr.to_lowercase();
    let kind = if lower.contains("unsupported url") {
        ExtractionErrorKind::UnsupportedUrl
    } else if ["postprocessing", "ffmpeg", "ffprobe"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        ExtractionErrorKind::Postprocess
    } else if [
        "unable to download",
        "http error",
        "connection",
        "timed out",
        "name or service not known",
        "getaddrinfo",
        "network is unreachable",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
    {
        ExtractionErrorKind::Network
    } else {
        ExtractionErrorKind::Other
    };

    ExtractionError::new(kind, message)
}

/// Locate the finished file after a successful run.
///
/// yt-dlp prints the final path (`after_move:filepath`). Post-processing may
/// change the extension, so the printed stem is re-suffixed with the kind's
/// extension. If that file is missing, fall back to scanning `output_dir`.
pub async fn resolve_output(
    stdout: &str,
    kind: MediaKind,
    output_dir: &Path,
) -> Result<ProducedFile, ExtractionError> {
    let printed = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(|line| PathBuf::from(line).with_extension(kind.extension()));

    if let Some(candidate) = printed {
        if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
            if metadata.is_file() {
                return Ok(ProducedFile {
                    path: candidate,
                    size: metadata.len(),
                });
            }
        }
        debug!(
            "Printed path {} not found, scanning directory",
            candidate.display()
        );
    }

    let mut matches = Vec::new();
    let mut entries = tokio::fs::read_dir(output_dir).await.map_err(|e| {
        ExtractionError::new(
            ExtractionErrorKind::OutputMissing,
            format!("cannot read output directory: {}", e),
        )
    })?;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let ext_matches = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(kind.extension()))
            .unwrap_or(false);
        if !ext_matches {
            continue;
        }
        if let Ok(metadata) = entry.metadata().await {
            if metadata.is_file() {
                matches.push(ProducedFile {
                    path,
                    size: metadata.len(),
                });
            }
        }
    }

    if matches.len() == 1 {
        Ok(matches.remove(0))
    } else {
        Err(ExtractionError::new(
            ExtractionErrorKind::OutputMissing,
            format!(
                "expected one .{} file in output directory, found {}",
                kind.extension(),
                matches.len()
            ),
        ))
    }
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. Explicit override
/// 2. System PATH
/// 3. Common installation paths
pub fn find_ytdlp(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() && is_executable(path) {
            return Some(path.to_path_buf());
        }
        warn!(
            "Configured yt-dlp path is not an executable file: {}",
            path.display()
        );
    }

    if let Some(system) = find_in_path() {
        debug!("Using system yt-dlp: {:?}", system);
        return Some(system);
    }

    if let Some(common) = find_in_common_paths() {
        debug!("Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    None
}

fn find_in_path() -> Option<PathBuf> {
    which::which("yt-dlp").ok().filter(|path| path.exists())
}

fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
        "/opt/homebrew/bin/yt-dlp",
        "~/.local/bin/yt-dlp",
    ];

    common_paths
        .into_iter()
        .filter_map(expand_home)
        .find(|path| path.is_file() && is_executable(path))
}

/// Expand a leading `~/` to the user's home directory
fn expand_home(path_str: &str) -> Option<PathBuf> {
    match path_str.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path_str)),
    }
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn arg_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_audio_args() {
        let url = "https://example.com/watch?v=abc";
        let args = arg_strings(&build_args(url, MediaKind::Audio, Path::new("/work")));
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.contains(&"--extract-audio".to_string()));
        assert!(args.contains(&"--ignore-config".to_string()));
        assert!(args
            .windows(2)
            .any(|w| w == ["--output", "/work/%(title)s.%(ext)s"]));
        assert_eq!(args.last().map(String::as_str), Some(url));
        assert_eq!(args[args.len() - 2], "--");
    }

    #[test]
    fn test_video_args() {
        let url = "https://example.com/v";
        let args = arg_strings(&build_args(url, MediaKind::Video, Path::new("/work")));
        assert!(args.contains(&"--ignore-config".to_string()));
        assert!(args.windows(2).any(|w| w == ["--merge-output-format", "mp4"]));
        assert!(args.windows(2).any(|w| w == ["--format", "bestvideo+bestaudio/best"]));
        assert!(!args.contains(&"--extract-audio".to_string()));
    }

    #[test]
    fn test_classify_unsupported() {
        let err = classify_failure(
            "WARNING: something\nERROR: Unsupported URL: https://example.com/nothing\n",
            Some(1),
        );
        assert_eq!(err.kind, ExtractionErrorKind::UnsupportedUrl);
        assert_eq!(err.message, "Unsupported URL: https://example.com/nothing");
    }

    #[test]
    fn test_classify_network_and_postprocess() {
        let err = classify_failure(
            "ERROR: [youtube] abc: Unable to download webpage: Name or service not known",
            Some(1),
        );
        assert_eq!(err.kind, ExtractionErrorKind::Network);

        let err = classify_failure(
            "ERROR: Postprocessing: ffprobe and ffmpeg not found",
            Some(1),
        );
        assert_eq!(err.kind, ExtractionErrorKind::Postprocess);
    }

    #[test]
    fn test_classify_empty_stderr() {
        let err = classify_failure("", Some(2));
        assert_eq!(err.kind, ExtractionErrorKind::Other);
        assert_eq!(err.message, "yt-dlp exited with status 2");
    }

    #[tokio::test]
    async fn test_resolve_printed_path_with_new_extension() {
        let dir = TempDir::new().unwrap();
        let final_path = dir.path().join("My Song.mp3");
        std::fs::write(&final_path, b"id3").unwrap();

        let printed = format!("{}\n", dir.path().join("My Song.webm").display());
        let produced = resolve_output(&printed, MediaKind::Audio, dir.path())
            .await
            .unwrap();
        assert_eq!(produced.path, final_path);
        assert_eq!(produced.size, 3);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_scan() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"mp4data").unwrap();
        std::fs::write(dir.path().join("clip.part"), b"x").unwrap();

        let produced = resolve_output("", MediaKind::Video, dir.path())
            .await
            .unwrap();
        assert_eq!(produced.file_name(), "clip.mp4");
        assert_eq!(produced.size, 7);
    }

    #[tokio::test]
    async fn test_resolve_nothing_produced() {
        let dir = TempDir::new().unwrap();
        let err = resolve_output("", MediaKind::Audio, dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::OutputMissing);
    }

    #[tokio::test]
    async fn test_missing_tool_reports_failure() {
        let extractor = YtDlpExtractor {
            ytdlp_path: None,
            timeout: None,
        };
        let dir = TempDir::new().unwrap();
        let err = extractor
            .extract("https://example.com", MediaKind::Audio, dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::ToolMissing);
    }

    #[test]
    fn test_expand_home_uses_home_dir() {
        assert_eq!(
            expand_home("~/.local/bin/yt-dlp"),
            dirs::home_dir().map(|home| home.join(".local/bin/yt-dlp"))
        );
        assert_eq!(
            expand_home("/usr/bin/yt-dlp"),
            Some(PathBuf::from("/usr/bin/yt-dlp"))
        );
    }

    #[test]
    fn test_is_executable() {
        let path = PathBuf::from("/bin/sh");
        if path.exists() {
            assert!(is_executable(&path));
        }
    }
}
