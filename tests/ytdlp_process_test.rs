//! Runs the yt-dlp extractor against stand-in shell scripts instead of the
//! real tool, so the process handling is covered without network access.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tubegate::extractor::{Extractor, MediaKind, YtDlpExtractor};
use tubegate::utils::ExtractionErrorKind;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// One test function on purpose: the scripts are spawned one after another so
// no concurrent fork can hold a script open for writing while it is executed.
#[tokio::test]
async fn script_backed_extractions() {
    let bin = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    // Success: writes the converted file and prints the pre-conversion name.
    let ok = write_script(
        bin.path(),
        "ok-ytdlp",
        &format!(
            "printf 'abcdef' > '{dir}/Track.mp3'\necho '{dir}/Track.webm'",
            dir = out.path().display()
        ),
    );
    let extractor = YtDlpExtractor::new(Some(ok.clone()), None);
    assert_eq!(extractor.ytdlp_path(), Some(ok.as_path()));
    let produced = extractor
        .extract("https://example.com/watch?v=abc", MediaKind::Audio, out.path())
        .await
        .unwrap();
    assert_eq!(produced.path, out.path().join("Track.mp3"));
    assert_eq!(produced.size, 6);

    // Failure: stderr is classified and the ERROR line becomes the message.
    let fail = write_script(
        bin.path(),
        "fail-ytdlp",
        "echo 'ERROR: Unsupported URL: https://example.com/nothing' >&2\nexit 1",
    );
    let extractor = YtDlpExtractor::new(Some(fail), None);
    let err = extractor
        .extract("https://example.com/nothing", MediaKind::Video, out.path())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ExtractionErrorKind::UnsupportedUrl);
    assert_eq!(err.message, "Unsupported URL: https://example.com/nothing");

    // Hang: the optional timeout kills the child.
    let hang = write_script(bin.path(), "hang-ytdlp", "sleep 10");
    let extractor = YtDlpExtractor::new(Some(hang), Some(Duration::from_millis(200)));
    let err = extractor
        .extract("https://example.com/slow", MediaKind::Audio, out.path())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ExtractionErrorKind::Timeout);

    // The url is passed after `--` as the final argument.
    let echo = write_script(
        bin.path(),
        "args-ytdlp",
        &format!(
            "for last; do :; done\nprintf '%s' \"$last\" > '{dir}/args.mp4'",
            dir = out.path().display()
        ),
    );
    std::fs::remove_file(out.path().join("Track.mp3")).unwrap();
    let extractor = YtDlpExtractor::new(Some(echo), None);
    let produced = extractor
        .extract("-not-an-option", MediaKind::Video, out.path())
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&produced.path).unwrap(), "-not-an-option");
}
