use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::anyhow;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config;
use crate::stream::record::StreamFormat;

#[derive(Debug)]
pub struct TranscodeOutcome {
    pub format: StreamFormat,
    pub manifest: PathBuf,
}

/// HLS first, DASH as fallback into the same directory. The manifest file on
/// disk is the success signal; an exit status of 0 without it is a failure.
pub async fn run(
    cfg: &config::Transcode,
    source_url: &str,
    output_dir: &Path,
) -> anyhow::Result<TranscodeOutcome> {
    let hls_err = match attempt(cfg, source_url, output_dir, StreamFormat::Hls).await {
        Ok(manifest) => {
            return Ok(TranscodeOutcome {
                format: StreamFormat::Hls,
                manifest,
            })
        }
        Err(e) => e,
    };
    warn!("HLS transcode failed, falling back to DASH: {hls_err}");

    match attempt(cfg, source_url, output_dir, StreamFormat::Dash).await {
        Ok(manifest) => Ok(TranscodeOutcome {
            format: StreamFormat::Dash,
            manifest,
        }),
        Err(dash_err) => Err(anyhow!(
            "HLS attempt: {hls_err}; DASH attempt: {dash_err}"
        )),
    }
}

async fn attempt(
    cfg: &config::Transcode,
    source_url: &str,
    output_dir: &Path,
    format: StreamFormat,
) -> anyhow::Result<PathBuf> {
    let manifest = output_dir.join(format.manifest_name());

    let mut cmd = Command::new(&cfg.ffmpeg);
    if source_url.starts_with("rtsp://") {
        cmd.arg("-rtsp_transport").arg("tcp");
    }
    cmd.arg("-i").arg(source_url);
    cmd.args(["-vcodec", "libx264", "-preset", "fast", "-crf", "23"]);
    cmd.args(["-g", "60", "-acodec", "aac"]);
    match format {
        StreamFormat::Hls => {
            cmd.args(["-f", "hls"]);
            cmd.args(["-hls_time", "2", "-hls_list_size", "3"]);
            cmd.args(["-hls_flags", "delete_segments+append_list"]);
            cmd.args(["-hls_segment_type", "mpegts"]);
            cmd.arg("-hls_segment_filename")
                .arg(output_dir.join("segment_%03d.ts"));
        }
        StreamFormat::Dash => {
            cmd.args(["-f", "dash"]);
            cmd.args(["-window_size", "3", "-extra_window_size", "1"]);
            cmd.args(["-seg_duration", "3", "-frag_duration", "1"]);
            cmd.args(["-target_latency", "5", "-streaming", "1"]);
            // ffmpeg must never delete output behind the registry's back.
            cmd.args(["-remove_at_exit", "0"]);
        }
    }
    cmd.arg(&manifest).arg("-y");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(?format, source_url, "starting transcode attempt");
    let output = tokio::time::timeout(Duration::from_secs(cfg.timeout), cmd.output())
        .await
        .map_err(|_| anyhow!("{format:?} transcode timed out after {}s", cfg.timeout))??;

    if !output.status.success() {
        return Err(anyhow!(
            "{format:?} transcode exited with {}: {}",
            output.status,
            stderr_tail(&output.stderr)
        ));
    }
    if !manifest.exists() {
        return Err(anyhow!(
            "{format:?} transcode produced no manifest at {}: {}",
            manifest.display(),
            stderr_tail(&output.stderr)
        ));
    }
    Ok(manifest)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().nth_back(799) {
        Some((idx, _)) => text[idx..].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_ffmpeg(dir: &std::path::Path, body: &str) -> String {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh\n{}", body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    // Touches whichever manifest file the invocation names.
    const TOUCH_MANIFEST: &str = r#"
for a in "$@"; do
  case "$a" in
    *.m3u8|*.mpd) : > "$a" ;;
  esac
done
exit 0"#;

    const HLS_FAILS_DASH_OK: &str = r#"
for a in "$@"; do
  case "$a" in
    *.m3u8) echo 'hls encoder exploded' >&2; exit 1 ;;
    *.mpd) : > "$a" ;;
  esac
done
exit 0"#;

    fn cfg_with(ffmpeg: String) -> config::Transcode {
        config::Transcode {
            ffmpeg,
            timeout: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn hls_preferred_when_it_succeeds() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(bin.path(), TOUCH_MANIFEST);

        let outcome = run(&cfg_with(ffmpeg), "rtsp://cam/1", out.path())
            .await
            .unwrap();
        assert_eq!(outcome.format, StreamFormat::Hls);
        assert!(outcome.manifest.ends_with("playlist.m3u8"));
        assert!(outcome.manifest.exists());
    }

    #[tokio::test]
    async fn falls_back_to_dash() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(bin.path(), HLS_FAILS_DASH_OK);

        let outcome = run(&cfg_with(ffmpeg), "rtsp://cam/1", out.path())
            .await
            .unwrap();
        assert_eq!(outcome.format, StreamFormat::Dash);
        assert!(outcome.manifest.ends_with("manifest.mpd"));
    }

    #[tokio::test]
    async fn both_failures_are_reported_together() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(bin.path(), "echo 'codec not found' >&2\nexit 1");

        let err = run(&cfg_with(ffmpeg), "rtsp://cam/1", out.path())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("HLS attempt"));
        assert!(err.contains("DASH attempt"));
        assert!(err.contains("codec not found"));
    }

    #[tokio::test]
    async fn clean_exit_without_manifest_is_failure() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(bin.path(), "exit 0");

        let err = run(&cfg_with(ffmpeg), "rtsp://cam/1", out.path())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("no manifest"));
    }
}
