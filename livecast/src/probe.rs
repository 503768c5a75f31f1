use std::process::Stdio;
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::config;

/// Advisory media metadata from the first stream the probe reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<String>,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
}

/// Bounded-time reachability and metadata probe. Any failure here is an
/// expected outcome (bad or unreachable source), not a fault.
pub async fn validate(cfg: &config::Transcode, url: &str) -> anyhow::Result<ProbeInfo> {
    let socket_timeout_us = (cfg.probe_timeout * 1_000_000).to_string();

    let mut cmd = Command::new(&cfg.ffprobe);
    cmd.arg("-v").arg("error");
    match url::Url::parse(url).map(|u| u.scheme().to_string()) {
        Ok(scheme) if scheme == "rtsp" => {
            cmd.arg("-timeout").arg(&socket_timeout_us);
        }
        Ok(scheme) if scheme != "file" => {
            cmd.arg("-rw_timeout").arg(&socket_timeout_us);
        }
        _ => {}
    }
    cmd.arg("-show_entries")
        .arg("stream=codec_type,codec_name,width,height,avg_frame_rate")
        .arg("-of")
        .arg("json")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(Duration::from_secs(cfg.probe_timeout), cmd.output())
        .await
        .map_err(|_| anyhow!("probe timed out after {}s", cfg.probe_timeout))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("probe failed: {}", stderr.trim()));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    let stream = parsed
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| anyhow!("no video stream found in source"))?;

    let info = ProbeInfo {
        codec: stream.codec_name,
        width: stream.width,
        height: stream.height,
        frame_rate: stream.avg_frame_rate,
    };
    debug!(?info, url, "source probe ok");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_ffprobe(dir: &std::path::Path, body: &str) -> String {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffprobe");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh\n{}", body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn cfg_with(ffprobe: String) -> config::Transcode {
        config::Transcode {
            ffprobe,
            probe_timeout: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn picks_the_video_stream() {
        let dir = tempfile::tempdir().unwrap();
        // Audio listed first; the video stream is still the one reported.
        let ffprobe = fake_ffprobe(
            dir.path(),
            r#"echo '{"streams":[{"codec_type":"audio","codec_name":"aac","avg_frame_rate":"0/0"},{"codec_type":"video","codec_name":"h264","width":1280,"height":720,"avg_frame_rate":"30/1"}]}'"#,
        );

        let info = validate(&cfg_with(ffprobe), "rtsp://cam/1").await.unwrap();
        assert_eq!(info.codec.as_deref(), Some("h264"));
        assert_eq!(info.width, Some(1280));
        assert_eq!(info.height, Some(720));
    }

    #[tokio::test]
    async fn empty_stream_list_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = fake_ffprobe(dir.path(), r#"echo '{"streams":[]}'"#);

        let err = validate(&cfg_with(ffprobe), "rtsp://cam/1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no video stream"));
    }

    #[tokio::test]
    async fn audio_only_source_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = fake_ffprobe(
            dir.path(),
            r#"echo '{"streams":[{"codec_type":"audio","codec_name":"aac","avg_frame_rate":"0/0"}]}'"#,
        );

        let err = validate(&cfg_with(ffprobe), "rtsp://radio/1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no video stream"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = fake_ffprobe(dir.path(), "echo 'Connection refused' >&2\nexit 1");

        let err = validate(&cfg_with(ffprobe), "rtsp://down/1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Connection refused"));
    }

    #[tokio::test]
    async fn hanging_probe_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = fake_ffprobe(dir.path(), "sleep 60");

        let err = validate(&cfg_with(ffprobe), "rtsp://slow/1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
