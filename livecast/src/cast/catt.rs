use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cast::{ControlClient, DeviceTarget, PlayerState, PlayerStatus};
use crate::config;

/// Control client backed by the `catt` CLI. Discovery results are cached by
/// friendly name; `refresh` re-scans the network.
pub struct CattClient {
    binary: PathBuf,
    cache: RwLock<HashMap<String, DeviceTarget>>,
}

impl CattClient {
    pub fn new(cfg: &config::Cast) -> Self {
        let binary = match &cfg.catt_binary {
            Some(path) => PathBuf::from(path),
            None => locate_binary(),
        };
        CattClient {
            binary,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "catt {} exited with {}: {}",
                args.first().unwrap_or(&""),
                output.status,
                stderr.trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn scan(&self) -> anyhow::Result<()> {
        let stdout = self.run(&["scan"]).await?;
        let devices: HashMap<String, DeviceTarget> = stdout
            .lines()
            .filter_map(parse_scan_line)
            .map(|t| (t.name.clone(), t))
            .collect();
        debug!("catt scan found {} device(s)", devices.len());
        *self.cache.write().await = devices;
        Ok(())
    }
}

/// `catt scan` lines look like `192.168.1.12 - Living Room - Google Nest Hub`.
fn parse_scan_line(line: &str) -> Option<DeviceTarget> {
    let parts: Vec<&str> = line.trim().split(" - ").collect();
    if parts.len() < 2 {
        return None;
    }
    let address = parts[0].trim();
    if address.parse::<std::net::IpAddr>().is_err() {
        return None;
    }
    // A friendly name may itself contain " - "; the model is the last field.
    let name = if parts.len() > 2 {
        parts[1..parts.len() - 1].join(" - ")
    } else {
        parts[1].to_string()
    };
    Some(DeviceTarget {
        name: name.trim().to_string(),
        address: address.to_string(),
    })
}

/// `catt info` prints `key: value` lines; the interesting keys are
/// `player_state` and `app_id`.
fn parse_info_output(stdout: &str) -> PlayerStatus {
    let mut status = PlayerStatus::default();
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "player_state" => status.player_state = PlayerState::parse(value),
            "app_id" => status.active_app_id = Some(value.trim().to_string()),
            _ => {}
        }
    }
    status
}

fn locate_binary() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        let local = PathBuf::from(home).join(".local/bin/catt");
        if local.is_file() {
            return local;
        }
    }
    PathBuf::from("catt")
}

#[async_trait]
impl ControlClient for CattClient {
    async fn resolve(&self, name: &str) -> anyhow::Result<Option<DeviceTarget>> {
        if self.cache.read().await.is_empty() {
            self.scan().await?;
        }
        Ok(self.cache.read().await.get(name).cloned())
    }

    async fn refresh(&self) -> anyhow::Result<()> {
        self.scan().await
    }

    async fn list_devices(&self) -> anyhow::Result<Vec<String>> {
        if self.cache.read().await.is_empty() {
            self.scan().await?;
        }
        let mut names: Vec<String> = self.cache.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn device_count(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn send_play(
        &self,
        target: &DeviceTarget,
        url: &str,
        mime_type: &str,
    ) -> anyhow::Result<()> {
        // catt negotiates the content type itself; the mime is logged so the
        // command trail shows what the manifest claims to be.
        debug!(device = %target.name, url, mime_type, "sending play command");
        self.run(&["-d", target.name.as_str(), "cast", url]).await?;
        Ok(())
    }

    async fn poll_state(&self, target: &DeviceTarget) -> anyhow::Result<PlayerStatus> {
        match self.run(&["-d", target.name.as_str(), "info"]).await {
            Ok(stdout) => Ok(parse_info_output(&stdout)),
            Err(e) => {
                // A freshly launched receiver may not answer `info` yet.
                warn!(device = %target.name, "status poll failed: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_line_parsing() {
        let t = parse_scan_line("192.168.1.12 - Living Room - Google Nest Hub").unwrap();
        assert_eq!(t.name, "Living Room");
        assert_eq!(t.address, "192.168.1.12");

        // Names containing the separator keep everything but the model.
        let t = parse_scan_line("10.0.0.7 - Den - Upstairs - Chromecast").unwrap();
        assert_eq!(t.name, "Den - Upstairs");

        assert!(parse_scan_line("Scanning Chromecasts...").is_none());
        assert!(parse_scan_line("").is_none());
    }

    #[test]
    fn info_output_parsing() {
        let status = parse_info_output(
            "title: Big Buck Bunny\nplayer_state: PLAYING\napp_id: CC1AD845\nvolume_level: 1.0\n",
        );
        assert_eq!(status.player_state, PlayerState::Playing);
        assert_eq!(status.active_app_id.as_deref(), Some("CC1AD845"));

        let status = parse_info_output("app_id: E8C28D3C\n");
        assert_eq!(status.player_state, PlayerState::Unknown);
        assert_eq!(status.active_app_id.as_deref(), Some("E8C28D3C"));
    }
}
