use serde::{Deserialize, Serialize};
use std::{env, fs, net::SocketAddr, path::PathBuf, str::FromStr};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub cast: Cast,
    #[serde(default)]
    pub transcode: Transcode,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub janitor: Janitor,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Auth {
    /// Legacy single webhook secret, merged into `tokens`.
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub tokens: Vec<String>,
}

impl Auth {
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = self.tokens.clone();
        if !self.secret.is_empty() {
            tokens.push(self.secret.clone());
        }
        tokens
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cast {
    /// Seconds to wait for the device to report playback before giving up.
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout: u64,
    /// Milliseconds between device state polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// App id of the idle/backdrop receiver; any other active app counts as
    /// playback evidence.
    #[serde(default = "default_idle_app_id")]
    pub idle_app_id: String,
    #[serde(default)]
    pub catt_binary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcode {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
    /// Seconds before a transcode attempt is killed.
    #[serde(default = "default_transcode_timeout")]
    pub timeout: u64,
    /// Seconds before a source probe is killed.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Janitor {
    #[serde(default)]
    pub tick_time: JanitorTickTime,
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JanitorTickTime(pub u64);

impl Default for JanitorTickTime {
    fn default() -> Self {
        JanitorTickTime(60 * 1000)
    }
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("8787"))
    ))
    .expect("invalid listen address")
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Cast {
    fn default() -> Self {
        Self {
            confirm_timeout: default_confirm_timeout(),
            poll_interval: default_poll_interval(),
            idle_app_id: default_idle_app_id(),
            catt_binary: None,
        }
    }
}

impl Default for Transcode {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            timeout: default_transcode_timeout(),
            probe_timeout: default_probe_timeout(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_confirm_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_idle_app_id() -> String {
    // Chromecast backdrop receiver.
    "E8C28D3C".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_transcode_timeout() -> u64 {
    60
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_storage_root() -> PathBuf {
    env::temp_dir().join("livecast")
}

fn default_max_age_hours() -> u64 {
    1
}

impl Config {
    pub fn parse(path: Option<String>) -> Self {
        let result = fs::read_to_string(path.unwrap_or(String::from("livecast.toml")))
            .or(fs::read_to_string("/etc/livecast/livecast.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str()).expect("config parse error");
        match cfg.validate() {
            Ok(_) => cfg,
            Err(err) => panic!("config validate [{}]", err),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.cast.poll_interval == 0 {
            return Err(anyhow::anyhow!("cast.poll_interval must be non-zero"));
        }
        if self.cast.confirm_timeout == 0 {
            return Err(anyhow::anyhow!("cast.confirm_timeout must be non-zero"));
        }
        if self.janitor.tick_time.0 == 0 {
            return Err(anyhow::anyhow!("janitor.tick_time must be non-zero"));
        }
        Ok(())
    }
}
