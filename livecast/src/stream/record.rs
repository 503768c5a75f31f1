use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::origin::OriginServer;
use crate::probe::ProbeInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    Hls,
    Dash,
}

impl StreamFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            StreamFormat::Hls => "application/x-mpegURL",
            StreamFormat::Dash => "application/dash+xml",
        }
    }

    pub fn manifest_name(&self) -> &'static str {
        match self {
            StreamFormat::Hls => "playlist.m3u8",
            StreamFormat::Dash => "manifest.mpd",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StreamFormat::Hls => "HLS",
            StreamFormat::Dash => "DASH",
        }
    }
}

impl From<StreamFormat> for api::response::Format {
    fn from(f: StreamFormat) -> Self {
        match f {
            StreamFormat::Hls => api::response::Format::Hls,
            StreamFormat::Dash => api::response::Format::Dash,
        }
    }
}

/// Lifecycle states, strictly forward-moving. `Failed` and `Cleaned` are
/// terminal; a terminal record leaves the registry and its id is never
/// reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Created,
    Validating,
    Transcoding,
    Serving,
    Active,
    Failed,
    Cleaned,
}

impl StreamState {
    fn rank(&self) -> u8 {
        match self {
            StreamState::Created => 0,
            StreamState::Validating => 1,
            StreamState::Transcoding => 2,
            StreamState::Serving => 3,
            StreamState::Active => 4,
            StreamState::Failed => 5,
            StreamState::Cleaned => 6,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Failed | StreamState::Cleaned)
    }

    pub fn can_become(&self, next: StreamState) -> bool {
        match next {
            StreamState::Cleaned => true,
            StreamState::Failed => !self.is_terminal(),
            _ => !self.is_terminal() && next.rank() > self.rank(),
        }
    }
}

impl From<StreamState> for api::response::StreamState {
    fn from(s: StreamState) -> Self {
        match s {
            StreamState::Created => api::response::StreamState::Created,
            StreamState::Validating => api::response::StreamState::Validating,
            StreamState::Transcoding => api::response::StreamState::Transcoding,
            StreamState::Serving => api::response::StreamState::Serving,
            StreamState::Active => api::response::StreamState::Active,
            StreamState::Failed => api::response::StreamState::Failed,
            StreamState::Cleaned => api::response::StreamState::Cleaned,
        }
    }
}

#[derive(Debug)]
pub struct StreamRecord {
    pub id: String,
    pub source_url: String,
    pub device_name: Option<String>,
    pub format: Option<StreamFormat>,
    pub output_dir: PathBuf,
    pub served_url: Option<String>,
    pub origin: Option<OriginServer>,
    pub state: StreamState,
    pub created_at: DateTime<Utc>,
    pub probe_info: Option<ProbeInfo>,
}

impl StreamRecord {
    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }
}

impl From<&StreamRecord> for api::response::Stream {
    fn from(r: &StreamRecord) -> Self {
        api::response::Stream {
            id: r.id.clone(),
            format: r.format.map(Into::into),
            served_url: r.served_url.clone(),
            device_name: r.device_name.clone(),
            state: r.state.into(),
            age_seconds: r.age_seconds(),
        }
    }
}
