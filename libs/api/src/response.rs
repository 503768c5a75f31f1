use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    pub state: StreamState,
    pub age_seconds: i64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    #[serde(rename = "HLS")]
    Hls,
    #[serde(rename = "DASH")]
    Dash,
}

/// Registry lifecycle state as reported over the wire. Terminal states never
/// appear in listings; they are included so clients can parse event payloads.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Created,
    Validating,
    Transcoding,
    Serving,
    Active,
    Failed,
    Cleaned,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CastResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeviceList {
    pub devices: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Health {
    pub status: String,
    pub devices: usize,
    pub streams: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SweepResult {
    pub removed: usize,
}
