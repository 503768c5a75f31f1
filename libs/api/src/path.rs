pub const HEALTH: &str = "/health";
pub const DEVICES: &str = "/api/devices";
pub const STREAMS: &str = "/api/streams";
pub const STREAMS_SWEEP: &str = "/api/streams/sweep";

pub fn cast(device: &str) -> String {
    format!("/api/cast/{}", device)
}

pub fn streams(stream: &str) -> String {
    format!("/api/streams/{}", stream)
}
