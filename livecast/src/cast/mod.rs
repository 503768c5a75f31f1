use async_trait::async_trait;

pub mod caster;
pub mod catt;

/// A resolved, network-addressable playback target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    Playing,
    Buffering,
    Idle,
    #[default]
    Unknown,
}

impl PlayerState {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLAYING" => PlayerState::Playing,
            "BUFFERING" => PlayerState::Buffering,
            "IDLE" => PlayerState::Idle,
            _ => PlayerState::Unknown,
        }
    }

    /// Playing or buffering both count as playback evidence.
    pub fn is_active(&self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Buffering)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerStatus {
    pub player_state: PlayerState,
    pub active_app_id: Option<String>,
}

/// Seam over the device discovery/control collaborator. Production drives a
/// CLI controller; tests script this trait directly.
#[async_trait]
pub trait ControlClient: Send + Sync {
    /// Looks a device up by friendly name. `None` means unknown, not an error.
    async fn resolve(&self, name: &str) -> anyhow::Result<Option<DeviceTarget>>;

    /// Forces a re-discovery, refreshing whatever cache the client keeps.
    async fn refresh(&self) -> anyhow::Result<()>;

    async fn list_devices(&self) -> anyhow::Result<Vec<String>>;

    /// Number of currently known devices, without triggering discovery.
    async fn device_count(&self) -> usize;

    async fn send_play(
        &self,
        target: &DeviceTarget,
        url: &str,
        mime_type: &str,
    ) -> anyhow::Result<()>;

    async fn poll_state(&self, target: &DeviceTarget) -> anyhow::Result<PlayerStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_state_parsing() {
        assert_eq!(PlayerState::parse("PLAYING"), PlayerState::Playing);
        assert_eq!(PlayerState::parse("playing"), PlayerState::Playing);
        assert_eq!(PlayerState::parse(" BUFFERING "), PlayerState::Buffering);
        assert_eq!(PlayerState::parse("IDLE"), PlayerState::Idle);
        assert_eq!(PlayerState::parse("PAUSED"), PlayerState::Unknown);
    }

    #[test]
    fn active_means_playing_or_buffering() {
        assert!(PlayerState::Playing.is_active());
        assert!(PlayerState::Buffering.is_active());
        assert!(!PlayerState::Idle.is_active());
        assert!(!PlayerState::Unknown.is_active());
    }
}
