use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cast::{ControlClient, DeviceTarget};
use crate::config::Config;
use crate::error::AppError;
use crate::origin::OriginServer;
use crate::result::Result;
use crate::stream::manager::Manager;
use crate::stream::record::StreamState;
use crate::{probe, transcode};

/// Drives one cast end to end: resolve, validate, transcode, serve, command
/// the device, confirm playback. Any failure after the record exists unwinds
/// everything that was created before returning.
pub struct Caster {
    config: Config,
    manager: Manager,
    control: Arc<dyn ControlClient>,
}

impl Caster {
    pub fn new(config: Config, manager: Manager, control: Arc<dyn ControlClient>) -> Self {
        Caster {
            config,
            manager,
            control,
        }
    }

    pub async fn cast_to(
        &self,
        device_name: &str,
        source_url: &str,
    ) -> Result<api::response::CastResult> {
        let target = self.resolve_device(device_name).await?;

        let (id, output_dir) = self
            .manager
            .create(source_url, Some(device_name))
            .await
            .map_err(AppError::from)?;

        self.manager
            .transition(&id, StreamState::Validating, |_| {})
            .await?;
        let probe_info = match probe::validate(&self.config.transcode, source_url).await {
            Ok(info) => info,
            Err(e) => {
                warn!("[{id}] source validation failed: {e:#}");
                self.unwind(&id).await;
                return Err(AppError::validation_failure(
                    "Invalid or unreachable RTSP stream",
                ));
            }
        };

        self.manager
            .transition(&id, StreamState::Transcoding, |r| {
                r.probe_info = Some(probe_info);
            })
            .await?;
        let outcome = match transcode::run(&self.config.transcode, source_url, &output_dir).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("[{id}] transcode failed: {e:#}");
                self.unwind(&id).await;
                return Err(AppError::transcode_failure(format!(
                    "Transcoding failed: {e}"
                )));
            }
        };

        let origin = match OriginServer::start(&output_dir).await {
            Ok(origin) => origin,
            Err(e) => {
                warn!("[{id}] origin server failed to start: {e:#}");
                self.unwind(&id).await;
                return Err(AppError::origin_server_failure(format!(
                    "Origin server failed: {e}"
                )));
            }
        };
        // The manifest the transcoder actually produced names the served URL.
        let manifest_name = outcome
            .manifest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| outcome.format.manifest_name().to_string());
        let served_url = format!("{}/{}", origin.base_url(), manifest_name);
        let format = outcome.format;
        let record_url = served_url.clone();
        if let Err(e) = self
            .manager
            .transition(&id, StreamState::Serving, move |r| {
                r.format = Some(format);
                r.served_url = Some(record_url);
                r.origin = Some(origin);
            })
            .await
        {
            self.unwind(&id).await;
            return Err(AppError::from(e));
        }

        info!("[{id}] serving {} at {served_url}", format.label());
        if let Err(e) = self
            .control
            .send_play(&target, &served_url, format.mime_type())
            .await
        {
            warn!("[{id}] play command failed: {e:#}");
            self.unwind(&id).await;
            return Err(AppError::confirmation_timeout(format!(
                "Stream failed to start on {device_name}"
            )));
        }

        if !self.await_confirmation(&id, &target).await {
            self.unwind(&id).await;
            return Err(AppError::confirmation_timeout(format!(
                "Stream failed to start on {device_name}"
            )));
        }

        self.manager
            .transition(&id, StreamState::Active, |_| {})
            .await?;
        info!("[{id}] playback confirmed on {device_name}");
        Ok(api::response::CastResult {
            success: true,
            message: format!("Streaming confirmed on {device_name} ({})", format.label()),
            stream_id: Some(id),
        })
    }

    /// Marks the record failed, then reclaims its resources. The record is
    /// gone from the registry once this returns.
    async fn unwind(&self, id: &str) {
        if let Err(e) = self
            .manager
            .transition(id, StreamState::Failed, |_| {})
            .await
        {
            debug!("[{id}] could not mark failed: {e}");
        }
        self.manager.remove(id).await;
    }

    /// One re-discovery retry before giving up, so a device that joined the
    /// network after the last scan still resolves.
    async fn resolve_device(&self, device_name: &str) -> Result<DeviceTarget> {
        if let Some(target) = self.control.resolve(device_name).await? {
            return Ok(target);
        }
        debug!("device {device_name} not in cache, forcing re-discovery");
        if let Err(e) = self.control.refresh().await {
            warn!("device re-discovery failed: {e:#}");
        }
        match self.control.resolve(device_name).await? {
            Some(target) => Ok(target),
            None => Err(AppError::device_not_found(format!(
                "Device not found: {device_name}"
            ))),
        }
    }

    /// Polls the device until it reports playback or the timeout elapses.
    /// An active app other than the idle/backdrop receiver also counts as
    /// confirmation; that heuristic is approximate and can false-positive if
    /// some other app launches during the window.
    async fn await_confirmation(&self, id: &str, target: &DeviceTarget) -> bool {
        let deadline = Instant::now() + Duration::from_secs(self.config.cast.confirm_timeout);
        let interval = Duration::from_millis(self.config.cast.poll_interval);

        loop {
            match self.control.poll_state(target).await {
                Ok(status) => {
                    if status.player_state.is_active() {
                        debug!("[{id}] confirmed via player state {:?}", status.player_state);
                        return true;
                    }
                    if let Some(app_id) = &status.active_app_id {
                        if *app_id != self.config.cast.idle_app_id {
                            debug!("[{id}] confirmed via active app {app_id}");
                            return true;
                        }
                    }
                }
                Err(e) => debug!("[{id}] state poll failed: {e}"),
            }
            if Instant::now() + interval > deadline {
                warn!("[{id}] no playback confirmation within {}s", self.config.cast.confirm_timeout);
                return false;
            }
            tokio::time::sleep(interval).await;
        }
    }
}
