use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::stream::record::{StreamRecord, StreamState};

/// The authoritative table of in-flight streams. The map lock protects
/// insert/remove and field access; the per-id mutex serializes all mutating
/// operations on one record so different ids never contend.
#[derive(Clone)]
pub struct Manager {
    streams: Arc<RwLock<HashMap<String, StreamRecord>>>,
    guards: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    root: PathBuf,
}

impl Manager {
    pub fn new(root: PathBuf) -> Self {
        Manager {
            streams: Default::default(),
            guards: Default::default(),
            root,
        }
    }

    /// Registers a new record in `Created` and claims its output directory.
    /// Ids are UUIDv4 and never reused.
    pub async fn create(
        &self,
        source_url: &str,
        device_name: Option<&str>,
    ) -> anyhow::Result<(String, PathBuf)> {
        let id = Uuid::new_v4().to_string();
        let output_dir = self.root.join(&id);
        tokio::fs::create_dir_all(&output_dir).await?;

        let record = StreamRecord {
            id: id.clone(),
            source_url: source_url.to_string(),
            device_name: device_name.map(|d| d.to_string()),
            format: None,
            output_dir: output_dir.clone(),
            served_url: None,
            origin: None,
            state: StreamState::Created,
            created_at: Utc::now(),
            probe_info: None,
        };

        self.guards
            .lock()
            .unwrap()
            .insert(id.clone(), Arc::new(Mutex::new(())));
        self.streams.write().await.insert(id.clone(), record);
        debug!("[{id}] stream registered");
        Ok((id, output_dir))
    }

    pub async fn get(&self, id: &str) -> Option<api::response::Stream> {
        self.streams.read().await.get(id).map(Into::into)
    }

    pub async fn list(&self) -> Vec<api::response::Stream> {
        self.streams.read().await.values().map(Into::into).collect()
    }

    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Moves a record forward through its state machine, applying `mutate`
    /// under the same exclusion as the state change.
    pub async fn transition<F>(&self, id: &str, next: StreamState, mutate: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut StreamRecord),
    {
        let guard = self
            .guard_for(id)
            .ok_or_else(|| anyhow!("stream {id} not found"))?;
        let _serialized = guard.lock().await;

        let mut streams = self.streams.write().await;
        let record = streams
            .get_mut(id)
            .ok_or_else(|| anyhow!("stream {id} not found"))?;
        if !record.state.can_become(next) {
            return Err(anyhow!(
                "stream {id}: illegal transition {:?} -> {next:?}",
                record.state
            ));
        }
        record.state = next;
        mutate(record);
        debug!("[{id}] -> {next:?}");
        Ok(())
    }

    /// Tears a stream down: stop the origin server, delete the output
    /// directory, drop the table entry. All three are attempted even when an
    /// earlier step fails; teardown failures are logged, never escalated.
    /// Removing an unknown id is a no-op, so cleanup is idempotent.
    pub async fn remove(&self, id: &str) -> bool {
        let Some(guard) = self.guard_for(id) else {
            return false;
        };
        let _serialized = guard.lock().await;

        let Some(mut record) = self.streams.write().await.remove(id) else {
            return false;
        };
        record.state = StreamState::Cleaned;

        if let Some(origin) = record.origin.take() {
            origin.stop().await;
        }
        if let Err(e) = tokio::fs::remove_dir_all(&record.output_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "[{id}] cleanup: failed to remove {}: {e}",
                    record.output_dir.display()
                );
            }
        }
        self.guards.lock().unwrap().remove(id);
        info!("[{id}] stream cleaned up");
        true
    }

    /// Removes every record older than `max_age_secs`. Ids are snapshotted
    /// first and each is re-checked before removal, so the registry may
    /// change underneath the sweep.
    pub async fn sweep(&self, max_age_secs: i64) -> usize {
        let candidates: Vec<String> = {
            let streams = self.streams.read().await;
            streams
                .values()
                .filter(|r| r.age_seconds() > max_age_secs)
                .map(|r| r.id.clone())
                .collect()
        };

        let mut removed = 0;
        for id in candidates {
            let still_expired = {
                let streams = self.streams.read().await;
                streams
                    .get(&id)
                    .map(|r| r.age_seconds() > max_age_secs)
                    .unwrap_or(false)
            };
            if still_expired && self.remove(&id).await {
                removed += 1;
            }
        }
        removed
    }

    fn guard_for(&self, id: &str) -> Option<Arc<Mutex<()>>> {
        self.guards.lock().unwrap().get(id).cloned()
    }

    #[cfg(test)]
    pub async fn backdate(&self, id: &str, seconds: i64) {
        if let Some(record) = self.streams.write().await.get_mut(id) {
            record.created_at = Utc::now() - chrono::Duration::seconds(seconds);
        }
    }
}
