use std::time::Duration;

use tracing::info;

use crate::result::Result;
use crate::route::AppState;

/// Janitor loop: every tick, reclaim streams past the configured age. Sweep
/// failures never propagate; this task runs unattended.
pub async fn expire_check(state: AppState) {
    loop {
        let timeout = tokio::time::sleep(Duration::from_millis(state.config.janitor.tick_time.0));
        tokio::pin!(timeout);
        let _ = timeout.as_mut().await;
        let _ = do_expire_check(state.clone()).await;
    }
}

async fn do_expire_check(state: AppState) -> Result<()> {
    let max_age_secs = (state.config.janitor.max_age_hours * 3600) as i64;
    let removed = state.manager.sweep(max_age_secs).await;
    if removed > 0 {
        info!("janitor reclaimed {removed} expired stream(s)");
    }
    Ok(())
}
