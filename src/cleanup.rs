use std::{env, time::Duration};

use tokio::time;
use tracing::{debug, info};

use crate::session::Sessions;

fn env_secs(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Periodically drop sessions nobody is playing anymore. Finished games get
/// a shorter grace period than games someone may still come back to.
pub async fn start_cleanup_task(sessions: Sessions) {
    let interval_secs = env_secs("CLEANUP_INTERVAL_SECONDS", 60);
    let idle_timeout_secs = env_secs("IDLE_SESSION_TIMEOUT_SECONDS", 3600);
    let finished_timeout_secs = env_secs("FINISHED_SESSION_TIMEOUT_SECONDS", 600);

    let mut interval = time::interval(Duration::from_secs(interval_secs));

    info!(
        "session cleanup running every {}s (idle timeout {}s, finished timeout {}s)",
        interval_secs, idle_timeout_secs, finished_timeout_secs
    );

    loop {
        interval.tick().await;
        cleanup_sessions(&sessions, idle_timeout_secs, finished_timeout_secs);
    }
}

fn cleanup_sessions(sessions: &Sessions, idle_timeout_secs: u64, finished_timeout_secs: u64) {
    let mut stale = Vec::new();

    // First pass: collect ids, skipping sessions currently locked by a player.
    for entry in sessions.iter() {
        if let Ok(session) = entry.value().try_lock()
            && session.should_evict(idle_timeout_secs, finished_timeout_secs)
        {
            stale.push(entry.key().clone());
        }
    }

    // Second pass: remove them.
    for id in &stale {
        sessions.remove(id);
        debug!("evicted session {}", id);
    }

    if !stale.is_empty() {
        info!("evicted {} stale sessions", stale.len());
    }
}
