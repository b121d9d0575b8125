//! BatchPoller (C8): the background sweep that resumes jobs left in
//! `scheduled`/`paused`/crashed-`in_progress` state — after a process
//! restart, or a `Resume` call that arrived while no worker was listening.
//!
//! Grounded on `orbit-web::reactor::Reactor::run`'s wake pattern (a
//! `tokio::sync::Notify` raced against a sleep), but processes jobs one at a
//! time instead of fanning each one out into its own task — SPEC_FULL.md §5
//! bounds total engine concurrency at one job, with parallelism confined to
//! the per-job PDF pre-pass.

use crate::engine;
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Wakes the poller immediately instead of waiting for the next tick — used
/// by `job_manager::resume` so a resumed job doesn't sit idle for up to
/// `poll_interval_seconds`.
#[derive(Clone)]
pub struct PollerHandle {
    notify: Arc<Notify>,
}

impl PollerHandle {
    pub fn wake(&self) {
        self.notify.notify_one();
    }
}

/// Spawns the poller loop and returns a handle to wake it on demand. Runs
/// until the process exits; there is no graceful-shutdown signal because the
/// orchestrator has none either (SPEC_FULL.md's ambient-stack scope ends at
/// the HTTP server itself).
pub fn spawn(state: AppState) -> PollerHandle {
    let notify = Arc::new(Notify::new());
    let handle = PollerHandle { notify: notify.clone() };

    tokio::spawn(async move {
        run(state, notify).await;
    });

    handle
}

async fn run(state: AppState, notify: Arc<Notify>) {
    let interval = Duration::from_secs(state.config.poll_interval_seconds);
    loop {
        tokio::select! {
            _ = notify.notified() => {}
            _ = tokio::time::sleep(interval) => {}
        }
        sweep(&state).await;
    }
}

#[tracing::instrument(skip(state))]
async fn sweep(state: &AppState) {
    let pending = match state.progress.list_pending().await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "failed to list pending jobs");
            return;
        }
    };

    for job in pending {
        // Re-read under a fresh call rather than trusting the listing snapshot —
        // another worker or a concurrent Pause/Cancel may have already claimed it.
        let current = match state.progress.get_by_id(job.id).await {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(job_id = job.id, error = %e, "job vanished before sweep could claim it");
                continue;
            }
        };
        if current.status.is_terminal() || current.status == progress_store::JobStatus::Paused {
            continue;
        }

        if let Err(e) = engine::run(state, current.id).await {
            tracing::warn!(job_id = current.id, error = %e, "swept job failed");
        }
    }
}
