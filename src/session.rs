//! One supervised session: a dedicated worker thread running the supervisor on
//! its own tokio runtime.
//!
//! The presentation thread never blocks on network I/O; it only talks to the
//! worker through the event channel and the session's cancellation token.
//! [`Session::stop`] cancels and then joins the worker, so once it returns the
//! supervisor has fully unwound and no further events can be sent.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{DashError, DashResult};
use crate::supervisor::{SessionStats, StatsSnapshot, Supervisor, SupervisorEvent, SupervisorSettings};
use crate::transport::Transport;

/// Name given to session worker threads.
pub const WORKER_THREAD_NAME: &str = "telemetry-session";

/// Handle to a running (or finished) session worker.
pub struct Session {
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    stats: Arc<SessionStats>,
}

impl Session {
    /// Spawn a worker thread and start supervising `settings.endpoint`.
    pub fn start<T: Transport>(
        settings: SupervisorSettings,
        transport: T,
        events: mpsc::UnboundedSender<SupervisorEvent>,
    ) -> DashResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DashError::Runtime(format!("failed to create session runtime: {}", e)))?;

        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(settings, transport, events, cancel.clone());
        let stats = supervisor.stats();

        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(supervisor.run());
            })?;

        info!("session started");
        Ok(Self {
            cancel,
            worker: Some(worker),
            stats,
        })
    }

    /// Request a stop and block until the worker has exited.
    ///
    /// Idempotent: later calls return immediately.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("session worker panicked");
            }
            info!("session stopped");
        }
    }

    /// Current session counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}
