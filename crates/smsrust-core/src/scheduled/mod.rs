//! Background scheduled tasks
//!
//! Two long-lived tasks run beside the dispatchers: the daily counter reset
//! and the sending-window monitor. Both expose their body as a plain async
//! method so tests drive them directly; `spawn` only adds the timing loop.

pub mod daily_reset;
pub mod time_restriction;

pub use daily_reset::DailyResetTask;
pub use time_restriction::TimeRestrictionMonitor;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Handle to a spawned scheduled task
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) fn new(name: &'static str, token: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self {
            name,
            token,
            handle,
        }
    }

    /// Cancel the task and wait for it to exit
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(task = self.name, error = %e, "Scheduled task ended abnormally");
        }
    }
}
