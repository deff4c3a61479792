//! Supervisor lifecycle events as user notifications.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use lintd_types::Notification;
use lintd_worker::SupervisorEvent;

pub const WORKER_DIED: &str = "Worker died unexpectedly";
pub const WORKER_DIED_DETAIL: &str =
    "Check your console for more info. A new worker will be spawned instantly.";

/// The notification shown for `event`, if any.
#[must_use]
pub fn notification_for_event(event: &SupervisorEvent) -> Option<Notification> {
    match event {
        SupervisorEvent::Crashed { .. } => {
            Some(Notification::error(WORKER_DIED).with_detail(WORKER_DIED_DETAIL))
        }
        _ => None,
    }
}

/// Forward crash notifications from `events` to `sink` until either side closes.
pub fn spawn_crash_notifier(
    mut events: broadcast::Receiver<SupervisorEvent>,
    sink: mpsc::UnboundedSender<Notification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(notification) = notification_for_event(&event)
                        && sink.send(notification).is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed supervisor events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
