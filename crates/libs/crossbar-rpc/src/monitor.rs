//! Background scan for calls that never came back.
//!
//! A broker call has no timeout of its own; a worker stays parked on it for
//! as long as it runs. The monitor is the safety net: it cannot cancel a
//! worker mid-call, so it reports and does nothing else.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::tracker::RequestTracker;

/// How often the monitor wakes to scan the tracker.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(5);

/// Spawns the hang monitor task.
///
/// Every `poll_interval` it scans the tracker and emits one critical log line
/// per overdue record. Terminates once `cancel` is observed, either at the
/// top of the cycle or mid-sleep.
pub fn spawn_hang_monitor(
    tracker: Arc<RequestTracker>,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = time::sleep(poll_interval) => {
                    for (key, _overdue) in tracker.scan_expired() {
                        log::error!(
                            "rpc: request {key} may have hanged. You can ignore this message if this is expected."
                        );
                    }
                }
            }
        }
        log::debug!("rpc: hang monitor exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn monitor_observes_without_removing_and_stops_on_cancel() {
        let tracker = Arc::new(RequestTracker::new(Duration::ZERO));
        tracker.track("system.exec");

        let cancel = CancellationToken::new();
        let handle = spawn_hang_monitor(tracker.clone(), Duration::from_millis(5), cancel.clone());

        // Let several polls go by; the hung record must survive all of them.
        time::sleep(Duration::from_millis(40)).await;
        assert_eq!(tracker.len(), 1);

        cancel.cancel();
        handle.await.expect("monitor join");
    }
}
