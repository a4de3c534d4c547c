//! The permit-gated worker pool and its lifecycle.

use std::sync::Arc;
use std::time::Duration;

use crossbar_api::{ServerTransport, ServiceBroker};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::process_next_request;
use crate::monitor::{spawn_hang_monitor, MONITOR_INTERVAL};
use crate::tracker::{RequestTracker, WORKER_TIMEOUT};

/// Initialization surface of the dispatch core.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Bounded wait applied to each transport receive, in microseconds.
    pub recv_timeout_us: u64,
    /// Worker task count; `0` is coerced to `1`.
    pub num_workers: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            recv_timeout_us: 1_000_000,
            num_workers: 1,
        }
    }
}

/// A running worker pool plus its hang monitor.
///
/// Admission is gated by a counting permit sized to the worker count. With
/// permits equal to workers the gate admits everything the pool can run, but
/// it is kept as an independent primitive so a stricter admission policy can
/// shrink it without touching the pool. It is never acquired while the
/// tracker lock is held.
pub struct RpcServer {
    workers: Vec<JoinHandle<()>>,
    monitor: JoinHandle<()>,
    tracker: Arc<RequestTracker>,
    cancel: CancellationToken,
}

impl RpcServer {
    /// Spawns `config.num_workers` workers and the monitor.
    pub fn start(
        transport: Arc<dyn ServerTransport>,
        broker: Arc<dyn ServiceBroker>,
        config: RpcConfig,
    ) -> Self {
        let num_workers = config.num_workers.max(1);
        let recv_timeout = Duration::from_micros(config.recv_timeout_us);
        let tracker = Arc::new(RequestTracker::new(WORKER_TIMEOUT));
        let permits = Arc::new(Semaphore::new(num_workers));
        let cancel = CancellationToken::new();

        let workers = (0..num_workers)
            .map(|index| {
                spawn_worker(
                    index,
                    transport.clone(),
                    broker.clone(),
                    tracker.clone(),
                    permits.clone(),
                    recv_timeout,
                    cancel.clone(),
                )
            })
            .collect();
        let monitor = spawn_hang_monitor(tracker.clone(), MONITOR_INTERVAL, cancel.clone());

        Self {
            workers,
            monitor,
            tracker,
            cancel,
        }
    }

    /// Shared view of the in-flight request records.
    pub fn tracker(&self) -> Arc<RequestTracker> {
        self.tracker.clone()
    }

    /// Flags shutdown and joins every worker and the monitor.
    ///
    /// In-flight receive waits are not preempted, so this returns only after
    /// the slowest worker finishes its current iteration: worst case one
    /// receive timeout, plus the monitor noticing mid-sleep.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for worker in self.workers {
            let _ = worker.await;
        }
        let _ = self.monitor.await;
    }
}

fn spawn_worker(
    index: usize,
    transport: Arc<dyn ServerTransport>,
    broker: Arc<dyn ServiceBroker>,
    tracker: Arc<RequestTracker>,
    permits: Arc<Semaphore>,
    recv_timeout: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            // Acquired with no other resource held; racing it against
            // cancellation keeps shutdown reachable even if the permit pool
            // is ever sized below the worker count.
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = permits.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if let Err(err) =
                process_next_request(transport.as_ref(), broker.as_ref(), &tracker, recv_timeout)
                    .await
            {
                // Transport hiccups end the iteration, never the worker.
                log::debug!("rpc: worker {index} receive failed: {err}");
            }
            drop(permit);
        }
        log::debug!("rpc: worker {index} exiting");
    })
}
