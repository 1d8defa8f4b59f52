//! Background expiry sweeper
//!
//! Periodically reclaims abandoned locks (a client that crashed without
//! releasing). Lazy expiry on the acquire and read paths already treats
//! expired-but-present locks as absent, so sweeper latency can only delay the
//! cleared broadcast to idle subscribers, never an acquire decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use tracing::{debug, info};

use crate::service::LockService;

/// Interval-driven sweep task over the lock store
pub struct ExpiredLockSweeper {
    service: Arc<LockService>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl ExpiredLockSweeper {
    pub fn new(service: Arc<LockService>, cleanup_interval_ms: u64) -> Self {
        Self {
            service,
            interval: Duration::from_millis(cleanup_interval_ms),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the sweep loop. A second call while running is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("Expired lock sweeper already running");
            return;
        }

        info!(interval_ms = self.interval.as_millis() as u64, "Starting expired lock sweeper");

        let running = self.running.clone();
        let service = self.service.clone();
        let period = self.interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let swept = service.sweep_expired();
                if swept > 0 {
                    counter!("blueprint.locks.swept").increment(swept as u64);
                    debug!(count = swept, "Reclaimed expired locks");
                }
                gauge!("blueprint.locks.active").set(service.active_lock_count() as f64);
            }
            info!("Expired lock sweeper stopped");
        });
    }

    /// Request shutdown; the loop exits at its next tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Stopping expired lock sweeper");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
