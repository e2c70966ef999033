//! Resiliency monitor.
//!
//! A single watch task polls for the injected affordance root and re-runs
//! the injection entry point when it has been gone for two consecutive
//! ticks. One absent frame during the foreign surface's own re-render is
//! normal; two in a row means the subtree was really torn down.
//!
//! This module owns the watch task handle: `start` always cancels the
//! previous task before spawning, so there is never more than one monitor
//! alive. The injection entry point never arms a watch itself; whether a
//! recovered cycle is followed by a new one is decided here, by the owner of
//! the task.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::sites::SiteHandler;
use crate::surface::Surface;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Tick spacing while the affordance is present.
    pub slow_interval: Duration,
    /// Tick spacing while it is missing.
    pub fast_interval: Duration,
    /// Consecutive absences required before recovery.
    pub absence_threshold: u32,
    /// Ceiling on total ticks for one watch cycle.
    pub max_iterations: u32,
    /// Heartbeat log spacing, in ticks.
    pub heartbeat_every: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            slow_interval: Duration::from_millis(100),
            fast_interval: Duration::from_millis(50),
            absence_threshold: 2,
            max_iterations: 30,
            heartbeat_every: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The affordance was lost and re-injected.
    Recovered,
    /// The cycle ran out with the affordance still in place.
    Stable,
}

pub struct ResiliencyMonitor {
    config: MonitorConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ResiliencyMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            task: Mutex::new(None),
        }
    }

    /// Begin a watch cycle, cancelling any cycle already running.
    pub fn start(&self, surface: Arc<dyn Surface>, handler: Arc<dyn SiteHandler>) {
        let mut slot = self.task.lock().unwrap();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let config = self.config.clone();
        *slot = Some(tokio::spawn(async move {
            // Re-arm with fresh counters after every recovery. A cycle that
            // retires stable means the surface has settled and the watch can
            // end. Re-arming happens here, never inside the injection call,
            // so recovery cannot chain monitors recursively.
            while watch_cycle(surface.as_ref(), handler.as_ref(), &config).await
                == WatchOutcome::Recovered
            {}
        }));
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .unwrap()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

/// One full watch cycle, from arming to recovery or stable shutdown.
pub async fn watch_cycle(
    surface: &dyn Surface,
    handler: &dyn SiteHandler,
    config: &MonitorConfig,
) -> WatchOutcome {
    let anchor_id = handler.profile().anchor_id.clone();
    let mut absences: u32 = 0;
    let mut iterations: u32 = 0;

    loop {
        iterations += 1;
        // A transport error reads as "absent": if the page is unreachable the
        // affordance is certainly not being shown.
        let present = surface
            .affordance_present(&anchor_id)
            .await
            .unwrap_or(false);

        if present {
            absences = 0;
            if iterations % config.heartbeat_every == 0 {
                debug!("#{} present, {} ticks", anchor_id, iterations);
            }
        } else {
            absences += 1;
            debug!("#{} missing ({} consecutive)", anchor_id, absences);
        }

        if absences >= config.absence_threshold {
            info!("#{} lost, re-injecting", anchor_id);
            recover(surface, handler).await;
            return WatchOutcome::Recovered;
        }

        if iterations >= config.max_iterations {
            if !present {
                info!("#{} missing at iteration ceiling, re-injecting", anchor_id);
                recover(surface, handler).await;
                return WatchOutcome::Recovered;
            }
            debug!("#{} stable after {} ticks, watch retired", anchor_id, iterations);
            return WatchOutcome::Stable;
        }

        let interval = if present {
            config.slow_interval
        } else {
            config.fast_interval
        };
        sleep(interval).await;
    }
}

async fn recover(surface: &dyn Surface, handler: &dyn SiteHandler) {
    if let Err(e) = handler.inject_controls(surface).await {
        warn!("re-injection on {} failed: {}", handler.site(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::testutil::RecordingHandler;
    use crate::surface::fake::FakeSurface;

    fn fast_config(max_iterations: u32) -> MonitorConfig {
        MonitorConfig {
            slow_interval: Duration::from_millis(1),
            fast_interval: Duration::from_millis(1),
            absence_threshold: 2,
            max_iterations,
            heartbeat_every: 10,
        }
    }

    #[tokio::test]
    async fn recovery_needs_two_consecutive_absences() {
        let surface = FakeSurface::new();
        // One absent frame is forgiven; the second consecutive one is not.
        surface.script_anchor(&[true, false, true, false, false]);
        let handler = RecordingHandler::new("chatgpt");

        let outcome = watch_cycle(&surface, &handler, &fast_config(30)).await;

        assert_eq!(outcome, WatchOutcome::Recovered);
        assert_eq!(*handler.injections.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn first_absent_tick_does_not_recover() {
        let surface = FakeSurface::new();
        surface.script_anchor(&[false, true]);
        let handler = RecordingHandler::new("chatgpt");

        let outcome = watch_cycle(&surface, &handler, &fast_config(4)).await;

        // The lone absence was a false negative; the cycle retires stable.
        assert_eq!(outcome, WatchOutcome::Stable);
        assert_eq!(*handler.injections.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn ceiling_with_affordance_present_stops_quietly() {
        let surface = FakeSurface::new();
        // Alternating frames keep the consecutive count below threshold.
        surface.script_anchor(&[
            false, true, false, true, false, true, false, true, false, true,
        ]);
        let handler = RecordingHandler::new("chatgpt");

        let outcome = watch_cycle(&surface, &handler, &fast_config(10)).await;

        assert_eq!(outcome, WatchOutcome::Stable);
        assert_eq!(*handler.injections.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn ceiling_while_absent_forces_recovery() {
        let surface = FakeSurface::new();
        // Ends absent on the final tick without ever hitting two in a row.
        surface.script_anchor(&[
            true, false, true, false, true, false, true, false, true, false,
        ]);
        let handler = RecordingHandler::new("chatgpt");

        let outcome = watch_cycle(&surface, &handler, &fast_config(10)).await;

        assert_eq!(outcome, WatchOutcome::Recovered);
        assert_eq!(*handler.injections.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn starting_twice_keeps_a_single_watch_task() {
        let surface = std::sync::Arc::new(FakeSurface::new());
        surface.script_anchor(&[true]);
        let handler = std::sync::Arc::new(RecordingHandler::new("chatgpt"));

        let monitor = ResiliencyMonitor::new(MonitorConfig {
            max_iterations: 1_000,
            ..fast_config(1_000)
        });
        monitor.start(surface.clone(), handler.clone());
        assert!(monitor.is_active());
        monitor.start(surface.clone(), handler.clone());
        assert!(monitor.is_active());

        monitor.stop();
        // Give the abort a moment to land.
        sleep(Duration::from_millis(5)).await;
        assert!(!monitor.is_active());
    }
}
