//! Dispatch scheduler: a capacity-bounded FIFO queue that feeds payloads
//! through a site handler one at a time, with a configurable pause between
//! items.
//!
//! A single actor task owns all state; commands arrive over one channel, and
//! the inter-item timer is a spawned sleep that sends a tick back into the
//! same channel. Ticks carry the epoch they were armed under, so a tick from
//! a timer that was cancelled (or had its run superseded) is ignored instead
//! of double-firing the queue.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::dispatch::DispatchOutcome;
use crate::error::RelayError;
use crate::models::{
    DispatchRequest, QueueItem, QueuedPreview, RequestOrigin, SchedulerSnapshot,
};
use crate::notify::{Notifier, Severity};
use crate::sites::{queue_panel_markup, SendOutcome, SiteRegistry};
use crate::settings::SettingsClient;
use crate::surface::Surface;

pub const QUEUE_MAX_SIZE: usize = 10;

#[derive(Debug)]
pub enum SchedulerCommand {
    Enqueue {
        item: QueueItem,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Dequeue {
        index: usize,
    },
    Start,
    Pause,
    Reset,
    Snapshot {
        reply: oneshot::Sender<SchedulerSnapshot>,
    },
    /// Internal: the inter-item timer armed under `epoch` fired.
    Tick {
        epoch: u64,
    },
}

pub struct SchedulerActor {
    queue: VecDeque<QueueItem>,
    running: bool,
    pending_timer: Option<JoinHandle<()>>,
    timer_epoch: u64,
    surface: Arc<dyn Surface>,
    registry: Arc<SiteRegistry>,
    site: String,
    settings: SettingsClient,
    notifier: Arc<dyn Notifier>,
    self_tx: mpsc::Sender<SchedulerCommand>,
    rx: mpsc::Receiver<SchedulerCommand>,
}

impl SchedulerActor {
    pub async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                SchedulerCommand::Enqueue { item, reply } => {
                    let result = self.enqueue(item);
                    if result.is_ok() {
                        self.refresh_display().await;
                    }
                    let _ = reply.send(result);
                }
                SchedulerCommand::Dequeue { index } => {
                    if index < self.queue.len() {
                        self.queue.remove(index);
                        self.refresh_display().await;
                    }
                }
                SchedulerCommand::Start => {
                    if !self.running && !self.queue.is_empty() {
                        info!("queue started with {} items", self.queue.len());
                        self.running = true;
                        self.process_next().await;
                    }
                }
                SchedulerCommand::Pause => {
                    self.pause();
                    self.refresh_display().await;
                }
                SchedulerCommand::Reset => {
                    self.reset().await;
                }
                SchedulerCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                SchedulerCommand::Tick { epoch } => {
                    self.pending_timer = None;
                    if self.running && epoch == self.timer_epoch {
                        self.process_next().await;
                    } else {
                        debug!("stale queue tick (epoch {}) ignored", epoch);
                    }
                }
            }
        }
    }

    fn enqueue(&mut self, item: QueueItem) -> Result<(), RelayError> {
        if self.queue.len() >= QUEUE_MAX_SIZE {
            self.notifier.notify(
                &format!("Queue is full ({} items max)", QUEUE_MAX_SIZE),
                Severity::Warning,
            );
            return Err(RelayError::QueueCapacityExceeded(QUEUE_MAX_SIZE));
        }
        debug!("enqueued \"{}\"", item.preview());
        self.queue.push_back(item);
        Ok(())
    }

    async fn process_next(&mut self) {
        let Some(item) = self.queue.pop_front() else {
            self.running = false;
            self.refresh_display().await;
            return;
        };

        let Some(handler) = self.registry.get(&self.site) else {
            self.notifier.notify(
                &format!("No send handler registered for site '{}'", self.site),
                Severity::Error,
            );
            self.reset().await;
            return;
        };

        self.refresh_display().await;
        info!("dispatching queued item \"{}\"", item.preview());

        let request = DispatchRequest {
            text: item.text,
            auto_send: item.auto_send,
            origin: RequestOrigin::Queue,
        };
        // The queue always forces automatic submission, whatever the item's
        // own flag says.
        let result = handler.send(self.surface.as_ref(), &request, true).await;

        match result {
            Ok(SendOutcome::Dispatched(DispatchOutcome::Confirmed))
            | Ok(SendOutcome::Inserted) => {
                if self.queue.is_empty() {
                    info!("queue drained");
                    self.running = false;
                    self.refresh_display().await;
                } else {
                    self.arm_timer().await;
                }
            }
            Ok(SendOutcome::Dispatched(DispatchOutcome::TimedOut)) => {
                self.notifier.notify(
                    "Submit control never became ready; queue stopped",
                    Severity::Error,
                );
                self.reset().await;
            }
            Ok(SendOutcome::Dispatched(DispatchOutcome::Aborted)) => {
                self.notifier.notify(
                    "Submit control could not be located; queue stopped",
                    Severity::Error,
                );
                self.reset().await;
            }
            Err(e) => {
                self.notifier
                    .notify(&format!("Queued send failed: {}", e), Severity::Error);
                self.reset().await;
            }
        }
    }

    async fn arm_timer(&mut self) {
        let delay = self.settings.queue_delay().await.duration();
        // Invariant: at most one pending timer.
        if let Some(previous) = self.pending_timer.take() {
            previous.abort();
        }
        self.timer_epoch += 1;
        let epoch = self.timer_epoch;
        let tx = self.self_tx.clone();
        debug!("next item in {:?}", delay);
        self.pending_timer = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(SchedulerCommand::Tick { epoch }).await;
        }));
        self.refresh_display().await;
    }

    fn pause(&mut self) {
        self.running = false;
        // The remaining slice of the current delay is discarded on purpose;
        // resuming restarts from the head with a full fresh delay.
        if let Some(timer) = self.pending_timer.take() {
            timer.abort();
        }
        self.timer_epoch += 1;
    }

    async fn reset(&mut self) {
        self.pause();
        self.queue.clear();
        self.refresh_display().await;
    }

    fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            items: self
                .queue
                .iter()
                .map(|item| QueuedPreview {
                    glyph: item.glyph.clone(),
                    preview: item.preview(),
                })
                .collect(),
            running: self.running,
        }
    }

    async fn refresh_display(&self) {
        let Some(handler) = self.registry.get(&self.site) else {
            return;
        };
        let glyphs: Vec<String> = self.queue.iter().map(|item| item.glyph.clone()).collect();
        let markup = queue_panel_markup(&glyphs, self.running);
        if let Err(e) = self
            .surface
            .update_affordance(&handler.profile().anchor_id, &markup)
            .await
        {
            warn!("queue display refresh failed: {}", e);
        }
    }
}

#[derive(Clone)]
pub struct SchedulerClient {
    tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerClient {
    pub fn spawn(
        surface: Arc<dyn Surface>,
        registry: Arc<SiteRegistry>,
        site: &str,
        settings: SettingsClient,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let actor = SchedulerActor {
            queue: VecDeque::new(),
            running: false,
            pending_timer: None,
            timer_epoch: 0,
            surface,
            registry,
            site: site.to_string(),
            settings,
            notifier,
            self_tx: tx.clone(),
            rx,
        };
        tokio::spawn(actor.run());
        Self { tx }
    }

    pub async fn enqueue(&self, item: QueueItem) -> Result<(), RelayError> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(SchedulerCommand::Enqueue { item, reply: tx })
            .await;
        rx.await.unwrap_or(Ok(()))
    }

    pub async fn dequeue(&self, index: usize) {
        let _ = self.tx.send(SchedulerCommand::Dequeue { index }).await;
    }

    pub async fn start(&self) {
        let _ = self.tx.send(SchedulerCommand::Start).await;
    }

    pub async fn pause(&self) {
        let _ = self.tx.send(SchedulerCommand::Pause).await;
    }

    pub async fn reset(&self) {
        let _ = self.tx.send(SchedulerCommand::Reset).await;
    }

    pub async fn snapshot(&self) -> SchedulerSnapshot {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(SchedulerCommand::Snapshot { reply: tx }).await;
        rx.await.unwrap_or_default()
    }
}
