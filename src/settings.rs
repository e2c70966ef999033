//! Configuration/storage collaborator.
//!
//! A single actor owns the settings document; the rest of the core talks to
//! it through a cloneable client whose getters are fallible by construction:
//! a slow or dead actor yields the compiled-in default, never an error.

use std::time::Duration;

use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::models::{QueueDelay, RoleOverrides, StoredSettings};
use crate::storage::{atomic_write_json, read_json, FileLock};

/// How long a getter waits for the actor before falling back to defaults.
const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum SettingsCommand {
    GetOverrides {
        site: String,
        reply: oneshot::Sender<Option<RoleOverrides>>,
    },
    GetQueueDelay {
        reply: oneshot::Sender<QueueDelay>,
    },
    GetAutoSend {
        reply: oneshot::Sender<bool>,
    },
    PutOverrides {
        site: String,
        overrides: RoleOverrides,
    },
}

pub struct SettingsActor {
    settings: StoredSettings,
    path: String,
    rx: mpsc::Receiver<SettingsCommand>,
}

impl SettingsActor {
    pub fn new(path: &str, rx: mpsc::Receiver<SettingsCommand>) -> Self {
        let settings = match read_json::<StoredSettings>(path) {
            Ok(s) => s,
            Err(e) => {
                debug!("settings file {} not loaded ({}), using defaults", path, e);
                StoredSettings::default()
            }
        };

        Self {
            settings,
            path: path.to_string(),
            rx,
        }
    }

    pub async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                SettingsCommand::GetOverrides { site, reply } => {
                    let _ = reply.send(self.settings.selector_overrides.get(&site).cloned());
                }
                SettingsCommand::GetQueueDelay { reply } => {
                    let _ = reply.send(self.settings.queue_delay.unwrap_or_default());
                }
                SettingsCommand::GetAutoSend { reply } => {
                    let _ = reply.send(self.settings.auto_send.unwrap_or(false));
                }
                SettingsCommand::PutOverrides { site, overrides } => {
                    self.settings.selector_overrides.insert(site, overrides);
                    self.persist();
                }
            }
        }
    }

    fn persist(&mut self) {
        self.settings.updated = Some(Local::now().to_rfc3339());
        let _lock = match FileLock::new(&self.path) {
            Ok(l) => l,
            Err(e) => {
                warn!("settings lock on {} failed: {}", self.path, e);
                return;
            }
        };
        if let Err(e) = atomic_write_json(&self.path, &self.settings) {
            warn!("settings persist to {} failed: {}", self.path, e);
        }
    }
}

#[derive(Clone)]
pub struct SettingsClient {
    tx: mpsc::Sender<SettingsCommand>,
}

impl SettingsClient {
    pub fn new(tx: mpsc::Sender<SettingsCommand>) -> Self {
        Self { tx }
    }

    /// Load the settings file at `path` and spawn the owning actor.
    pub fn spawn(path: &str) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let actor = SettingsActor::new(path, rx);
        tokio::spawn(actor.run());
        Self::new(tx)
    }

    pub async fn site_selector_overrides(&self, site: &str) -> Option<RoleOverrides> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(SettingsCommand::GetOverrides {
                site: site.to_string(),
                reply: tx,
            })
            .await;
        match tokio::time::timeout(REPLY_TIMEOUT, rx).await {
            Ok(Ok(overrides)) => overrides,
            _ => None,
        }
    }

    pub async fn queue_delay(&self) -> QueueDelay {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(SettingsCommand::GetQueueDelay { reply: tx })
            .await;
        match tokio::time::timeout(REPLY_TIMEOUT, rx).await {
            Ok(Ok(delay)) => delay,
            _ => QueueDelay::default(),
        }
    }

    pub async fn auto_send_enabled(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .tx
            .send(SettingsCommand::GetAutoSend { reply: tx })
            .await;
        match tokio::time::timeout(REPLY_TIMEOUT, rx).await {
            Ok(Ok(enabled)) => enabled,
            _ => false,
        }
    }

    pub async fn put_overrides(&self, site: &str, overrides: RoleOverrides) {
        let _ = self
            .tx
            .send(SettingsCommand::PutOverrides {
                site: site.to_string(),
                overrides,
            })
            .await;
    }
}
