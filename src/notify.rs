//! Notification collaborator. Fire-and-forget: the core never blocks on a
//! notification and never learns whether one was delivered.

use reqwest::Client;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Writes notifications into the log stream.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}

/// Posts notifications as JSON to an inbox endpoint.
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
    sender: String,
}

impl HttpNotifier {
    pub fn new(endpoint: &str, sender: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            sender: sender.to_string(),
        }
    }
}

impl Notifier for HttpNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let body = json!({
            "sender": self.sender,
            "severity": severity.as_str(),
            "message": message,
        });
        tokio::spawn(async move {
            let _ = client.post(endpoint).json(&body).send().await;
        });
    }
}
