use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Payloads longer than this are cut in logs and previews.
const PREVIEW_CHARS: usize = 50;

/// One queued payload, owned exclusively by the scheduler until it is handed
/// by value into a [`DispatchRequest`].
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub text: String,
    pub glyph: String,
    pub auto_send: bool,
}

impl QueueItem {
    pub fn preview(&self) -> String {
        truncate_preview(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    Manual,
    Queue,
}

/// Transient value describing one submission attempt. Discarded after a
/// single pass through insertion + dispatch.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub text: String,
    pub auto_send: bool,
    pub origin: RequestOrigin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Seconds,
    Minutes,
}

/// Inter-item pacing for the scheduler. Amounts below
/// [`QueueDelay::MIN_UNITS`] are clamped up, never honored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueDelay {
    pub unit: DelayUnit,
    pub amount: u64,
}

impl QueueDelay {
    pub const MIN_UNITS: u64 = 2;

    pub fn duration(&self) -> Duration {
        let amount = self.amount.max(Self::MIN_UNITS);
        match self.unit {
            DelayUnit::Seconds => Duration::from_secs(amount),
            DelayUnit::Minutes => Duration::from_secs(amount * 60),
        }
    }
}

impl Default for QueueDelay {
    fn default() -> Self {
        Self {
            unit: DelayUnit::Seconds,
            amount: 5,
        }
    }
}

/// Per-role selector replacement supplied by the settings collaborator. A
/// populated role replaces the compiled-in list entirely; there is no merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_control: Option<Vec<String>>,
}

/// On-disk settings document. Absent fields fall back to compiled-in
/// defaults at the call site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_send: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_delay: Option<QueueDelay>,
    #[serde(default)]
    pub selector_overrides: HashMap<String, RoleOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// Advisory progress view of the scheduler, for display only.
#[derive(Debug, Clone, Default)]
pub struct SchedulerSnapshot {
    pub items: Vec<QueuedPreview>,
    pub running: bool,
}

#[derive(Debug, Clone)]
pub struct QueuedPreview {
    pub glyph: String,
    pub preview: String,
}

pub fn truncate_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_clamps_to_minimum_units() {
        let d = QueueDelay {
            unit: DelayUnit::Seconds,
            amount: 0,
        };
        assert_eq!(d.duration(), Duration::from_secs(2));

        let d = QueueDelay {
            unit: DelayUnit::Minutes,
            amount: 1,
        };
        assert_eq!(d.duration(), Duration::from_secs(120));
    }

    #[test]
    fn delay_converts_minutes() {
        let d = QueueDelay {
            unit: DelayUnit::Minutes,
            amount: 3,
        };
        assert_eq!(d.duration(), Duration::from_secs(180));
    }

    #[test]
    fn preview_truncates_long_payloads() {
        let long = "x".repeat(80);
        let p = truncate_preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 53);
        assert_eq!(truncate_preview("short"), "short");
    }
}
