//! Dispatch protocol: a bounded poll state machine around the submit control.
//!
//! `Locating → Waiting(busy) → Ready → Clicking → Confirmed | TimedOut |
//! Aborted`. The control is re-resolved on every tick; a handle held across a
//! poll would go stale the moment the foreign surface re-renders. `Confirmed`
//! means the click was dispatched — this protocol has no acknowledgment
//! channel and does not pretend to.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::profiles::{classify_control, ControlState, Role, SiteProfile};
use crate::resolve::resolve;
use crate::settings::SettingsClient;
use crate::surface::Surface;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_attempts: 50,
            timeout: Duration::from_secs(5),
            settle_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The click was dispatched. Nothing stronger.
    Confirmed,
    /// The control was seen but never became ready within budget.
    TimedOut,
    /// No control could be located at all.
    Aborted,
}

pub async fn run_dispatch(
    surface: &dyn Surface,
    profile: &SiteProfile,
    settings: Option<&SettingsClient>,
    config: &DispatchConfig,
) -> DispatchOutcome {
    // Locating: a surface with no submit control anywhere is not worth
    // polling against.
    if resolve(surface, Role::SubmitControl, profile, settings)
        .await
        .is_none()
    {
        warn!("submit control absent on {}, aborting dispatch", profile.site);
        return DispatchOutcome::Aborted;
    }

    // Waiting: the control may flicker out during re-renders or hold a busy
    // label while a response streams. Tolerate both until the budget runs out.
    let deadline = Instant::now() + config.timeout;
    let mut attempts: u32 = 0;
    loop {
        if let Some(target) = resolve(surface, Role::SubmitControl, profile, settings).await {
            let label = surface
                .control_label(&target.selector)
                .await
                .ok()
                .flatten();
            if classify_control(profile, label.as_deref()) == ControlState::Ready {
                debug!("submit control ready after {} polls", attempts);
                break;
            }
        }

        attempts += 1;
        if attempts >= config.max_attempts || Instant::now() >= deadline {
            warn!(
                "submit control still unavailable after {} polls, timing out",
                attempts
            );
            return DispatchOutcome::TimedOut;
        }
        sleep(config.poll_interval).await;
    }

    // Ready: let the insertion-triggered re-render finish before clicking.
    sleep(config.settle_delay).await;

    // Clicking: resolve fresh once more; the settle window is plenty of time
    // for the control to have been re-mounted.
    let Some(target) = resolve(surface, Role::SubmitControl, profile, settings).await else {
        warn!("submit control vanished during settle on {}", profile.site);
        return DispatchOutcome::Aborted;
    };

    if let Err(e) = surface.click(&target.selector).await {
        // Some builds swallow the click but still submit on Enter in the
        // editor.
        warn!("click on {} failed ({}), falling back to Enter", target.selector, e);
        let Some(editor) = resolve(surface, Role::Editor, profile, settings).await else {
            return DispatchOutcome::Aborted;
        };
        if surface.press_key(&editor.selector, "Enter").await.is_err() {
            return DispatchOutcome::Aborted;
        }
    }

    DispatchOutcome::Confirmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles;
    use crate::surface::fake::FakeSurface;

    const SEND_BTN: &str = "button[data-testid=\"send-button\"]";
    const EDITOR: &str = "div#prompt-textarea";

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            poll_interval: Duration::from_millis(2),
            max_attempts: 5,
            timeout: Duration::from_millis(100),
            settle_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn busy_control_becoming_ready_is_confirmed() {
        let surface = FakeSurface::new();
        surface.script_labels(SEND_BTN, &["Stop generating", "Stop generating", "Send prompt"]);
        let profile = profiles::chatgpt();

        let outcome = run_dispatch(&surface, &profile, None, &fast_config()).await;
        assert_eq!(outcome, DispatchOutcome::Confirmed);
        assert_eq!(surface.clicks.lock().unwrap().as_slice(), &[SEND_BTN.to_string()]);
    }

    #[tokio::test]
    async fn control_busy_past_budget_times_out() {
        let surface = FakeSurface::new();
        surface.script_labels(SEND_BTN, &["Stop generating"]);
        let profile = profiles::chatgpt();

        let outcome = run_dispatch(&surface, &profile, None, &fast_config()).await;
        assert_eq!(outcome, DispatchOutcome::TimedOut);
        assert!(surface.clicks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn control_never_located_aborts() {
        let surface = FakeSurface::new();
        let profile = profiles::chatgpt();

        let outcome = run_dispatch(&surface, &profile, None, &fast_config()).await;
        assert_eq!(outcome, DispatchOutcome::Aborted);
    }

    #[tokio::test]
    async fn control_disappearing_mid_wait_times_out() {
        let surface = FakeSurface::new();
        surface.script_labels(SEND_BTN, &["Stop generating"]);
        let profile = profiles::chatgpt();

        let cfg = fast_config();
        let handle = {
            let surface = std::sync::Arc::new(surface);
            let s2 = surface.clone();
            let profile2 = profile.clone();
            let h = tokio::spawn(async move { run_dispatch(s2.as_ref(), &profile2, None, &cfg).await });
            // Remove the control while the protocol is polling.
            tokio::time::sleep(Duration::from_millis(4)).await;
            surface.remove_element(SEND_BTN);
            h
        };
        assert_eq!(handle.await.unwrap(), DispatchOutcome::TimedOut);
    }

    #[tokio::test]
    async fn failed_click_falls_back_to_enter() {
        let surface = FakeSurface::new();
        surface.script_labels(SEND_BTN, &["Send prompt"]);
        surface.add_element(EDITOR);
        *surface.fail_clicks.lock().unwrap() = true;
        let profile = profiles::chatgpt();

        let outcome = run_dispatch(&surface, &profile, None, &fast_config()).await;
        assert_eq!(outcome, DispatchOutcome::Confirmed);
        assert_eq!(
            surface.keys.lock().unwrap().as_slice(),
            &[(EDITOR.to_string(), "Enter".to_string())]
        );
    }
}
