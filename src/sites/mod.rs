//! Site-specific send handlers.
//!
//! Each supported surface registers one [`SiteHandler`]; the scheduler and
//! the monitor only ever talk to the trait, so adding a site never touches
//! either of them.

pub mod chatgpt;
pub mod claude;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::{run_dispatch, DispatchConfig, DispatchOutcome};
use crate::error::RelayError;
use crate::insert::insert_payload;
use crate::models::DispatchRequest;
use crate::profiles::SiteProfile;
use crate::settings::SettingsClient;
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Payload written, submission not requested.
    Inserted,
    /// Payload written and the dispatch protocol ran to a terminal state.
    Dispatched(DispatchOutcome),
}

#[async_trait]
pub trait SiteHandler: Send + Sync {
    fn site(&self) -> &str;

    fn profile(&self) -> &SiteProfile;

    /// (Re-)establish the injected affordances. Never arms the resiliency
    /// monitor itself; the caller decides whether to re-arm.
    async fn inject_controls(&self, surface: &dyn Surface) -> Result<(), RelayError>;

    /// Write the payload and, when requested, drive the dispatch protocol.
    async fn send(
        &self,
        surface: &dyn Surface,
        request: &DispatchRequest,
        force_auto_send: bool,
    ) -> Result<SendOutcome, RelayError>;
}

/// Insert + dispatch against a profile; the shared body of every handler.
pub(crate) async fn send_via_profile(
    surface: &dyn Surface,
    profile: &SiteProfile,
    settings: &SettingsClient,
    dispatch_config: &DispatchConfig,
    request: &DispatchRequest,
    force_auto_send: bool,
) -> Result<SendOutcome, RelayError> {
    let auto_send = force_auto_send || request.auto_send;
    insert_payload(surface, profile, Some(settings), &request.text, auto_send).await?;
    if !auto_send {
        return Ok(SendOutcome::Inserted);
    }
    let outcome = run_dispatch(surface, profile, Some(settings), dispatch_config).await;
    Ok(SendOutcome::Dispatched(outcome))
}

#[derive(Default)]
pub struct SiteRegistry {
    handlers: HashMap<String, Arc<dyn SiteHandler>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All compiled-in handlers.
    pub fn builtin(settings: SettingsClient) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(chatgpt::ChatGptHandler::new(settings.clone())));
        registry.register(Arc::new(claude::ClaudeHandler::new(settings)));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn SiteHandler>) {
        self.handlers.insert(handler.site().to_string(), handler);
    }

    pub fn get(&self, site: &str) -> Option<Arc<dyn SiteHandler>> {
        self.handlers.get(site).cloned()
    }

    /// Match a live page URL to its handler.
    pub fn match_url(&self, url: &str) -> Option<Arc<dyn SiteHandler>> {
        self.handlers
            .values()
            .find(|handler| {
                let host = handler
                    .profile()
                    .base_url
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/');
                url.contains(host)
            })
            .cloned()
    }

    pub fn sites(&self) -> Vec<String> {
        let mut sites: Vec<String> = self.handlers.keys().cloned().collect();
        sites.sort();
        sites
    }
}

/// Markup for the injected queue panel. Advisory display only.
pub fn queue_panel_markup(glyphs: &[String], running: bool) -> String {
    let state = if running { "running" } else { "idle" };
    let mut slots = String::new();
    for glyph in glyphs {
        slots.push_str(&format!(
            "<span class=\"relay-slot\">{}</span>",
            html_escape(glyph)
        ));
    }
    format!(
        "<div class=\"relay-panel\" data-state=\"{}\"><span class=\"relay-count\">{}</span>{}</div>",
        state,
        glyphs.len(),
        slots
    )
}

pub fn idle_panel_markup() -> String {
    queue_panel_markup(&[], false)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Records sends and injections; outcome per call is scripted.
    pub struct RecordingHandler {
        profile: SiteProfile,
        pub sends: Mutex<Vec<(String, bool, Instant)>>,
        pub injections: Mutex<u32>,
        pub outcome: Mutex<Result<SendOutcome, String>>,
    }

    impl RecordingHandler {
        pub fn new(site: &str) -> Self {
            let mut profile = crate::profiles::chatgpt();
            profile.site = site.to_string();
            Self {
                profile,
                sends: Mutex::new(Vec::new()),
                injections: Mutex::new(0),
                outcome: Mutex::new(Ok(SendOutcome::Dispatched(DispatchOutcome::Confirmed))),
            }
        }

        pub fn send_times(&self) -> Vec<Instant> {
            self.sends.lock().unwrap().iter().map(|(_, _, t)| *t).collect()
        }

        pub fn sent_texts(&self) -> Vec<String> {
            self.sends.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl SiteHandler for RecordingHandler {
        fn site(&self) -> &str {
            &self.profile.site
        }

        fn profile(&self) -> &SiteProfile {
            &self.profile
        }

        async fn inject_controls(&self, _surface: &dyn Surface) -> Result<(), RelayError> {
            *self.injections.lock().unwrap() += 1;
            Ok(())
        }

        async fn send(
            &self,
            _surface: &dyn Surface,
            request: &DispatchRequest,
            force_auto_send: bool,
        ) -> Result<SendOutcome, RelayError> {
            self.sends.lock().unwrap().push((
                request.text.clone(),
                force_auto_send,
                Instant::now(),
            ));
            match &*self.outcome.lock().unwrap() {
                Ok(outcome) => Ok(*outcome),
                Err(msg) => Err(RelayError::InsertionFailed(msg.clone())),
            }
        }
    }
}
