//! Claude surface handler. The composer needs explicit focus before it
//! accepts programmatic input, and takes a moment to attach its listeners
//! after a tab switch.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;

use super::{idle_panel_markup, send_via_profile, SendOutcome, SiteHandler};
use crate::dispatch::DispatchConfig;
use crate::error::RelayError;
use crate::models::DispatchRequest;
use crate::profiles::{self, Role, SiteProfile};
use crate::resolve::resolve;
use crate::settings::SettingsClient;
use crate::surface::Surface;

const FOCUS_SETTLE: Duration = Duration::from_millis(500);

pub struct ClaudeHandler {
    profile: SiteProfile,
    settings: SettingsClient,
    dispatch_config: DispatchConfig,
}

impl ClaudeHandler {
    pub fn new(settings: SettingsClient) -> Self {
        Self {
            profile: profiles::claude(),
            settings,
            dispatch_config: DispatchConfig::default(),
        }
    }
}

#[async_trait]
impl SiteHandler for ClaudeHandler {
    fn site(&self) -> &str {
        &self.profile.site
    }

    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn inject_controls(&self, surface: &dyn Surface) -> Result<(), RelayError> {
        let container = resolve(surface, Role::Container, &self.profile, Some(&self.settings)).await;
        surface
            .inject_affordance(
                &self.profile.anchor_id,
                container.as_ref().map(|c| c.selector.as_str()),
                &idle_panel_markup(),
            )
            .await?;
        debug!("injected queue panel #{}", self.profile.anchor_id);
        Ok(())
    }

    async fn send(
        &self,
        surface: &dyn Surface,
        request: &DispatchRequest,
        force_auto_send: bool,
    ) -> Result<SendOutcome, RelayError> {
        if let Some(editor) =
            resolve(surface, Role::Editor, &self.profile, Some(&self.settings)).await
        {
            let _ = surface.click(&editor.selector).await;
            sleep(FOCUS_SETTLE).await;
        }

        send_via_profile(
            surface,
            &self.profile,
            &self.settings,
            &self.dispatch_config,
            request,
            force_auto_send,
        )
        .await
    }
}
