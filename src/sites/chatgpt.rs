//! ChatGPT surface handler. The composer is a contenteditable ProseMirror
//! host whose auto-resize only fires on real key events, and the send button
//! doubles as "stop streaming" while a response is in flight.

use async_trait::async_trait;
use tracing::debug;

use super::{idle_panel_markup, send_via_profile, SendOutcome, SiteHandler};
use crate::dispatch::DispatchConfig;
use crate::error::RelayError;
use crate::models::DispatchRequest;
use crate::profiles::{self, Role, SiteProfile};
use crate::resolve::resolve;
use crate::settings::SettingsClient;
use crate::surface::Surface;

pub struct ChatGptHandler {
    profile: SiteProfile,
    settings: SettingsClient,
    dispatch_config: DispatchConfig,
}

impl ChatGptHandler {
    pub fn new(settings: SettingsClient) -> Self {
        Self {
            profile: profiles::chatgpt(),
            settings,
            dispatch_config: DispatchConfig::default(),
        }
    }
}

#[async_trait]
impl SiteHandler for ChatGptHandler {
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
        // Dialogs and banners steal focus from the composer; Escape closes
        // whatever is open and is harmless when nothing is.
        let _ = surface.press_key("body", "Escape").await;

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
