//! Target Resolver: maps a role to the first selector candidate with a live
//! match in the foreign document.
//!
//! Resolution returns the matching selector, never an element handle, so
//! callers re-query the live document on every use. A configuration override,
//! when present for the role, replaces the compiled-in candidate list
//! entirely.

use tracing::debug;

use crate::models::RoleOverrides;
use crate::profiles::{Role, SiteProfile};
use crate::settings::SettingsClient;
use crate::surface::Surface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub role: Role,
    pub selector: String,
}

fn override_for_role(overrides: &RoleOverrides, role: Role) -> Option<&Vec<String>> {
    match role {
        Role::Container => overrides.container.as_ref(),
        Role::Editor => overrides.editor.as_ref(),
        Role::SubmitControl => overrides.submit_control.as_ref(),
    }
}

/// Pure query: no side effects on the foreign document. Transport errors on a
/// candidate count as a non-match; a stale read is indistinguishable from an
/// absent element anyway.
pub async fn resolve(
    surface: &dyn Surface,
    role: Role,
    profile: &SiteProfile,
    settings: Option<&SettingsClient>,
) -> Option<ResolvedTarget> {
    let override_list = match settings {
        Some(client) => client
            .site_selector_overrides(&profile.site)
            .await
            .and_then(|ov| override_for_role(&ov, role).cloned()),
        None => None,
    };

    let candidates: &[String] = match &override_list {
        Some(list) => list,
        None => profile.candidates(role),
    };

    for selector in candidates {
        if surface.exists(selector).await.unwrap_or(false) {
            return Some(ResolvedTarget {
                role,
                selector: selector.clone(),
            });
        }
    }

    debug!("{} absent on {} ({} candidates)", role, profile.site, candidates.len());
    None
}
