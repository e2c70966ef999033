//! Per-site configuration: selector candidate lists, the injected anchor id,
//! and the busy-label markers used to classify the submit control.

use std::fmt;

use crate::models::RoleOverrides;

/// A logical target kind inside the foreign document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Container,
    Editor,
    SubmitControl,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Container => "container",
            Role::Editor => "editor",
            Role::SubmitControl => "submit control",
        };
        f.write_str(name)
    }
}

/// Immutable per-surface configuration. Never mutated in place; replaced as a
/// whole when an override arrives.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub site: String,
    pub base_url: String,
    pub container: Vec<String>,
    pub editor: Vec<String>,
    pub submit_control: Vec<String>,
    pub anchor_id: String,
    pub busy_markers: Vec<String>,
}

impl SiteProfile {
    pub fn candidates(&self, role: Role) -> &[String] {
        match role {
            Role::Container => &self.container,
            Role::Editor => &self.editor,
            Role::SubmitControl => &self.submit_control,
        }
    }

    /// Build a replacement profile. Overridden roles swap their whole list;
    /// untouched roles keep the compiled-in candidates.
    pub fn with_overrides(&self, overrides: &RoleOverrides) -> SiteProfile {
        let mut profile = self.clone();
        if let Some(container) = &overrides.container {
            profile.container = container.clone();
        }
        if let Some(editor) = &overrides.editor {
            profile.editor = editor.clone();
        }
        if let Some(submit) = &overrides.submit_control {
            profile.submit_control = submit.clone();
        }
        profile
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Ready,
    Busy,
}

/// Classify the submit control from its visible label. Chat surfaces reuse
/// the same button as "stop generation" while a response streams; a label
/// carrying one of the profile's busy markers means the control must not be
/// clicked yet.
pub fn classify_control(profile: &SiteProfile, label: Option<&str>) -> ControlState {
    let Some(label) = label else {
        return ControlState::Ready;
    };
    let lower = label.to_lowercase();
    if profile
        .busy_markers
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
    {
        ControlState::Busy
    } else {
        ControlState::Ready
    }
}

pub fn chatgpt() -> SiteProfile {
    SiteProfile {
        site: "chatgpt".to_string(),
        base_url: "https://chatgpt.com/".to_string(),
        container: vec!["form[data-type=\"unified-composer\"]".to_string(), "main".to_string()],
        editor: vec![
            "div#prompt-textarea".to_string(),
            "textarea[data-testid=\"prompt-textarea\"]".to_string(),
        ],
        submit_control: vec![
            "button[data-testid=\"send-button\"]".to_string(),
            "button[aria-label=\"Send prompt\"]".to_string(),
        ],
        anchor_id: "relay-anchor-chatgpt".to_string(),
        busy_markers: vec![
            "stop streaming".to_string(),
            "stop generating".to_string(),
            "stop".to_string(),
        ],
    }
}

pub fn claude() -> SiteProfile {
    SiteProfile {
        site: "claude".to_string(),
        base_url: "https://claude.ai/".to_string(),
        container: vec!["fieldset".to_string(), "main".to_string()],
        editor: vec![
            "div[contenteditable=\"true\"]".to_string(),
            "div.ProseMirror".to_string(),
        ],
        submit_control: vec![
            "button[aria-label=\"Send Message\"]".to_string(),
            "button[data-testid=\"send-button\"]".to_string(),
        ],
        anchor_id: "relay-anchor-claude".to_string(),
        busy_markers: vec![
            "stop response".to_string(),
            "stop generating".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_markers_match_case_insensitively() {
        let profile = chatgpt();
        assert_eq!(
            classify_control(&profile, Some("Stop Generating")),
            ControlState::Busy
        );
        assert_eq!(
            classify_control(&profile, Some("Send prompt")),
            ControlState::Ready
        );
        assert_eq!(classify_control(&profile, None), ControlState::Ready);
    }

    #[test]
    fn overrides_replace_whole_lists() {
        let profile = chatgpt();
        let overrides = RoleOverrides {
            editor: Some(vec!["#only-this".to_string()]),
            ..Default::default()
        };
        let swapped = profile.with_overrides(&overrides);

        assert_eq!(swapped.editor, vec!["#only-this".to_string()]);
        // Other roles keep the compiled-in candidates.
        assert_eq!(swapped.submit_control, profile.submit_control);
    }
}
