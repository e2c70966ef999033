//! Access to the foreign document.
//!
//! Every DOM touch the core performs goes through the [`Surface`] trait, so
//! the resolver, insertion strategies, dispatch protocol, monitor, and
//! scheduler never hold a live element handle — they carry selectors and
//! re-query on every use, because the foreign surface may have re-rendered
//! between any two awaits.

pub mod cdp;
pub mod chrome;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;

use crate::error::SurfaceError;

/// What kind of editing element a selector points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    /// `<textarea>`/`<input>`: supports direct value assignment and a
    /// selection range.
    PlainValue,
    /// `contenteditable` host: only observes content through its own change
    /// detection, which synthetic input events must feed.
    Structured,
}

#[async_trait]
pub trait Surface: Send + Sync {
    /// Whether any element currently matches `selector`.
    async fn exists(&self, selector: &str) -> Result<bool, SurfaceError>;

    async fn editor_kind(&self, selector: &str) -> Result<EditorKind, SurfaceError>;

    /// Current textual content of the element (value or innerText).
    async fn read_text(&self, selector: &str) -> Result<Option<String>, SurfaceError>;

    /// Visible label / aria-label of a control, used for busy classification.
    async fn control_label(&self, selector: &str) -> Result<Option<String>, SurfaceError>;

    /// Replace a plain-value editor's content, fire input/change events and
    /// move the caret to the end.
    async fn set_plain_value(&self, selector: &str, text: &str) -> Result<(), SurfaceError>;

    /// Replace a structured editor's content (clearing any placeholder
    /// markup) and fire an input event. An empty `text` clears the editor.
    async fn write_rich_text(&self, selector: &str, text: &str) -> Result<(), SurfaceError>;

    /// Synthesize a full key-press for one character in the focused editor:
    /// key-down carrying the character text, then key-up.
    async fn synthesize_keystroke(&self, selector: &str, ch: char) -> Result<(), SurfaceError>;

    /// Press a named key (Enter, Escape, ...) with the element focused.
    async fn press_key(&self, selector: &str, key: &str) -> Result<(), SurfaceError>;

    async fn click(&self, selector: &str) -> Result<(), SurfaceError>;

    /// Create (or re-create) the injected affordance root and fill it. The
    /// root is parented under `container` when one is given and still live,
    /// under `<body>` otherwise.
    async fn inject_affordance(
        &self,
        anchor_id: &str,
        container: Option<&str>,
        markup: &str,
    ) -> Result<(), SurfaceError>;

    /// Refresh the affordance contents if the root still exists.
    async fn update_affordance(&self, anchor_id: &str, markup: &str) -> Result<(), SurfaceError>;

    async fn affordance_present(&self, anchor_id: &str) -> Result<bool, SurfaceError>;
}
