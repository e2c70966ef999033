//! Insertion strategies.
//!
//! Which writing protocol a payload gets depends on what the editor is and
//! what the foreign surface needs to observe:
//! - plain value editors take a direct value assignment plus input/change
//!   events so reactive listeners recompute;
//! - structured editors get the bulk write through in-page insertText, with
//!   the final character synthesized as a real keystroke because the foreign
//!   auto-resize logic keys off genuine key events;
//! - an empty editor about to be auto-submitted is typed key by key, since
//!   some surfaces only arm their submit control after a real key sequence.
//!
//! Every write restarts from the baseline captured on entry, so a retried
//! insertion can never duplicate text.

use tracing::{debug, warn};

use crate::error::RelayError;
use crate::profiles::{Role, SiteProfile};
use crate::resolve::resolve;
use crate::settings::SettingsClient;
use crate::surface::{EditorKind, Surface};

/// Payloads above this always take the bulk path, bounding synthesis cost.
pub const BULK_THRESHOLD_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionStrategy {
    /// Direct value assignment + events, caret to end.
    ReplaceValue,
    /// Bulk write of all but the last character, final character synthesized
    /// and verified.
    BulkPlusFinalKey,
    /// Every character synthesized as a real keystroke.
    FullSynthesis,
}

pub fn choose_strategy(
    kind: EditorKind,
    baseline_empty: bool,
    auto_send: bool,
    payload_chars: usize,
) -> InsertionStrategy {
    match kind {
        EditorKind::PlainValue => InsertionStrategy::ReplaceValue,
        EditorKind::Structured => {
            if payload_chars > BULK_THRESHOLD_CHARS {
                InsertionStrategy::BulkPlusFinalKey
            } else if baseline_empty && auto_send {
                InsertionStrategy::FullSynthesis
            } else {
                InsertionStrategy::BulkPlusFinalKey
            }
        }
    }
}

pub async fn insert_payload(
    surface: &dyn Surface,
    profile: &SiteProfile,
    settings: Option<&SettingsClient>,
    text: &str,
    auto_send: bool,
) -> Result<(), RelayError> {
    if text.is_empty() {
        return Ok(());
    }

    let target = resolve(surface, Role::Editor, profile, settings)
        .await
        .ok_or_else(|| RelayError::InsertionFailed("no editor matched any selector".to_string()))?;
    let editor = target.selector;

    let kind = surface
        .editor_kind(&editor)
        .await
        .map_err(|e| RelayError::InsertionFailed(e.to_string()))?;
    let baseline = surface
        .read_text(&editor)
        .await
        .map_err(|e| RelayError::InsertionFailed(e.to_string()))?
        .unwrap_or_default();
    let baseline_empty = baseline.trim().is_empty();

    let strategy = choose_strategy(kind, baseline_empty, auto_send, text.chars().count());
    debug!(
        "inserting {} chars into {} via {:?}",
        text.chars().count(),
        editor,
        strategy
    );

    match strategy {
        InsertionStrategy::ReplaceValue => {
            let full = format!("{}{}", baseline, text);
            surface
                .set_plain_value(&editor, &full)
                .await
                .map_err(|e| RelayError::InsertionFailed(e.to_string()))?;
            Ok(())
        }
        InsertionStrategy::BulkPlusFinalKey => {
            bulk_plus_final_key(surface, &editor, &baseline, baseline_empty, text).await
        }
        InsertionStrategy::FullSynthesis => full_synthesis(surface, &editor, text).await,
    }
}

async fn bulk_plus_final_key(
    surface: &dyn Surface,
    editor: &str,
    baseline: &str,
    baseline_empty: bool,
    text: &str,
) -> Result<(), RelayError> {
    let mut chars = text.chars();
    // `text` is non-empty here.
    let Some(last) = chars.next_back() else {
        return Ok(());
    };
    let head = chars.as_str();

    // Placeholder markup in an empty editor is cleared by the whole-content
    // rewrite; a non-empty editor keeps its baseline as the prefix.
    let bulk = if baseline_empty {
        head.to_string()
    } else {
        format!("{}{}", baseline, head)
    };
    let expected = format!("{}{}", bulk, last);

    surface
        .write_rich_text(editor, &bulk)
        .await
        .map_err(|e| RelayError::InsertionFailed(e.to_string()))?;
    surface
        .synthesize_keystroke(editor, last)
        .await
        .map_err(|e| RelayError::InsertionFailed(e.to_string()))?;

    if content_matches(surface, editor, &expected).await {
        return Ok(());
    }

    // The foreign surface can race a re-render against the synthetic event
    // and drop it. One more attempt, restarting from the known bulk content.
    warn!("final keystroke did not persist in {}, retrying once", editor);
    surface
        .write_rich_text(editor, &bulk)
        .await
        .map_err(|e| RelayError::InsertionFailed(e.to_string()))?;
    surface
        .synthesize_keystroke(editor, last)
        .await
        .map_err(|e| RelayError::InsertionFailed(e.to_string()))?;

    if content_matches(surface, editor, &expected).await {
        Ok(())
    } else {
        Err(RelayError::InsertionFailed(
            "final keystroke did not persist after retry".to_string(),
        ))
    }
}

async fn full_synthesis(
    surface: &dyn Surface,
    editor: &str,
    text: &str,
) -> Result<(), RelayError> {
    // Clear any placeholder markup before the first real keystroke.
    surface
        .write_rich_text(editor, "")
        .await
        .map_err(|e| RelayError::InsertionFailed(e.to_string()))?;

    for ch in text.chars() {
        surface
            .synthesize_keystroke(editor, ch)
            .await
            .map_err(|e| RelayError::InsertionFailed(e.to_string()))?;
    }

    if content_matches(surface, editor, text).await {
        Ok(())
    } else {
        Err(RelayError::InsertionFailed(
            "synthesized content did not persist".to_string(),
        ))
    }
}

async fn content_matches(surface: &dyn Surface, editor: &str, expected: &str) -> bool {
    match surface.read_text(editor).await {
        Ok(Some(content)) => content == expected,
        _ => false,
    }
}
