//! Chrome DevTools Protocol implementation of [`Surface`].
//!
//! Content writes go through in-page script so the foreign framework's own
//! change detection observes them (insertText + input/change events);
//! keystrokes go through the low-level Input domain so surfaces that only arm
//! on real key events see what they expect.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::Page;
use serde_json::Value;
use tracing::debug;

use super::{EditorKind, Surface};
use crate::error::SurfaceError;

pub struct CdpSurface {
    page: Page,
}

impl CdpSurface {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval(&self, js: String) -> Result<Value, SurfaceError> {
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| SurfaceError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn focus(&self, selector: &str) -> Result<(), SurfaceError> {
        let element = self.page.find_element(selector).await?;
        element.focus().await?;
        Ok(())
    }
}

/// Embed a Rust string into a script as a JSON literal.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl Surface for CdpSurface {
    async fn exists(&self, selector: &str) -> Result<bool, SurfaceError> {
        let js = format!(
            "document.querySelector({}) !== null",
            js_str(selector)
        );
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }

    async fn editor_kind(&self, selector: &str) -> Result<EditorKind, SurfaceError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return null;
                if (el.tagName === 'TEXTAREA' || el.tagName === 'INPUT') return 'plain';
                return 'structured';
            }})()"#,
            js_str(selector)
        );
        match self.eval(js).await?.as_str() {
            Some("plain") => Ok(EditorKind::PlainValue),
            Some("structured") => Ok(EditorKind::Structured),
            _ => Err(SurfaceError::Interaction(format!(
                "no editor element at {}",
                selector
            ))),
        }
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>, SurfaceError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return null;
                if (el.tagName === 'TEXTAREA' || el.tagName === 'INPUT') return el.value;
                return el.innerText;
            }})()"#,
            js_str(selector)
        );
        Ok(self.eval(js).await?.as_str().map(|s| s.to_string()))
    }

    async fn control_label(&self, selector: &str) -> Result<Option<String>, SurfaceError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return null;
                return el.getAttribute('aria-label') || el.innerText || null;
            }})()"#,
            js_str(selector)
        );
        Ok(self.eval(js).await?.as_str().map(|s| s.to_string()))
    }

    async fn set_plain_value(&self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.focus();
                el.value = {text};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                if (el.setSelectionRange) {{
                    el.setSelectionRange(el.value.length, el.value.length);
                }}
                return true;
            }})()"#,
            sel = js_str(selector),
            text = js_str(text),
        );
        if self.eval(js).await?.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(SurfaceError::Interaction(format!(
                "plain editor vanished at {}",
                selector
            )))
        }
    }

    async fn write_rich_text(&self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.focus();
                const payload = {text};
                if (payload === "") {{
                    el.innerHTML = "";
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    return true;
                }}
                const range = document.createRange();
                range.selectNodeContents(el);
                const sel = window.getSelection();
                sel.removeAllRanges();
                sel.addRange(range);
                document.execCommand('insertText', false, payload);
                if (el.innerText.trim() === "") {{
                    el.innerText = payload;
                }}
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = js_str(selector),
            text = js_str(text),
        );
        if self.eval(js).await?.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(SurfaceError::Interaction(format!(
                "structured editor vanished at {}",
                selector
            )))
        }
    }

    async fn synthesize_keystroke(&self, selector: &str, ch: char) -> Result<(), SurfaceError> {
        self.focus(selector).await?;
        let text = ch.to_string();

        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(text.clone())
            .text(text.clone())
            .unmodified_text(text.clone())
            .build()
            .unwrap();
        self.page.execute(down).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(text)
            .build()
            .unwrap();
        self.page.execute(up).await?;

        debug!("synthesized keystroke {:?} into {}", ch, selector);
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<(), SurfaceError> {
        let element = self.page.find_element(selector).await?;
        element.press_key(key).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), SurfaceError> {
        let element = self.page.find_element(selector).await?;
        element.scroll_into_view().await?;
        element.click().await?;
        Ok(())
    }

    async fn inject_affordance(
        &self,
        anchor_id: &str,
        container: Option<&str>,
        markup: &str,
    ) -> Result<(), SurfaceError> {
        let js = format!(
            r#"(() => {{
                let root = document.getElementById({id});
                if (!root) {{
                    root = document.createElement('div');
                    root.id = {id};
                    const host = {container} ? document.querySelector({container}) : null;
                    (host || document.body).appendChild(root);
                }}
                root.innerHTML = {markup};
                return true;
            }})()"#,
            id = js_str(anchor_id),
            container = container.map(js_str).unwrap_or_else(|| "null".to_string()),
            markup = js_str(markup),
        );
        if self.eval(js).await?.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(SurfaceError::Script(format!(
                "affordance injection failed for #{}",
                anchor_id
            )))
        }
    }

    async fn update_affordance(&self, anchor_id: &str, markup: &str) -> Result<(), SurfaceError> {
        let js = format!(
            r#"(() => {{
                const root = document.getElementById({id});
                if (!root) return false;
                root.innerHTML = {markup};
                return true;
            }})()"#,
            id = js_str(anchor_id),
            markup = js_str(markup),
        );
        // A missing root here is not an error: the monitor owns recovery.
        let _ = self.eval(js).await?;
        Ok(())
    }

    async fn affordance_present(&self, anchor_id: &str) -> Result<bool, SurfaceError> {
        let js = format!(
            "document.getElementById({}) !== null",
            js_str(anchor_id)
        );
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }
}
