//! In-memory surface for tests: scripted presence/label sequences, recorded
//! writes, and an optional dropped-keystroke fault to exercise the
//! re-synthesis path.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{EditorKind, Surface};
use crate::error::SurfaceError;

#[derive(Default)]
pub struct FakeSurface {
    pub present: Mutex<HashSet<String>>,
    pub editor_kinds: Mutex<HashMap<String, EditorKind>>,
    pub texts: Mutex<HashMap<String, String>>,
    /// Scripted label sequence per selector; the last entry repeats forever.
    pub labels: Mutex<HashMap<String, VecDeque<String>>>,
    /// Scripted presence sequence for the affordance root; last entry repeats.
    pub anchor_script: Mutex<VecDeque<bool>>,
    pub clicks: Mutex<Vec<String>>,
    pub keys: Mutex<Vec<(String, String)>>,
    pub synthesized: Mutex<Vec<(String, char)>>,
    pub plain_writes: Mutex<Vec<(String, String)>>,
    pub rich_writes: Mutex<Vec<(String, String)>>,
    pub affordances: Mutex<HashMap<String, String>>,
    /// Container selector passed to each injection, if any.
    pub injection_hosts: Mutex<Vec<Option<String>>>,
    /// How many upcoming synthesized keystrokes to silently drop.
    pub drop_keystrokes: Mutex<u32>,
    pub fail_clicks: Mutex<bool>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&self, selector: &str) {
        self.present.lock().unwrap().insert(selector.to_string());
    }

    pub fn remove_element(&self, selector: &str) {
        self.present.lock().unwrap().remove(selector);
    }

    pub fn add_editor(&self, selector: &str, kind: EditorKind, text: &str) {
        self.add_element(selector);
        self.editor_kinds
            .lock()
            .unwrap()
            .insert(selector.to_string(), kind);
        self.texts
            .lock()
            .unwrap()
            .insert(selector.to_string(), text.to_string());
    }

    pub fn script_labels(&self, selector: &str, labels: &[&str]) {
        self.add_element(selector);
        self.labels.lock().unwrap().insert(
            selector.to_string(),
            labels.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn script_anchor(&self, states: &[bool]) {
        *self.anchor_script.lock().unwrap() = states.iter().copied().collect();
    }

    pub fn text_of(&self, selector: &str) -> String {
        self.texts
            .lock()
            .unwrap()
            .get(selector)
            .cloned()
            .unwrap_or_default()
    }

    pub fn synth_count(&self) -> usize {
        self.synthesized.lock().unwrap().len()
    }

    fn next_scripted<T: Copy>(queue: &mut VecDeque<T>) -> Option<T> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        }
    }
}

#[async_trait]
impl Surface for FakeSurface {
    async fn exists(&self, selector: &str) -> Result<bool, SurfaceError> {
        Ok(self.present.lock().unwrap().contains(selector))
    }

    async fn editor_kind(&self, selector: &str) -> Result<EditorKind, SurfaceError> {
        self.editor_kinds
            .lock()
            .unwrap()
            .get(selector)
            .copied()
            .ok_or_else(|| SurfaceError::Interaction(format!("no editor at {}", selector)))
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>, SurfaceError> {
        Ok(self.texts.lock().unwrap().get(selector).cloned())
    }

    async fn control_label(&self, selector: &str) -> Result<Option<String>, SurfaceError> {
        if !self.present.lock().unwrap().contains(selector) {
            return Ok(None);
        }
        let mut labels = self.labels.lock().unwrap();
        let Some(queue) = labels.get_mut(selector) else {
            return Ok(None);
        };
        let label = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(label)
    }

    async fn set_plain_value(&self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        self.plain_writes
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        self.texts
            .lock()
            .unwrap()
            .insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn write_rich_text(&self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        self.rich_writes
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        self.texts
            .lock()
            .unwrap()
            .insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn synthesize_keystroke(&self, selector: &str, ch: char) -> Result<(), SurfaceError> {
        self.synthesized
            .lock()
            .unwrap()
            .push((selector.to_string(), ch));
        let mut drops = self.drop_keystrokes.lock().unwrap();
        if *drops > 0 {
            *drops -= 1;
            return Ok(());
        }
        self.texts
            .lock()
            .unwrap()
            .entry(selector.to_string())
            .or_default()
            .push(ch);
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<(), SurfaceError> {
        self.keys
            .lock()
            .unwrap()
            .push((selector.to_string(), key.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), SurfaceError> {
        if *self.fail_clicks.lock().unwrap() {
            return Err(SurfaceError::Interaction("click rejected".to_string()));
        }
        self.clicks.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn inject_affordance(
        &self,
        anchor_id: &str,
        container: Option<&str>,
        markup: &str,
    ) -> Result<(), SurfaceError> {
        self.injection_hosts
            .lock()
            .unwrap()
            .push(container.map(|s| s.to_string()));
        self.affordances
            .lock()
            .unwrap()
            .insert(anchor_id.to_string(), markup.to_string());
        Ok(())
    }

    async fn update_affordance(&self, anchor_id: &str, markup: &str) -> Result<(), SurfaceError> {
        let mut affordances = self.affordances.lock().unwrap();
        if let Some(slot) = affordances.get_mut(anchor_id) {
            *slot = markup.to_string();
        }
        Ok(())
    }

    async fn affordance_present(&self, anchor_id: &str) -> Result<bool, SurfaceError> {
        let mut script = self.anchor_script.lock().unwrap();
        if let Some(state) = Self::next_scripted(&mut script) {
            return Ok(state);
        }
        Ok(self.affordances.lock().unwrap().contains_key(anchor_id))
    }
}
