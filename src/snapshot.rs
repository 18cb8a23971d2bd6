//! Page state preserved across a client-initiated reload.
//!
//! Just before reloading a page the client captures scroll position and
//! form control state into a per-extension storage slot; on the next load
//! the slot is read once, deleted, and applied if the URL still matches.
//!
//! The JS client (`embed/client/reload-client.js`) implements these exact
//! rules against the real DOM. This module owns the wire format, the
//! storage key scheme, and a DOM-agnostic implementation of capture/restore
//! behind [`PageDom`] so the rules are pinned down by tests.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Storage key prefix; the full key is `<prefix>:<extension id>`.
pub const SNAPSHOT_KEY_PREFIX: &str = "extreload:snapshot";

/// Storage slot for an extension's snapshot.
pub fn storage_key(extension_id: &str) -> String {
    format!("{SNAPSHOT_KEY_PREFIX}:{extension_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStateSnapshot {
    pub url: String,
    pub scroll_x: f64,
    pub scroll_y: f64,
    /// Controls in document order.
    pub inputs: Vec<InputState>,
}

/// One saved form control. Text-like controls carry `value`, checkboxes
/// carry `checked`, radios carry both (the value tells siblings apart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Checkbox,
    Radio,
    Password,
    File,
    /// Value owned by the page script, not the user.
    Hidden,
    /// `submit`, `button`, `reset` and `image` inputs.
    Button,
}

impl ControlKind {
    /// `type` values of inputs that are never saved. Rendered into the client.
    pub const SKIPPED_TYPES: &[&str] =
        &["password", "file", "hidden", "submit", "button", "reset", "image"];

    /// Kind of an input with the given `type` attribute.
    pub fn from_type(ty: &str) -> Self {
        match ty {
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "password" => Self::Password,
            "file" => Self::File,
            "hidden" => Self::Hidden,
            "submit" | "button" | "reset" | "image" => Self::Button,
            _ => Self::Text,
        }
    }

    pub fn is_saved(self) -> bool {
        !matches!(
            self,
            Self::Password | Self::File | Self::Hidden | Self::Button
        )
    }
}

/// A form control as seen through [`PageDom`].
#[derive(Debug, Clone, PartialEq)]
pub struct FormControl {
    pub id: Option<String>,
    pub name: Option<String>,
    pub kind: ControlKind,
    pub value: String,
    pub checked: bool,
}

impl FormControl {
    fn is_restorable(&self) -> bool {
        (self.id.is_some() || self.name.is_some()) && self.kind.is_saved()
    }

    fn to_state(&self) -> InputState {
        let (value, checked) = match self.kind {
            ControlKind::Checkbox => (None, Some(self.checked)),
            ControlKind::Radio => (Some(self.value.clone()), Some(self.checked)),
            _ => (Some(self.value.clone()), None),
        };
        InputState {
            id: self.id.clone(),
            name: self.name.clone(),
            value,
            checked,
        }
    }

    fn apply(&mut self, state: &InputState) {
        if let Some(checked) = state.checked {
            self.checked = checked;
        } else if let Some(ref value) = state.value {
            self.value.clone_from(value);
        }
    }
}

/// The slice of a document that snapshots read and write.
pub trait PageDom {
    fn url(&self) -> &str;
    fn scroll(&self) -> (f64, f64);
    fn scroll_to(&mut self, x: f64, y: f64);
    fn controls(&self) -> &[FormControl];
    fn controls_mut(&mut self) -> &mut [FormControl];
}

/// Key-value storage holding snapshot slots (`localStorage` in the client).
pub trait SnapshotStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

impl SnapshotStore for FxHashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        FxHashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        FxHashMap::remove(self, key);
    }
}

/// Result of a restore attempt. The slot is gone afterwards in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No snapshot stored.
    Empty,
    /// Stored data was not a snapshot.
    Invalid,
    /// Snapshot belongs to a different URL.
    UrlMismatch,
    /// Scroll restored and `inputs` controls updated.
    Restored { inputs: usize },
}

/// Capture the current page state.
pub fn capture(page: &impl PageDom) -> PageStateSnapshot {
    let (scroll_x, scroll_y) = page.scroll();
    PageStateSnapshot {
        url: page.url().to_string(),
        scroll_x,
        scroll_y,
        inputs: page
            .controls()
            .iter()
            .filter(|c| c.is_restorable())
            .map(FormControl::to_state)
            .collect(),
    }
}

/// Write `snapshot` into the extension's slot, replacing any previous one.
pub fn save(
    store: &mut impl SnapshotStore,
    extension_id: &str,
    snapshot: &PageStateSnapshot,
) -> serde_json::Result<()> {
    let json = serde_json::to_string(snapshot)?;
    store.set(&storage_key(extension_id), json);
    Ok(())
}

/// Consume the extension's slot and apply it to `page`.
pub fn restore(
    store: &mut impl SnapshotStore,
    extension_id: &str,
    page: &mut impl PageDom,
) -> RestoreOutcome {
    let key = storage_key(extension_id);
    let Some(raw) = store.get(&key) else {
        return RestoreOutcome::Empty;
    };
    store.remove(&key);

    let Ok(snapshot) = serde_json::from_str::<PageStateSnapshot>(&raw) else {
        return RestoreOutcome::Invalid;
    };
    if snapshot.url != page.url() {
        return RestoreOutcome::UrlMismatch;
    }

    let mut applied = 0;
    for state in &snapshot.inputs {
        if let Some(control) = find_control(page.controls_mut(), state) {
            control.apply(state);
            applied += 1;
        }
    }
    page.scroll_to(snapshot.scroll_x, snapshot.scroll_y);

    RestoreOutcome::Restored { inputs: applied }
}

/// Match by id first, then by name (radios also by value).
fn find_control<'a>(
    controls: &'a mut [FormControl],
    state: &InputState,
) -> Option<&'a mut FormControl> {
    let by_id = state
        .id
        .as_ref()
        .and_then(|id| controls.iter().position(|c| c.id.as_ref() == Some(id)));

    let index = by_id.or_else(|| {
        let name = state.name.as_ref()?;
        let is_radio = state.checked.is_some() && state.value.is_some();
        controls.iter().position(|c| {
            c.name.as_ref() == Some(name) && (!is_radio || Some(&c.value) == state.value.as_ref())
        })
    })?;

    controls.get_mut(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXT_ID: &str = "abcdefghijklmnopabcdefghijklmnop";

    #[derive(Debug, Default)]
    struct MemoryPage {
        url: String,
        scroll: (f64, f64),
        controls: Vec<FormControl>,
    }

    impl PageDom for MemoryPage {
        fn url(&self) -> &str {
            &self.url
        }
        fn scroll(&self) -> (f64, f64) {
            self.scroll
        }
        fn scroll_to(&mut self, x: f64, y: f64) {
            self.scroll = (x, y);
        }
        fn controls(&self) -> &[FormControl] {
            &self.controls
        }
        fn controls_mut(&mut self) -> &mut [FormControl] {
            &mut self.controls
        }
    }

    fn control(id: Option<&str>, name: Option<&str>, kind: ControlKind, value: &str) -> FormControl {
        FormControl {
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            kind,
            value: value.to_string(),
            checked: false,
        }
    }

    fn page(url: &str, controls: Vec<FormControl>) -> MemoryPage {
        MemoryPage {
            url: url.to_string(),
            scroll: (0.0, 0.0),
            controls,
        }
    }

    #[test]
    fn test_restore_round_trip_then_consumed() {
        let mut before = page(
            "https://x",
            vec![control(Some("a"), None, ControlKind::Text, "hello")],
        );
        before.scroll = (10.0, 20.0);

        let mut store = FxHashMap::default();
        save(&mut store, EXT_ID, &capture(&before)).unwrap();

        let mut fresh = page(
            "https://x",
            vec![control(Some("a"), None, ControlKind::Text, "")],
        );
        assert_eq!(
            restore(&mut store, EXT_ID, &mut fresh),
            RestoreOutcome::Restored { inputs: 1 }
        );
        assert_eq!(fresh.controls[0].value, "hello");
        assert_eq!(fresh.scroll, (10.0, 20.0));

        // Second attempt against the same slot does nothing
        fresh.controls[0].value = "edited".into();
        fresh.scroll = (0.0, 0.0);
        assert_eq!(restore(&mut store, EXT_ID, &mut fresh), RestoreOutcome::Empty);
        assert_eq!(fresh.controls[0].value, "edited");
        assert_eq!(fresh.scroll, (0.0, 0.0));
    }

    #[test]
    fn test_wire_format() {
        let snapshot = PageStateSnapshot {
            url: "https://x".into(),
            scroll_x: 10.0,
            scroll_y: 20.0,
            inputs: vec![InputState {
                id: Some("a".into()),
                name: None,
                value: Some("hello".into()),
                checked: None,
            }],
        };
        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["scrollX"], 10.0);
        assert_eq!(json["scrollY"], 20.0);
        assert_eq!(json["inputs"][0]["id"], "a");
        assert!(json["inputs"][0]["name"].is_null());
        assert!(json["inputs"][0].get("checked").is_none());

        // Shape written by the JS client
        let from_js: PageStateSnapshot = serde_json::from_str(
            r#"{"url":"https://x","scrollX":0,"scrollY":5,"inputs":[{"id":null,"name":"agree","checked":true}]}"#,
        )
        .unwrap();
        assert_eq!(from_js.inputs[0].checked, Some(true));
        assert_eq!(from_js.inputs[0].value, None);
    }

    #[test]
    fn test_capture_skips_sensitive_and_anonymous_controls() {
        let mut agree = control(None, Some("agree"), ControlKind::Checkbox, "on");
        agree.checked = true;
        let before = page(
            "https://x",
            vec![
                control(Some("user"), None, ControlKind::Text, "bob"),
                control(Some("pw"), None, ControlKind::Password, "secret"),
                control(Some("upload"), None, ControlKind::File, "C:\\x"),
                control(None, None, ControlKind::Text, "anonymous"),
                control(Some("csrf"), None, ControlKind::Hidden, "token-1"),
                control(None, Some("go"), ControlKind::Button, "Submit"),
                agree,
            ],
        );

        let snapshot = capture(&before);
        assert_eq!(snapshot.inputs.len(), 2);
        assert_eq!(snapshot.inputs[0].value.as_deref(), Some("bob"));
        assert_eq!(snapshot.inputs[1].checked, Some(true));
        assert_eq!(snapshot.inputs[1].value, None);
    }

    #[test]
    fn test_restore_by_name_and_radio_value() {
        let mut red = control(None, Some("color"), ControlKind::Radio, "red");
        let mut blue = control(None, Some("color"), ControlKind::Radio, "blue");
        blue.checked = true;
        let before = page(
            "https://x",
            vec![
                control(None, Some("q"), ControlKind::Text, "query"),
                red.clone(),
                blue.clone(),
            ],
        );

        let mut store = FxHashMap::default();
        save(&mut store, EXT_ID, &capture(&before)).unwrap();

        red.checked = false;
        blue.checked = false;
        let mut fresh = page(
            "https://x",
            vec![control(None, Some("q"), ControlKind::Text, ""), red, blue],
        );
        assert_eq!(
            restore(&mut store, EXT_ID, &mut fresh),
            RestoreOutcome::Restored { inputs: 3 }
        );
        assert_eq!(fresh.controls[0].value, "query");
        assert!(!fresh.controls[1].checked);
        assert!(fresh.controls[2].checked);
    }

    #[test]
    fn test_url_mismatch_still_consumes_slot() {
        let before = page(
            "https://x/options.html",
            vec![control(Some("a"), None, ControlKind::Text, "hello")],
        );
        let mut store = FxHashMap::default();
        save(&mut store, EXT_ID, &capture(&before)).unwrap();

        let mut other = page(
            "https://x/popup.html",
            vec![control(Some("a"), None, ControlKind::Text, "")],
        );
        assert_eq!(
            restore(&mut store, EXT_ID, &mut other),
            RestoreOutcome::UrlMismatch
        );
        assert_eq!(other.controls[0].value, "");
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_slot() {
        let mut store = FxHashMap::default();
        store.insert(storage_key(EXT_ID), "{oops".to_string());
        let mut p = page("https://x", Vec::new());
        assert_eq!(restore(&mut store, EXT_ID, &mut p), RestoreOutcome::Invalid);
        assert!(store.is_empty());
    }

    #[test]
    fn test_slots_are_per_extension() {
        let before = page("https://x", Vec::new());
        let mut store = FxHashMap::default();
        save(&mut store, EXT_ID, &capture(&before)).unwrap();

        let mut p = page("https://x", Vec::new());
        assert_eq!(
            restore(&mut store, "pppppppppppppppppppppppppppppppp", &mut p),
            RestoreOutcome::Empty
        );
        assert_eq!(store.len(), 1);
        assert_eq!(storage_key(EXT_ID), format!("extreload:snapshot:{EXT_ID}"));
    }

    #[test]
    fn test_skipped_types_match_kinds() {
        for ty in ControlKind::SKIPPED_TYPES {
            assert!(!ControlKind::from_type(ty).is_saved(), "{ty}");
        }
        for ty in ["text", "email", "number", "checkbox", "radio", "range", ""] {
            assert!(ControlKind::from_type(ty).is_saved(), "{ty}");
        }
    }

    #[test]
    fn test_rendered_client_follows_model() {
        use crate::embed::client::{ClientVars, RELOAD_CLIENT_JS};

        let js = RELOAD_CLIENT_JS.render(&ClientVars::new(8081));

        let snapshot = PageStateSnapshot {
            url: "https://x".into(),
            scroll_x: 0.0,
            scroll_y: 0.0,
            inputs: vec![InputState {
                id: Some("a".into()),
                name: Some("b".into()),
                value: Some("c".into()),
                checked: Some(true),
            }],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        for key in json.as_object().unwrap().keys() {
            assert!(js.contains(&format!("snapshot.{key}")), "client never reads `{key}`");
        }
        for key in json["inputs"][0].as_object().unwrap().keys() {
            assert!(js.contains(&format!("entry.{key}")), "client never uses `{key}`");
        }

        let skipped = serde_json::to_string(ControlKind::SKIPPED_TYPES).unwrap();
        assert!(js.contains(&format!("const SKIPPED_TYPES = {skipped};")));
        assert!(js.contains("!SKIPPED_TYPES.includes(el.type)"));

        assert_eq!(storage_key(EXT_ID), format!("{SNAPSHOT_KEY_PREFIX}:{EXT_ID}"));
        assert!(js.contains(&format!("const SNAPSHOT_PREFIX = \"{SNAPSHOT_KEY_PREFIX}\";")));
        assert!(js.contains("SNAPSHOT_PREFIX + \":\" + (extensionId"));
    }
}
