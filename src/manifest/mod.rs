//! Extension manifest schema.
//!
//! Only the fields live reload reads or writes are modeled; everything else
//! is kept in `extra` maps and written back untouched, in its original order.
//! Every modeled field is optional: a manifest missing any of them is still
//! patchable.
//!
//! | Field                                   | Use                            |
//! |-----------------------------------------|--------------------------------|
//! | `name`                                  | debug target lookup            |
//! | `key`                                   | identity pinning (written)     |
//! | `content_security_policy`               | `connect-src` edit (written)   |
//! | `background.service_worker` / `scripts` | reload client injection        |
//! | `action.default_popup`                  | reported UI page               |
//! | `options_page` / `options_ui.page`      | reported UI page               |

pub mod csp;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use csp::{CspEdit, allow_connect};

/// Manifest parse/serialize failure.
#[derive(Debug, Error)]
#[error("invalid manifest JSON")]
pub struct ManifestError(#[from] serde_json::Error);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_version: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_security_policy: Option<ContentSecurityPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_page: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_ui: Option<OptionsUi>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// MV2 uses a bare policy string, MV3 an object keyed by context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentSecurityPolicy {
    Legacy(String),
    Contexts {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension_pages: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Background {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_worker: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_popup: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsUi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec_pretty(&self) -> Result<Vec<u8>, ManifestError> {
        let mut out = serde_json::to_vec_pretty(self)?;
        out.push(b'\n');
        Ok(out)
    }

    /// Service worker script of an MV3 background, if declared.
    pub fn service_worker(&self) -> Option<&str> {
        self.background.as_ref()?.service_worker.as_deref()
    }

    /// Options page from either `options_ui.page` or `options_page`.
    pub fn options_page(&self) -> Option<&str> {
        self.options_ui
            .as_ref()
            .and_then(|ui| ui.page.as_deref())
            .or(self.options_page.as_deref())
    }

    pub fn popup_page(&self) -> Option<&str> {
        self.action.as_ref()?.default_popup.as_deref()
    }

    /// Allow `origin` in the extension pages' `connect-src`.
    ///
    /// Returns `None` when the manifest declares no policy for extension
    /// pages; the browser default leaves `connect-src` unrestricted.
    pub fn allow_connect(&mut self, origin: &str) -> Option<CspEdit> {
        let policy = match self.content_security_policy.as_mut()? {
            ContentSecurityPolicy::Legacy(policy) => policy,
            ContentSecurityPolicy::Contexts {
                extension_pages, ..
            } => extension_pages.as_mut()?,
        };

        let (patched, edit) = csp::allow_connect(policy, origin);
        *policy = patched;
        Some(edit)
    }

    /// Add `script` to MV2 `background.scripts` unless already listed.
    ///
    /// Returns whether the list exists.
    pub fn add_background_script(&mut self, script: &str) -> bool {
        let Some(scripts) = self
            .background
            .as_mut()
            .and_then(|bg| bg.scripts.as_mut())
        else {
            return false;
        };
        if !scripts.iter().any(|s| s == script) {
            scripts.insert(0, script.to_string());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MV3: &str = r#"{
        "manifest_version": 3,
        "name": "Script IDE",
        "version": "1.2.0",
        "background": { "service_worker": "background.js", "type": "module" },
        "action": { "default_popup": "popup.html", "default_icon": "icon.png" },
        "options_ui": { "page": "options.html", "open_in_tab": true },
        "content_security_policy": {
            "extension_pages": "script-src 'self'; connect-src 'self'",
            "sandbox": "sandbox allow-scripts"
        },
        "permissions": ["storage"]
    }"#;

    #[test]
    fn test_parse_mv3() {
        let manifest = Manifest::from_slice(MV3.as_bytes()).unwrap();
        assert_eq!(manifest.manifest_version, Some(3));
        assert_eq!(manifest.name.as_deref(), Some("Script IDE"));
        assert_eq!(manifest.service_worker(), Some("background.js"));
        assert_eq!(manifest.popup_page(), Some("popup.html"));
        assert_eq!(manifest.options_page(), Some("options.html"));
        assert!(manifest.extra.contains_key("permissions"));
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let manifest = Manifest::from_slice(MV3.as_bytes()).unwrap();
        let out: Value = serde_json::from_slice(&manifest.to_vec_pretty().unwrap()).unwrap();

        assert_eq!(out["version"], "1.2.0");
        assert_eq!(out["permissions"][0], "storage");
        assert_eq!(out["background"]["type"], "module");
        assert_eq!(out["action"]["default_icon"], "icon.png");
        assert_eq!(out["options_ui"]["open_in_tab"], true);
        assert_eq!(
            out["content_security_policy"]["sandbox"],
            "sandbox allow-scripts"
        );
        assert!(out.get("key").is_none());
    }

    #[test]
    fn test_minimal_manifest() {
        let manifest = Manifest::from_slice(br#"{"name": "x"}"#).unwrap();
        assert!(manifest.service_worker().is_none());
        assert!(manifest.options_page().is_none());
        assert!(manifest.content_security_policy.is_none());
    }

    #[test]
    fn test_invalid_json() {
        assert!(Manifest::from_slice(b"{ not json").is_err());
    }

    #[test]
    fn test_allow_connect_mv3() {
        let mut manifest = Manifest::from_slice(MV3.as_bytes()).unwrap();
        let edit = manifest.allow_connect("ws://localhost:8081");
        assert_eq!(edit, Some(CspEdit::Extended));

        let Some(ContentSecurityPolicy::Contexts {
            extension_pages: Some(policy),
            ..
        }) = &manifest.content_security_policy
        else {
            panic!("expected MV3 policy");
        };
        assert_eq!(
            policy,
            "script-src 'self'; connect-src 'self' ws://localhost:8081"
        );
    }

    #[test]
    fn test_allow_connect_mv2_string() {
        let mut manifest = Manifest::from_slice(
            br#"{"manifest_version": 2, "content_security_policy": "script-src 'self'"}"#,
        )
        .unwrap();
        assert_eq!(
            manifest.allow_connect("ws://localhost:8081"),
            Some(CspEdit::Added)
        );

        let out: Value = serde_json::from_slice(&manifest.to_vec_pretty().unwrap()).unwrap();
        assert_eq!(
            out["content_security_policy"],
            "script-src 'self'; connect-src 'self' ws://localhost:8081"
        );
    }

    #[test]
    fn test_allow_connect_without_policy() {
        let mut manifest = Manifest::from_slice(br#"{"name": "x"}"#).unwrap();
        assert_eq!(manifest.allow_connect("ws://localhost:8081"), None);

        let mut manifest =
            Manifest::from_slice(br#"{"content_security_policy": {"sandbox": "x"}}"#).unwrap();
        assert_eq!(manifest.allow_connect("ws://localhost:8081"), None);
    }

    #[test]
    fn test_add_background_script() {
        let mut manifest =
            Manifest::from_slice(br#"{"background": {"scripts": ["bg.js"]}}"#).unwrap();
        assert!(manifest.add_background_script("extreload-client.js"));
        assert!(manifest.add_background_script("extreload-client.js"));
        let scripts = manifest.background.as_ref().unwrap().scripts.as_ref().unwrap();
        assert_eq!(scripts, &["extreload-client.js", "bg.js"]);

        let mut mv3 = Manifest::from_slice(MV3.as_bytes()).unwrap();
        assert!(!mv3.add_background_script("extreload-client.js"));
    }
}
