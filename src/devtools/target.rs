//! Remote-debugging targets as listed by `GET /json`.

use serde::Deserialize;
use url::Url;

use super::TargetResolutionError;

/// Scheme of pages and workers that belong to an extension.
pub const EXTENSION_SCHEME: &str = "chrome-extension";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DevToolsTarget {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Absent while another client is attached to the target.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub debugger_url: Option<String>,
}

impl DevToolsTarget {
    pub fn is_extension_worker(&self) -> bool {
        matches!(self.kind.as_str(), "service_worker" | "background_page")
    }

    pub fn is_page(&self) -> bool {
        self.kind == "page"
    }

    /// Extension id from a `chrome-extension://<id>/...` URL.
    pub fn extension_id(&self) -> Option<String> {
        extension_id_from_url(&self.url)
    }
}

pub fn extension_id_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    if url.scheme() != EXTENSION_SCHEME {
        return None;
    }
    url.host_str().map(str::to_string)
}

/// The extension's worker or background page.
///
/// The title carries the manifest `name`. An exact title match wins over a
/// partial one, so "Foo" is not confused with "Foo Pro" when both are loaded.
pub fn find_extension_target<'a>(
    targets: &'a [DevToolsTarget],
    manifest_name: &str,
) -> Result<&'a DevToolsTarget, TargetResolutionError> {
    let workers = || targets.iter().filter(|t| t.is_extension_worker());

    workers()
        .find(|t| t.title == manifest_name)
        .or_else(|| workers().find(|t| t.title.contains(manifest_name)))
        .ok_or_else(|| TargetResolutionError::NotFound {
            name: manifest_name.to_string(),
            workers: workers().count(),
        })
}

/// First ordinary page, i.e. not one of the extension's own.
pub fn find_active_page(targets: &[DevToolsTarget]) -> Option<&DevToolsTarget> {
    targets
        .iter()
        .find(|t| t.is_page() && !t.url.starts_with(&format!("{EXTENSION_SCHEME}://")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGETS: &str = r#"[
        {
            "description": "",
            "devtoolsFrontendUrl": "/devtools/inspector.html?ws=127.0.0.1:9222/devtools/page/A",
            "id": "A",
            "title": "Script IDE Options",
            "type": "page",
            "url": "chrome-extension://abcdefghijklmnopabcdefghijklmnop/options.html",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/A"
        },
        {
            "id": "B",
            "title": "Service Worker chrome-extension://pppppppppppppppppppppppppppppppp/sw.js",
            "type": "service_worker",
            "url": "chrome-extension://pppppppppppppppppppppppppppppppp/sw.js",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/B"
        },
        {
            "id": "C",
            "title": "Script IDE",
            "type": "service_worker",
            "url": "chrome-extension://abcdefghijklmnopabcdefghijklmnop/background.js",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/C"
        },
        {
            "id": "D",
            "title": "Example Domain",
            "type": "page",
            "url": "https://example.com/"
        }
    ]"#;

    fn targets() -> Vec<DevToolsTarget> {
        serde_json::from_str(TARGETS).unwrap()
    }

    #[test]
    fn test_parse_targets() {
        let targets = targets();
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[2].kind, "service_worker");
        assert_eq!(
            targets[2].debugger_url.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/page/C")
        );
        assert_eq!(targets[3].debugger_url, None);
    }

    #[test]
    fn test_find_extension_target_matches_worker_only() {
        let targets = targets();
        let target = find_extension_target(&targets, "Script IDE").unwrap();
        assert_eq!(target.id, "C");
        assert_eq!(
            target.extension_id().as_deref(),
            Some("abcdefghijklmnopabcdefghijklmnop")
        );
    }

    #[test]
    fn test_find_extension_target_prefers_exact_title() {
        let mut targets = targets();
        targets[1].title = "Script IDE Pro".into();
        targets.swap(1, 2);
        assert_eq!(find_extension_target(&targets, "Script IDE").unwrap().id, "C");
    }

    #[test]
    fn test_find_extension_target_partial_title() {
        let mut targets = targets();
        targets[2].title = "Script IDE (dev)".into();
        assert_eq!(find_extension_target(&targets, "Script IDE").unwrap().id, "C");
    }

    #[test]
    fn test_no_match_is_resolution_error() {
        let err = find_extension_target(&targets(), "Other Extension").unwrap_err();
        assert!(matches!(
            err,
            TargetResolutionError::NotFound { ref name, workers: 2 } if name == "Other Extension"
        ));
    }

    #[test]
    fn test_find_active_page_skips_extension_pages() {
        let targets = targets();
        assert_eq!(find_active_page(&targets).unwrap().id, "D");
        assert!(find_active_page(&targets[..3]).is_none());
    }

    #[test]
    fn test_extension_id_from_url() {
        assert_eq!(
            extension_id_from_url("chrome-extension://abcdefghijklmnopabcdefghijklmnop/x/y.html")
                .as_deref(),
            Some("abcdefghijklmnopabcdefghijklmnop")
        );
        assert_eq!(extension_id_from_url("https://example.com/"), None);
        assert_eq!(extension_id_from_url("not a url"), None);
    }
}
