//! Embedded static resources.
//!
//! - `template` - Template types for typed variable injection
//! - `client` - The reload client injected into extension pages and workers
//!
//! # Usage
//!
//! ```ignore
//! use embed::client::{RELOAD_CLIENT_JS, ClientVars};
//!
//! let js = RELOAD_CLIENT_JS.render(&ClientVars::new(8081));
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod client {
    use super::{Template, TemplateVars};
    use crate::reload::message::{ClientFrame, ServerFrame};
    use crate::snapshot::{ControlKind, SNAPSHOT_KEY_PREFIX};

    /// Asset name of the standalone client emitted next to the pages.
    pub const CLIENT_ASSET: &str = "extreload-client.js";

    /// First line of every rendered client; marks already-patched assets.
    pub const CLIENT_MARKER: &str = "/* extreload-client */";

    /// Fixed reconnect delay after any close.
    pub const RETRY_INTERVAL_MS: u32 = 1000;

    /// Reconnect attempts before giving up outside an extension context.
    pub const DEGRADED_MAX_RETRIES: u32 = 10;

    /// Keep-alive period; below the browser's 30 s worker idle timeout.
    pub const KEEPALIVE_INTERVAL_MS: u32 = 20_000;

    /// Variables for reload-client.js.
    pub struct ClientVars {
        pub port: u16,
        pub retry_interval_ms: u32,
        pub max_retries: u32,
        pub keepalive_interval_ms: u32,
    }

    impl ClientVars {
        pub fn new(port: u16) -> Self {
            Self {
                port,
                retry_interval_ms: RETRY_INTERVAL_MS,
                max_retries: DEGRADED_MAX_RETRIES,
                keepalive_interval_ms: KEEPALIVE_INTERVAL_MS,
            }
        }
    }

    impl TemplateVars for ClientVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__EXTRELOAD_MARKER__", CLIENT_MARKER)
                .replace("__EXTRELOAD_PORT__", &self.port.to_string())
                .replace("__EXTRELOAD_RELOAD__", ServerFrame::Reload.as_str())
                .replace("__EXTRELOAD_KEEPALIVE__", ClientFrame::KEEPALIVE)
                .replace("__EXTRELOAD_SNAPSHOT_PREFIX__", SNAPSHOT_KEY_PREFIX)
                .replace("__EXTRELOAD_SKIPPED_TYPES__", &skipped_types())
                .replace("__EXTRELOAD_RETRY_MS__", &self.retry_interval_ms.to_string())
                .replace("__EXTRELOAD_MAX_RETRIES__", &self.max_retries.to_string())
                .replace(
                    "__EXTRELOAD_KEEPALIVE_MS__",
                    &self.keepalive_interval_ms.to_string(),
                )
        }
    }

    /// JS array literal of input types the client never saves.
    fn skipped_types() -> String {
        let quoted: Vec<String> = ControlKind::SKIPPED_TYPES
            .iter()
            .map(|ty| format!("\"{ty}\""))
            .collect();
        format!("[{}]", quoted.join(","))
    }

    /// Reload client runtime with port and protocol injection.
    pub const RELOAD_CLIENT_JS: Template<ClientVars> =
        Template::new(include_str!("client/reload-client.js"));

    /// `<script>` tag that loads the standalone client from the extension root.
    pub fn script_tag() -> String {
        format!(r#"<script src="/{CLIENT_ASSET}"></script>"#)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_render_replaces_every_placeholder() {
            let js = RELOAD_CLIENT_JS.render(&ClientVars::new(8081));
            assert!(!js.contains("__EXTRELOAD_"), "unreplaced placeholder");
            assert!(js.starts_with(CLIENT_MARKER));
            assert!(js.contains("ws://localhost:8081"));
            assert!(js.contains("\"extreload:snapshot\""));
            assert!(js.contains("\"reload\""));
            assert!(js.contains("\"keepalive\""));
        }

        #[test]
        fn test_render_custom_port() {
            let js = RELOAD_CLIENT_JS.render(&ClientVars::new(9000));
            assert!(js.contains("ws://localhost:9000"));
            assert!(!js.contains("8081"));
        }

        #[test]
        fn test_script_tag() {
            assert_eq!(
                script_tag(),
                r#"<script src="/extreload-client.js"></script>"#
            );
        }
    }
}
