//! Live-reload wire protocol.
//!
//! Plain WebSocket text frames, no JSON envelope:
//!
//! | Direction       | Frame       | Meaning                               |
//! |-----------------|-------------|---------------------------------------|
//! | server → client | `reload`    | reload the page or extension now      |
//! | client → server | `keepalive` | keeps the worker alive; ignored here  |

use tungstenite::protocol::Message;

/// Frames sent to reload clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerFrame {
    Reload,
}

impl ServerFrame {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reload => "reload",
        }
    }

    pub fn to_message(self) -> Message {
        Message::text(self.as_str())
    }
}

/// Frames received from reload clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Keepalive,
    Unknown(String),
}

impl ClientFrame {
    pub const KEEPALIVE: &'static str = "keepalive";

    pub fn parse(text: &str) -> Self {
        match text.trim() {
            Self::KEEPALIVE => Self::Keepalive,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_frame() {
        assert_eq!(ServerFrame::Reload.as_str(), "reload");
        match ServerFrame::Reload.to_message() {
            Message::Text(text) => assert_eq!(text.as_str(), "reload"),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_client_frames() {
        assert_eq!(ClientFrame::parse("keepalive"), ClientFrame::Keepalive);
        assert_eq!(ClientFrame::parse(" keepalive\n"), ClientFrame::Keepalive);
        assert_eq!(
            ClientFrame::parse("hello"),
            ClientFrame::Unknown("hello".into())
        );
    }
}
