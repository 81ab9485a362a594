//! Control messages posted to the worker by its clients.

use serde::{Deserialize, Serialize};

/// A control message, tagged by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate immediately instead of waiting for older instances.
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a message. Anything unrecognized yields `None`.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_skip_waiting() {
        assert_eq!(
            ControlMessage::parse(&json!({"type": "SKIP_WAITING"})),
            Some(ControlMessage::SkipWaiting)
        );
    }

    #[test]
    fn test_extra_fields_ignored() {
        assert_eq!(
            ControlMessage::parse(&json!({"type": "SKIP_WAITING", "from": "banner"})),
            Some(ControlMessage::SkipWaiting)
        );
    }

    #[test]
    fn test_unknown_messages() {
        assert_eq!(ControlMessage::parse(&json!({"type": "skip_waiting"})), None);
        assert_eq!(ControlMessage::parse(&json!({"type": "CLEAR_CACHE"})), None);
        assert_eq!(ControlMessage::parse(&json!("SKIP_WAITING")), None);
        assert_eq!(ControlMessage::parse(&json!(null)), None);
    }

    #[test]
    fn test_serialize() {
        assert_eq!(
            serde_json::to_value(ControlMessage::SkipWaiting).unwrap(),
            json!({"type": "SKIP_WAITING"})
        );
    }
}
