use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_ENGINE};
use serde::{Deserialize, Serialize};

use crate::core::state::SleepStatus;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Status { status: SleepStatus },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Frame { data: String },
}

pub fn parse_inbound(text: &str) -> serde_json::Result<InboundMessage> {
    serde_json::from_str(text)
}

/// Wraps a JPEG frame as `{"type":"frame","data":"<base64>"}`.
pub fn frame_message(jpeg: &[u8]) -> serde_json::Result<String> {
    serde_json::to_string(&OutboundMessage::Frame {
        data: BASE64_ENGINE.encode(jpeg),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{InboundMessage, frame_message, parse_inbound};
    use crate::core::state::SleepStatus;

    #[test]
    fn parses_status_update() {
        let message = parse_inbound(r#"{"type":"status","status":"sleeping"}"#)
            .expect("status message should parse");
        assert_eq!(
            message,
            InboundMessage::Status {
                status: SleepStatus::Sleeping
            }
        );
    }

    #[test]
    fn parses_error_report() {
        let message = parse_inbound(r#"{"type":"error","message":"model not loaded"}"#)
            .expect("error message should parse");
        assert_eq!(
            message,
            InboundMessage::Error {
                message: "model not loaded".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_and_unknown_payloads() {
        assert!(parse_inbound("Message text was Frontend connected!").is_err());
        assert!(parse_inbound(r#"{"type":"status","status":"dozing"}"#).is_err());
        assert!(parse_inbound(r#"{"type":"ping"}"#).is_err());
        assert!(parse_inbound(r#"{"status":"awake"}"#).is_err());
    }

    #[test]
    fn frame_message_carries_base64_jpeg() {
        let encoded = frame_message(&[0xFF, 0xD8, 0xFF, 0xD9]).expect("frame should serialize");
        let value: Value = serde_json::from_str(&encoded).expect("valid json");
        assert_eq!(value["type"], "frame");
        assert_eq!(value["data"], "/9j/2Q==");
    }
}
