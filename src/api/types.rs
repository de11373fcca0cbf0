//! Wire types for the chat and voice transports

use serde::{Deserialize, Serialize};

/// Chat frame, used both ways on the WebSocket: `{"text": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub text: String,
}

impl ChatFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Telephony webhook form. The provider sends many more fields; only the
/// recognized speech matters here.
#[derive(Debug, Default, Deserialize)]
pub struct VoiceForm {
    #[serde(rename = "SpeechResult", default)]
    pub speech_result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_frame_shape() {
        let frame: ChatFrame = serde_json::from_str(r#"{"text":"hi","extra":1}"#).unwrap();
        assert_eq!(frame, ChatFrame::new("hi"));
        assert_eq!(
            serde_json::to_string(&ChatFrame::new("hello")).unwrap(),
            r#"{"text":"hello"}"#
        );
    }

    #[test]
    fn test_chat_frame_requires_text() {
        assert!(serde_json::from_str::<ChatFrame>(r#"{"message":"hi"}"#).is_err());
        assert!(serde_json::from_str::<ChatFrame>("not json").is_err());
    }
}
