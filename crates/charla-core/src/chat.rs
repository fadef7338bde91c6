//! UI-agnostic conversation types
//!
//! This module contains data structures that are shared between front ends
//! (TUI, relay server) and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Attached images as data-URL base64 strings. Omitted from the wire
    /// when empty; converted to raw base64 before forwarding to Ollama.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    pub fn user(content: impl Into<String>, images: Option<Vec<String>>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = Message::user("hello", None);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn test_images_omitted_when_absent() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert!(!json.contains("images"));
    }

    #[test]
    fn test_images_present_when_attached() {
        let msg = Message::user("look", Some(vec!["abcd".to_string()]));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["images"][0], "abcd");
    }
}
