use serde::{Deserialize, Serialize};

/// A message in a conversation, containing a role and text content.
///
/// Messages represent the chat interactions threaded through a run: the
/// farmer's query, restored history, and the synthesized assistant reply.
///
/// # Examples
///
/// ```
/// use cropflow::message::Message;
///
/// let user_msg = Message::user("How is my wheat doing?");
/// let assistant_msg = Message::assistant("Soil moisture looks healthy.");
/// assert!(user_msg.has_role(Message::USER));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (e.g., "user", "assistant", "system").
    pub role: String,
    /// The text content of the message.
    pub content: String,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// Assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";

    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    /// Creates a user message with the specified content.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message with the specified content.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system message with the specified content.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convenience_constructors_set_roles() {
        assert_eq!(Message::user("hi").role, Message::USER);
        assert_eq!(Message::assistant("hello").role, Message::ASSISTANT);
        assert_eq!(Message::system("rules").role, Message::SYSTEM);
        assert_eq!(Message::new("function", "done").role, "function");
    }

    #[test]
    fn serialization_round_trip() {
        let original = Message::user("Test message");
        let json = serde_json::to_string(&original).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(original, parsed);
    }

    #[test]
    fn role_checks() {
        let msg = Message::assistant("ok");
        assert!(msg.has_role(Message::ASSISTANT));
        assert!(!msg.has_role(Message::USER));
    }
}
