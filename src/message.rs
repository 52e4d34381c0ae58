//! Message definitions
//!
//! `Message` is the unit of work consumed by the broadcast hub.
//! `Reply` is the set of direct responses sent to a single connection.

use crate::error::{AppError, ValidationError};
use crate::types::{ConnectionId, MessageKind};

/// A broadcast message
///
/// Created by a session or by a directory mutation, consumed exactly once
/// by the broadcast hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Display name of the sender
    pub sender: String,
    /// Text payload
    pub content: String,
    /// Originating connection (None for system-generated messages)
    pub origin: Option<ConnectionId>,
    /// Message kind
    pub kind: MessageKind,
    /// Reserved for direct messaging, not used by fan-out
    pub recipient: Option<String>,
    /// Reserved for direct messaging, not used by fan-out
    pub private: bool,
}

impl Message {
    /// A chat line from a user
    pub fn chat(sender: impl Into<String>, content: impl Into<String>, origin: ConnectionId) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            origin: Some(origin),
            kind: MessageKind::Chat,
            recipient: None,
            private: false,
        }
    }

    /// A server notice
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            sender: "System".to_string(),
            content: content.into(),
            origin: None,
            kind: MessageKind::System,
            recipient: None,
            private: false,
        }
    }

    /// A rename notice for `old -> new`
    pub fn username_change(old: &str, new: &str, origin: ConnectionId) -> Self {
        Self {
            sender: new.to_string(),
            content: format!("Username changed: {} -> {}", old, new),
            origin: Some(origin),
            kind: MessageKind::UsernameChange,
            recipient: None,
            private: false,
        }
    }

    /// "<name> joined the chat"
    pub fn joined(username: &str) -> Self {
        Self::system(format!("{} joined the chat", username))
    }

    /// "<name> left the chat"
    pub fn left(username: &str) -> Self {
        Self::system(format!("{} left the chat", username))
    }

    /// Connection excluded from fan-out
    ///
    /// Only chat messages skip their origin; notices reach everyone.
    pub fn excluded(&self) -> Option<ConnectionId> {
        match self.kind {
            MessageKind::Chat => self.origin,
            MessageKind::System | MessageKind::UsernameChange => None,
        }
    }

    /// Render the line delivered to clients
    pub fn format(&self) -> String {
        match self.kind {
            MessageKind::Chat => format!("[{}]: {}", self.sender, self.content),
            MessageKind::System | MessageKind::UsernameChange => {
                format!("*** {} ***\n", self.content)
            }
        }
    }
}

/// Direct reply to one connection
///
/// Never broadcast. Sealed the same way as chat traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Greeting sent on connect, asks for a username
    Prompt,
    /// Username accepted
    Welcome { username: String },
    /// Username fails the format rule
    InvalidUsername,
    /// Username held by another connection
    UsernameTaken,
    /// `/nick` with the wrong number of arguments
    NickUsage,
    /// `/nick` target fails the format rule
    NickInvalid,
    /// `/nick` succeeded
    Renamed { username: String },
    /// `/nick` failed for another reason
    RenameFailed,
    /// `/quit` acknowledged
    Goodbye,
    /// Unrecognized command
    UnknownCommand,
    /// Chat line too long to relay
    MessageTooLong { limit: usize },
}

impl Reply {
    /// Reply text as sent on the wire
    pub fn text(&self) -> String {
        match self {
            Reply::Prompt => "Welcome to TCP Chat!\nPlease enter your username (3-20 characters, letters, numbers, underscore only): ".to_string(),
            Reply::Welcome { username } => format!(
                "Welcome {}! You can now start chatting.\nCommands: /nick <newname> to change username, /quit to exit\n",
                username
            ),
            Reply::InvalidUsername => "Invalid username. Please use 3-20 characters, letters, numbers, underscore only.\n".to_string(),
            Reply::UsernameTaken => "Username already taken. Please choose another.\n".to_string(),
            Reply::NickUsage => "Usage: /nick <newusername>\n".to_string(),
            Reply::NickInvalid => "Invalid username. Please use 3-20 characters (letters, numbers, underscore only)\n".to_string(),
            Reply::Renamed { username } => format!("Username changed to: {}\n", username),
            Reply::RenameFailed => "Failed to change username\n".to_string(),
            Reply::Goodbye => "Goodbye!\n".to_string(),
            Reply::UnknownCommand => {
                "Unknown command. Available commands: /nick <newname>, /quit\n".to_string()
            }
            Reply::MessageTooLong { limit } => {
                format!("Message too long (max {} bytes)\n", limit)
            }
        }
    }
}

/// Convert ValidationError to the reply shown to the client
impl From<ValidationError> for Reply {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidFormat => Reply::InvalidUsername,
            ValidationError::Taken => Reply::UsernameTaken,
            ValidationError::NotRegistered => Reply::RenameFailed,
        }
    }
}

/// Convert AppError to a reply for client notification
impl From<&AppError> for Reply {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Validation(err) => Reply::from(*err),
            // Internal failures are not detailed to the client
            _ => Reply::RenameFailed,
        }
    }
}
