//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based opaque connection handle
//! - `MessageKind`: the three kinds of broadcast traffic

use uuid::Uuid;

/// Opaque connection handle (newtype pattern)
///
/// Wraps a UUID v4 so each accepted connection has an identity that is
/// cheap to copy, compare and hash. Used as the key of the registry and as
/// the origin of chat messages for self-exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a broadcast message
///
/// Decides both the line format and whether the origin connection is
/// excluded from fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Chat line typed by a user
    Chat,
    /// A user changed their display name
    UsernameChange,
    /// Server-generated notice (joins, departures)
    System,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageKind::Chat => "chat",
            MessageKind::UsernameChange => "username_change",
            MessageKind::System => "system",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_message_kind_display() {
        assert_eq!(MessageKind::Chat.to_string(), "chat");
        assert_eq!(MessageKind::UsernameChange.to_string(), "username_change");
        assert_eq!(MessageKind::System.to_string(), "system");
    }
}
