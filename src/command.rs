//! Slash-command processing
//!
//! Parses `/`-prefixed input lines and applies them to the registry.
//! Every command produces exactly one direct reply for the issuing
//! connection; nothing here is broadcast except the rename notice the
//! registry enqueues itself.

use tracing::debug;

use crate::error::{AppError, ValidationError};
use crate::hub::HubHandle;
use crate::message::Reply;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/nick <name>`
    Nick(String),
    /// `/nick` with zero or several arguments
    NickUsage,
    /// `/quit`
    Quit,
    /// Anything else
    Unknown(String),
}

impl Command {
    /// Parse whitespace-delimited tokens of a command line
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match name {
            "/nick" => match args.as_slice() {
                [new_name] => Command::Nick(new_name.to_string()),
                _ => Command::NickUsage,
            },
            "/quit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// What the session should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Keep reading
    Continue,
    /// Keep reading under a new name
    Renamed(String),
    /// Close the session
    Quit,
}

/// Reply and follow-up action of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub reply: Reply,
    pub action: Action,
}

impl Outcome {
    fn reply(reply: Reply) -> Self {
        Self {
            reply,
            action: Action::Continue,
        }
    }
}

/// Execute a command line for connection `id`
pub async fn process(line: &str, id: ConnectionId, registry: &Registry, hub: &HubHandle) -> Outcome {
    let command = Command::parse(line);
    debug!("Command from {}: {:?}", id, command);

    match command {
        Command::Nick(new_name) => match registry.rename(id, &new_name, hub).await {
            Ok(_) => Outcome {
                reply: Reply::Renamed {
                    username: new_name.clone(),
                },
                action: Action::Renamed(new_name),
            },
            Err(AppError::Validation(ValidationError::InvalidFormat)) => {
                Outcome::reply(Reply::NickInvalid)
            }
            Err(e) => Outcome::reply(Reply::from(&e)),
        },
        Command::NickUsage => Outcome::reply(Reply::NickUsage),
        Command::Quit => Outcome {
            reply: Reply::Goodbye,
            action: Action::Quit,
        },
        Command::Unknown(_) => Outcome::reply(Reply::UnknownCommand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use tokio::sync::mpsc;

    use crate::hub;
    use crate::session::{Outbox, Session};

    fn registered(registry: &Registry, name: &str) -> ConnectionId {
        let id = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(1);
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        registry
            .register(Session::new(id, name, addr, Outbox::new(id, tx)))
            .unwrap();
        id
    }

    #[test]
    fn test_parse_nick() {
        assert_eq!(Command::parse("/nick carol"), Command::Nick("carol".to_string()));
        assert_eq!(Command::parse("/nick   carol  "), Command::Nick("carol".to_string()));
        assert_eq!(Command::parse("/nick"), Command::NickUsage);
        assert_eq!(Command::parse("/nick a b"), Command::NickUsage);
    }

    #[test]
    fn test_parse_quit_and_unknown() {
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/quit now"), Command::Quit);
        assert_eq!(Command::parse("/foo bar"), Command::Unknown("/foo".to_string()));
        assert_eq!(Command::parse("/"), Command::Unknown("/".to_string()));
    }

    #[tokio::test]
    async fn test_nick_success() {
        let registry = Registry::new();
        let (handle, mut queue) = hub::channel(4);
        let id = registered(&registry, "alice");

        let outcome = process("/nick carol", id, &registry, &handle).await;

        assert_eq!(
            outcome.reply,
            Reply::Renamed {
                username: "carol".to_string()
            }
        );
        assert_eq!(outcome.action, Action::Renamed("carol".to_string()));
        assert!(queue.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_nick_taken_and_invalid() {
        let registry = Registry::new();
        let (handle, mut queue) = hub::channel(4);
        let id = registered(&registry, "alice");
        registered(&registry, "bob");

        let taken = process("/nick bob", id, &registry, &handle).await;
        assert_eq!(taken.reply, Reply::UsernameTaken);
        assert_eq!(taken.action, Action::Continue);

        let invalid = process("/nick x", id, &registry, &handle).await;
        assert_eq!(invalid.reply, Reply::NickInvalid);

        let own = process("/nick alice", id, &registry, &handle).await;
        assert_eq!(own.reply, Reply::UsernameTaken);

        assert!(queue.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregistered_rename_fails() {
        let registry = Registry::new();
        let (handle, _queue) = hub::channel(4);

        let outcome = process("/nick carol", ConnectionId::new(), &registry, &handle).await;
        assert_eq!(outcome.reply, Reply::RenameFailed);
    }

    #[tokio::test]
    async fn test_quit_and_unknown() {
        let registry = Registry::new();
        let (handle, mut queue) = hub::channel(4);
        let id = registered(&registry, "alice");

        let quit = process("/quit", id, &registry, &handle).await;
        assert_eq!(quit.reply, Reply::Goodbye);
        assert_eq!(quit.action, Action::Quit);

        let unknown = process("/foo", id, &registry, &handle).await;
        assert_eq!(unknown.reply, Reply::UnknownCommand);
        assert_eq!(unknown.action, Action::Continue);

        assert!(queue.try_recv().is_err());
    }
}
