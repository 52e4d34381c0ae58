//! Encrypted TCP Chat Relay Library
//!
//! A multi-client, real-time text relay built on tokio. Clients connect over
//! TCP, register a display name and exchange lines that the server fans out
//! to every other connected client.
//!
//! # Features
//! - Username negotiation with uniqueness checks
//! - Chat fan-out with self-exclusion
//! - `/nick` and `/quit` commands
//! - Join, leave and rename notices
//! - Optional ChaCha20-Poly1305 sealing of every frame
//! - Length-prefixed framing
//!
//! # Architecture
//! - `ChatServer` owns the registry, the broadcast queue and the cipher
//! - Each connection runs a `SessionHandler` task plus a writer task
//! - `BroadcastHub` is the single consumer of the broadcast queue
//! - `Registry` keeps connection ↔ username under one `RwLock`
//!
//! # Example
//! ```ignore
//! use relay_chat::{ChatServer, ServerConfig, TransportCipher, SharedKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relay_chat::AppError> {
//!     let config = ServerConfig::default();
//!     let cipher = TransportCipher::new(&SharedKey::generate());
//!
//!     let server = ChatServer::bind(config, cipher).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod cipher;
pub mod cli;
pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;
pub mod username;

// Re-export main types for convenience
pub use cipher::{SharedKey, TransportCipher};
pub use config::ServerConfig;
pub use error::{AppError, ConfigError, DecryptError, SendError, ValidationError};
pub use handler::{handle_connection, SessionHandler};
pub use hub::{BroadcastHub, HubHandle};
pub use message::{Message, Reply};
pub use registry::Registry;
pub use server::{ChatServer, ServerState};
pub use session::{Outbox, Session};
pub use types::{ConnectionId, MessageKind};
