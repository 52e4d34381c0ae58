//! ChatServer implementation
//!
//! An explicitly constructed server instance owning the registry, the
//! broadcast queue and the cipher. The accept loop runs on the caller's
//! task and spawns one session task per connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::cipher::TransportCipher;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::hub::{self, BroadcastHub, HubHandle};
use crate::registry::Registry;

/// Pause after a failed accept before retrying
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// State shared by every session task
#[derive(Debug)]
pub struct ServerState {
    /// Sessions and usernames
    pub registry: Arc<Registry>,
    /// Producer side of the broadcast queue
    pub hub: HubHandle,
    /// Frame cipher
    pub cipher: Arc<TransportCipher>,
    /// Effective configuration
    pub config: ServerConfig,
}

/// The chat relay server
pub struct ChatServer {
    listener: TcpListener,
    state: Arc<ServerState>,
    hub: BroadcastHub,
}

impl ChatServer {
    /// Bind the configured address
    pub async fn bind(config: ServerConfig, cipher: TransportCipher) -> Result<Self, AppError> {
        config.validate()?;

        let addr = config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AppError::Listener { addr, source })?;

        Ok(Self::with_listener(listener, config, cipher))
    }

    /// Build a server on an already bound listener
    pub fn with_listener(listener: TcpListener, config: ServerConfig, cipher: TransportCipher) -> Self {
        let registry = Arc::new(Registry::new());
        let cipher = Arc::new(cipher);
        let (handle, queue) = hub::channel(config.queue_capacity);
        let hub = BroadcastHub::new(queue, Arc::clone(&registry), Arc::clone(&cipher));

        let state = Arc::new(ServerState {
            registry,
            hub: handle,
            cipher,
            config,
        });

        Self {
            listener,
            state,
            hub,
        }
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    #[cfg(test)]
    fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Run the broadcast hub and the accept loop
    ///
    /// Runs until the process is killed. Accept failures are logged and
    /// retried.
    pub async fn run(self) {
        let ChatServer {
            listener,
            state,
            hub,
        } = self;

        tokio::spawn(hub.run());
        info!(
            encryption = state.cipher.is_encrypted(),
            "Waiting for clients to connect..."
        );

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let state = Arc::clone(&state);

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, state).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}
