//! Command-line interface for server, client and key generation.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::codec::DEFAULT_MAX_FRAME_LEN;
use crate::config::{ServerConfig, DEFAULT_ADDR};
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay server.
    Serve(ServeArgs),
    /// Connect to a relay and chat from the terminal.
    Connect(ConnectArgs),
    /// Print a new random base64 shared key.
    Keygen,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// JSON config file. Flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Socket address to bind. Use port 0 for an ephemeral port.
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// File holding the base64 shared key (otherwise RELAY_KEY is used).
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Disable transport encryption.
    #[arg(long)]
    pub plaintext: bool,
}

impl ServeArgs {
    /// Merge the config file (if any) with command-line overrides
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(key_file) = self.key_file {
            config.key_file = Some(key_file);
        }
        if self.plaintext {
            config.encryption = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Address of the relay to connect to.
    #[arg(long, default_value_t = DEFAULT_ADDR)]
    pub server: SocketAddr,

    /// File holding the base64 shared key (otherwise RELAY_KEY is used).
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Disable transport encryption.
    #[arg(long)]
    pub plaintext: bool,

    /// Maximum frame body length in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LEN)]
    pub max_frame_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "relay_chat",
            "serve",
            "--listen",
            "127.0.0.1:0",
            "--plaintext",
        ])
        .unwrap();

        let Command::Serve(args) = cli.command else {
            panic!("Wrong subcommand");
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.listen_addr.port(), 0);
        assert!(!config.encryption);
        assert_eq!(config.queue_capacity, 100);
    }

    #[test]
    fn test_connect_defaults() {
        let cli = Cli::try_parse_from(["relay_chat", "connect"]).unwrap();

        let Command::Connect(args) = cli.command else {
            panic!("Wrong subcommand");
        };
        assert_eq!(args.server, DEFAULT_ADDR);
        assert!(!args.plaintext);
        assert_eq!(args.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }

    #[test]
    fn test_keygen() {
        let cli = Cli::try_parse_from(["relay_chat", "keygen"]).unwrap();
        assert!(matches!(cli.command, Command::Keygen));
    }
}
