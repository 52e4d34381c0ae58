//! Server configuration
//!
//! Defaults: localhost:8080, broadcast queue of 100, encryption on.
//! Values can come from a JSON file and are then overridden by command
//! line flags. Key material is read from a key file or the `RELAY_KEY`
//! environment variable, never from the binary.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cipher::{SharedKey, TransportCipher};
use crate::codec::{DEFAULT_MAX_FRAME_LEN, MIN_FRAME_LEN};
use crate::error::ConfigError;

/// Environment variable holding the base64 shared key
pub const KEY_ENV: &str = "RELAY_KEY";

/// Default listening address
pub const DEFAULT_ADDR: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

/// Relay server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,
    /// Seal frames with the shared key
    pub encryption: bool,
    /// File holding the base64 shared key
    pub key_file: Option<PathBuf>,
    /// Broadcast queue capacity
    pub queue_capacity: usize,
    /// Per-connection outbound frame capacity
    pub outbox_capacity: usize,
    /// Maximum frame body length in bytes
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDR,
            encryption: true,
            key_file: None,
            queue_capacity: 100,
            outbox_capacity: 32,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ServerConfig {
    /// Parse a JSON config document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reject settings that would make channels or framing unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }
        if self.outbox_capacity == 0 {
            return Err(ConfigError::Zero("outbox_capacity"));
        }
        if self.max_frame_len < MIN_FRAME_LEN {
            return Err(ConfigError::FrameTooSmall {
                min: MIN_FRAME_LEN,
                actual: self.max_frame_len,
            });
        }
        Ok(())
    }

    /// Build the transport cipher this config describes
    pub fn cipher(&self) -> Result<TransportCipher, ConfigError> {
        load_cipher(self.encryption, self.key_file.as_deref())
    }
}

/// Build a cipher from a key file or `RELAY_KEY`
pub fn load_cipher(encryption: bool, key_file: Option<&Path>) -> Result<TransportCipher, ConfigError> {
    resolve_cipher(encryption, key_file, std::env::var(KEY_ENV).ok())
}

fn resolve_cipher(
    encryption: bool,
    key_file: Option<&Path>,
    env_key: Option<String>,
) -> Result<TransportCipher, ConfigError> {
    if !encryption {
        return Ok(TransportCipher::plaintext());
    }

    let key = match (key_file, env_key) {
        (Some(path), _) => SharedKey::load(path)?,
        (None, Some(encoded)) => SharedKey::from_base64(&encoded)?,
        (None, None) => return Err(ConfigError::MissingKey),
    };
    Ok(TransportCipher::new(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
        assert!(config.encryption);
        assert_eq!(config.queue_capacity, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config =
            ServerConfig::from_json(r#"{"listen_addr": "0.0.0.0:9000", "encryption": false}"#)
                .unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert!(!config.encryption);
        assert_eq!(config.outbox_capacity, 32);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ServerConfig::from_json(r#"{"queue_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("queue_capacity")));
    }

    #[test]
    fn test_small_frame_rejected() {
        let err = ServerConfig::from_json(r#"{"max_frame_len": 64}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::FrameTooSmall {
                min: MIN_FRAME_LEN,
                actual: 64
            }
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_frame_len": 1024}}"#).unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_frame_len, 1024);
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/relay.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_plaintext_needs_no_key() {
        let cipher = resolve_cipher(false, None, None).unwrap();
        assert!(!cipher.is_encrypted());
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(
            resolve_cipher(true, None, None),
            Err(ConfigError::MissingKey)
        ));
    }

    #[test]
    fn test_key_from_env_value() {
        let key = SharedKey::generate();
        let cipher = resolve_cipher(true, None, Some(key.to_base64())).unwrap();

        let frame = TransportCipher::new(&key).seal(b"ping").unwrap();
        assert_eq!(cipher.open(&frame).unwrap(), b"ping");
    }

    #[test]
    fn test_key_file_takes_precedence() {
        let file_key = SharedKey::generate();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", file_key.to_base64()).unwrap();

        let env_key = SharedKey::generate();
        let cipher = resolve_cipher(true, Some(file.path()), Some(env_key.to_base64())).unwrap();

        let frame = TransportCipher::new(&file_key).seal(b"ping").unwrap();
        assert_eq!(cipher.open(&frame).unwrap(), b"ping");
    }
}
