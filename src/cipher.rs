//! Transport encryption
//!
//! Seals and opens individual frames with ChaCha20-Poly1305 under a
//! pre-shared 256-bit key. A sealed frame is `nonce ‖ ciphertext ‖ tag`
//! with a fresh random nonce per call. A cipher built with
//! [`TransportCipher::plaintext`] passes bytes through unchanged.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use crate::error::{ConfigError, DecryptError, SealError};

/// Key length in bytes
pub const KEY_LEN: usize = 32;
/// Nonce length in bytes
pub const NONCE_LEN: usize = 12;
/// Authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// Pre-shared key material
///
/// Provisioned out of band and identical on both endpoints.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey([u8; KEY_LEN]);

impl SharedKey {
    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a new random key from the OS random source
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Parse a standard base64 encoding of exactly 32 bytes
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        let key: [u8; KEY_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ConfigError::KeyLength {
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(key))
    }

    /// Load a base64-encoded key from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let encoded = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_base64(&encoded)
    }

    /// Encode as standard base64
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedKey(<redacted>)")
    }
}

/// Frame cipher shared by every connection of a process
pub enum TransportCipher {
    /// AEAD sealing under the shared key
    Sealed(ChaCha20Poly1305),
    /// Encryption disabled
    Plaintext,
}

impl TransportCipher {
    /// Create a sealing cipher from the shared key
    pub fn new(key: &SharedKey) -> Self {
        Self::Sealed(ChaCha20Poly1305::new(Key::from_slice(&key.0)))
    }

    /// Create a pass-through cipher
    pub fn plaintext() -> Self {
        Self::Plaintext
    }

    /// Whether frames are actually encrypted
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Sealed(_))
    }

    /// Seal a plaintext into a single frame
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
        let Self::Sealed(cipher) = self else {
            return Ok(plaintext.to_vec());
        };

        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher.encrypt(&nonce, plaintext).map_err(|_| SealError)?;

        let mut frame = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        frame.extend_from_slice(&nonce);
        frame.extend_from_slice(&ciphertext);
        Ok(frame)
    }

    /// Open a frame produced by [`seal`](Self::seal)
    pub fn open(&self, frame: &[u8]) -> Result<Vec<u8>, DecryptError> {
        let Self::Sealed(cipher) = self else {
            return Ok(frame.to_vec());
        };

        if frame.len() < NONCE_LEN {
            return Err(DecryptError::TooShort { len: frame.len() });
        }

        let (nonce, ciphertext) = frame.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| DecryptError::Authentication)
    }
}

impl std::fmt::Debug for TransportCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sealed(_) => f.write_str("TransportCipher::Sealed"),
            Self::Plaintext => f.write_str("TransportCipher::Plaintext"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed() -> TransportCipher {
        TransportCipher::new(&SharedKey::generate())
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let cipher = sealed();
        for message in [&b""[..], &b"hello"[..], &[0u8, 255, 10, 13][..]] {
            let frame = cipher.seal(message).unwrap();
            assert_eq!(frame.len(), NONCE_LEN + message.len() + TAG_LEN);
            assert_eq!(cipher.open(&frame).unwrap(), message);
        }
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let cipher = sealed();
        let a = cipher.seal(b"same").unwrap();
        let b = cipher.seal(b"same").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn test_open_short_frame() {
        let cipher = sealed();
        assert_eq!(
            cipher.open(&[0u8; NONCE_LEN - 1]),
            Err(DecryptError::TooShort { len: NONCE_LEN - 1 })
        );
    }

    #[test]
    fn test_open_tampered_frame() {
        let cipher = sealed();
        let mut frame = cipher.seal(b"hello").unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert_eq!(cipher.open(&frame), Err(DecryptError::Authentication));
    }

    #[test]
    fn test_open_truncated_frame() {
        let cipher = sealed();
        let frame = cipher.seal(b"hello").unwrap();
        assert_eq!(
            cipher.open(&frame[..frame.len() - 1]),
            Err(DecryptError::Authentication)
        );
    }

    #[test]
    fn test_open_wrong_key() {
        let frame = sealed().seal(b"hello").unwrap();
        assert_eq!(sealed().open(&frame), Err(DecryptError::Authentication));
    }

    #[test]
    fn test_plaintext_passthrough() {
        let cipher = TransportCipher::plaintext();
        assert!(!cipher.is_encrypted());
        assert_eq!(cipher.seal(b"hi").unwrap(), b"hi");
        assert_eq!(cipher.open(b"hi").unwrap(), b"hi");
    }

    #[test]
    fn test_key_base64_roundtrip() {
        let key = SharedKey::generate();
        let parsed = SharedKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn test_key_wrong_length() {
        let encoded = STANDARD.encode([7u8; 16]);
        match SharedKey::from_base64(&encoded) {
            Err(ConfigError::KeyLength { expected, actual }) => {
                assert_eq!(expected, KEY_LEN);
                assert_eq!(actual, 16);
            }
            other => panic!("Wrong result: {:?}", other),
        }
    }

    #[test]
    fn test_key_bad_encoding() {
        assert!(matches!(
            SharedKey::from_base64("not base64!"),
            Err(ConfigError::KeyEncoding(_))
        ));
    }

    #[test]
    fn test_key_debug_redacted() {
        let key = SharedKey::from_bytes([0xab; KEY_LEN]);
        assert_eq!(format!("{:?}", key), "SharedKey(<redacted>)");
    }
}
