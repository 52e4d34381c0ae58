//! Interactive terminal client
//!
//! Seals each stdin line and sends it as one frame; prints every frame the
//! server sends. Ctrl-C or end of input closes the connection gracefully,
//! a lost connection ends with a failure exit code.

use std::net::SocketAddr;
use std::process::ExitCode;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::select;
use tracing::{debug, warn};

use crate::cipher::TransportCipher;
use crate::codec;
use crate::error::AppError;

/// How the client session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// Ctrl-C
    Interrupted,
    /// Standard input reached end of file
    InputClosed,
    /// Read or write on the connection failed
    ConnectionLost,
}

impl ClientExit {
    /// Whether the process should exit with a failure status
    pub fn is_failure(self) -> bool {
        matches!(self, ClientExit::ConnectionLost)
    }

    /// Process exit code for this outcome
    pub fn code(self) -> ExitCode {
        if self.is_failure() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// Connect to `server` and run until interrupted or disconnected
pub async fn run(
    server: SocketAddr,
    cipher: TransportCipher,
    max_frame_len: usize,
) -> Result<ClientExit, AppError> {
    let stream = TcpStream::connect(server).await?;
    write_stdout("Connected to TCP Chat Server!\n").await?;

    let (mut frames, mut sink) = codec::split(stream, max_frame_len);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        select! {
            frame = frames.next() => match frame {
                Some(Ok(frame)) => match cipher.open(&frame) {
                    Ok(plaintext) => render(&String::from_utf8_lossy(&plaintext)).await?,
                    Err(e) => write_stdout(&format!("Failed to decrypt message: {}\n", e)).await?,
                },
                other => {
                    if let Some(Err(e)) = other {
                        debug!("Read from server failed: {}", e);
                    }
                    write_stdout("\nConnection to server lost\n").await?;
                    return Ok(ClientExit::ConnectionLost);
                }
            },
            line = input.next_line() => {
                let Some(line) = line? else {
                    let _ = SinkExt::<Bytes>::close(&mut sink).await;
                    return Ok(ClientExit::InputClosed);
                };

                let message = line.trim();
                if message.is_empty() {
                    continue;
                }

                let frame = cipher.seal(format!("{}\n", message).as_bytes())?;
                if let Err(e) = sink.send(Bytes::from(frame)).await {
                    write_stdout(&format!("Failed to send message: {}\n", e)).await?;
                    return Ok(ClientExit::ConnectionLost);
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Ctrl-C handler failed: {}", e);
                }
                write_stdout("\nDisconnecting gracefully...\n").await?;
                let _ = SinkExt::<Bytes>::close(&mut sink).await;
                return Ok(ClientExit::Interrupted);
            }
        }
    }
}

/// Print a server frame
///
/// Chat lines arrive without a trailing newline; prompts end in a space
/// and are left open for input.
async fn render(text: &str) -> std::io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    if text.ends_with('\n') || text.ends_with(' ') {
        write_stdout(text).await
    } else {
        write_stdout(&format!("{}\n", text)).await
    }
}

async fn write_stdout(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert!(!ClientExit::Interrupted.is_failure());
        assert!(!ClientExit::InputClosed.is_failure());
        assert!(ClientExit::ConnectionLost.is_failure());
    }
}
