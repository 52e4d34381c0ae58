//! Wire framing
//!
//! Each frame is a 4-byte big-endian length followed by the body, which is
//! either a sealed frame or raw UTF-8. The reader accumulates partial reads,
//! so a frame split across TCP segments or several frames in one segment
//! are both handled.

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::cipher::{NONCE_LEN, TAG_LEN};
use crate::username;

/// Default maximum frame body length
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Smallest accepted maximum frame length; every reply text fits in it
pub const MIN_FRAME_LEN: usize = 256;

/// Bytes a relayed chat frame adds to the sender's line: the seal
/// overhead and the `[<username>]: ` prefix
pub const CHAT_OVERHEAD: usize = NONCE_LEN + TAG_LEN + username::MAX_LEN + 4;

/// Longest chat line whose relayed copies still fit in one frame
pub fn max_chat_len(max_frame_len: usize) -> usize {
    max_frame_len.saturating_sub(CHAT_OVERHEAD)
}

/// Incoming frames of a TCP connection
pub type FrameReader = FramedRead<OwnedReadHalf, LengthDelimitedCodec>;

/// Outgoing frames of a TCP connection
pub type FrameWriter = FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>;

/// Build the frame codec
///
/// Frames longer than `max_frame_len` fail with `InvalidData` on decode
/// and `InvalidInput` on encode. A failed encode writes nothing.
pub fn codec(max_frame_len: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(max_frame_len)
        .new_codec()
}

/// Split a TCP stream into framed halves
pub fn split(stream: tokio::net::TcpStream, max_frame_len: usize) -> (FrameReader, FrameWriter) {
    let (read_half, write_half) = stream.into_split();
    (
        FramedRead::new(read_half, codec(max_frame_len)),
        FramedWrite::new(write_half, codec(max_frame_len)),
    )
}
