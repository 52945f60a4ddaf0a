//! Decoder for concatenated JSON frames

use bytes::{Buf, BytesMut};
use serde_json::Value;
use std::io;
use tokio_util::codec::Decoder;
use tracing::warn;

/// Upper bound on a single buffered frame
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Errors that end a decoded stream
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Splits a byte stream of back-to-back JSON values into whole values
///
/// Input may arrive in arbitrary chunks: a value is emitted only once it is
/// complete, values are emitted in arrival order, and whitespace between
/// values (including the newline the chat relay appends) is ignored.
/// Malformed input is discarded up to the next `{`.
#[derive(Debug, Clone)]
pub struct JsonFrameCodec {
    max_frame_len: usize,
}

impl JsonFrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }
}

impl Default for JsonFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JsonFrameCodec {
    type Item = Value;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, FrameError> {
        loop {
            let leading = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
            src.advance(leading);
            if src.is_empty() {
                return Ok(None);
            }

            let (next, consumed) = {
                let mut stream = serde_json::Deserializer::from_slice(&src[..]).into_iter::<Value>();
                let next = stream.next();
                (next, stream.byte_offset())
            };

            match next {
                Some(Ok(value)) => {
                    src.advance(consumed);
                    return Ok(Some(value));
                }
                Some(Err(e)) if e.is_eof() => {
                    if src.len() > self.max_frame_len {
                        return Err(FrameError::FrameTooLarge {
                            max: self.max_frame_len,
                        });
                    }
                    return Ok(None);
                }
                Some(Err(e)) => {
                    let resync = src[1..]
                        .iter()
                        .position(|b| *b == b'{')
                        .map(|pos| pos + 1)
                        .unwrap_or(src.len());
                    warn!(error = %e, discarded = resync, "Discarding malformed relay input");
                    src.advance(resync);
                }
                None => return Ok(None),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Value>, FrameError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !src.is_empty() {
                    warn!(remaining = src.len(), "Relay closed mid-frame");
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}
