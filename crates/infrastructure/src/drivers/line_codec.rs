use std::io;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use domain::protocol::{Line, TERMINATOR};

/// Longest inbound line kept before the buffer is dropped as garbage
const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Newline framing for the supply's ASCII protocol.
///
/// Inbound frames are split on `\n` with the terminator stripped. A partial
/// frame left when the stream ends is discarded. Outbound lines get exactly
/// one terminator appended. A line longer than `max_length` is dropped
/// whole, up to and including its terminator.
#[derive(Debug, Clone)]
pub struct LineCodec {
    // Where to resume the terminator search in the buffer
    next_index: usize,
    max_length: usize,
    // Inside an over-long line; skip until the next terminator
    is_discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            is_discarding: false,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Line;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, io::Error> {
        loop {
            let terminator = buf[self.next_index..]
                .iter()
                .position(|b| *b == TERMINATOR)
                .map(|offset| self.next_index + offset);

            match (self.is_discarding, terminator) {
                (true, Some(index)) => {
                    buf.advance(index + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(index)) if index > self.max_length => {
                    tracing::warn!(
                        bytes = index,
                        max_length = self.max_length,
                        "Inbound line too long, discarding"
                    );
                    buf.advance(index + 1);
                    self.next_index = 0;
                }
                (false, Some(index)) => {
                    self.next_index = 0;
                    let frame = buf.split_to(index + 1);
                    let text = String::from_utf8_lossy(&frame[..index]).into_owned();
                    return Line::new(text)
                        .map(Some)
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
                }
                (false, None) if buf.len() > self.max_length => {
                    tracing::warn!(
                        bytes = buf.len(),
                        max_length = self.max_length,
                        "Inbound line too long, discarding until next terminator"
                    );
                    buf.clear();
                    self.next_index = 0;
                    self.is_discarding = true;
                    return Ok(None);
                }
                (false, None) => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if !buf.is_empty() {
            tracing::debug!(bytes = buf.len(), "Discarding partial line at end of stream");
            buf.clear();
        }
        self.next_index = 0;
        self.is_discarding = false;
        Ok(None)
    }
}

impl Encoder<Line> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, line: Line, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.reserve(line.as_bytes().len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(TERMINATOR);
        Ok(())
    }
}
