use crc::{CRC_8_SMBUS, Crc};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::utils::format_hex;

const HEADER_LEN: usize = 3;
const CRC_LEN: usize = 1;
const MIN_FRAME_LEN: usize = HEADER_LEN + CRC_LEN;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Frame delimiter; never occurs inside an encoded frame.
pub const FRAME_DELIMITER: u8 = 0x00;

/// Receive accumulator size, sized for the largest encoded frame.
pub(crate) const MAX_ENCODED_FRAME_LEN: usize = 264;

/// CRC-8, polynomial `0x07`, initial value `0`, no reflection.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Errors returned by frame encoding and decoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameError {
    /// The decoded frame has fewer than the mandatory 4 header/CRC bytes.
    #[error("frame is too short: expected at least 4 bytes, got {actual}")]
    TooShort { actual: usize },
    /// The embedded length field disagrees with the decoded byte count.
    #[error("frame length mismatch: header declares {declared} payload bytes but {actual} are present")]
    LengthMismatch { declared: usize, actual: usize },
    /// The trailing CRC does not match the frame contents.
    #[error("frame CRC mismatch: received {received:#04x}, calculated {calculated:#04x}")]
    CrcMismatch { received: u8, calculated: u8 },
    /// The stuffed bytes do not form a valid COBS block sequence.
    #[error("frame is not valid COBS data")]
    Malformed,
    /// Bytes arrived past the accumulator limit without a delimiter.
    #[error("frame exceeded {limit} encoded bytes without a delimiter")]
    Overflow { limit: usize },
    /// The payload does not fit in one frame.
    #[error("frame payload is too large: {payload_len} bytes exceeds max {max_payload_len}")]
    PayloadTooLarge {
        payload_len: usize,
        max_payload_len: usize,
    },
}

/// One validated frame: a type byte and its payload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame {
    frame_type: u8,
    payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame.
    ///
    /// # Errors
    ///
    /// Returns an error when `payload` is longer than [`MAX_PAYLOAD_LEN`].
    pub fn new(frame_type: u8, payload: impl Into<Vec<u8>>) -> Result<Self, FrameError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: MAX_PAYLOAD_LEN,
            });
        }
        Ok(Self {
            frame_type,
            payload,
        })
    }

    /// Returns the type byte.
    #[must_use]
    pub fn frame_type(&self) -> u8 {
        self.frame_type
    }

    /// Returns the payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Splits the frame into type byte and payload.
    #[must_use]
    pub fn into_parts(self) -> (u8, Vec<u8>) {
        (self.frame_type, self.payload)
    }
}

/// Stateless encoding and one-shot decoding of link frames.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes a frame into its COBS wire form, including the trailing delimiter.
    ///
    /// ```
    /// use knob_link::FrameCodec;
    ///
    /// let wire = FrameCodec::encode(0xF1, &[])?;
    /// assert_eq!(vec![0x02, 0xF1, 0x01, 0x02, 0x07, 0x00], wire);
    /// # Ok::<(), knob_link::FrameError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when `payload` is longer than [`MAX_PAYLOAD_LEN`].
    pub fn encode(frame_type: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: MAX_PAYLOAD_LEN,
            });
        }
        let payload_len = u16::try_from(payload.len()).map_err(|_overflow| {
            FrameError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: MAX_PAYLOAD_LEN,
            }
        })?;

        let mut raw = Vec::with_capacity(MIN_FRAME_LEN + payload.len());
        raw.push(frame_type);
        raw.extend_from_slice(&payload_len.to_le_bytes());
        raw.extend_from_slice(payload);
        raw.push(Self::crc8(&raw));

        let mut wire = cobs::encode_vec(&raw);
        wire.push(FRAME_DELIMITER);
        Ok(wire)
    }

    /// Encodes an already-built [`Frame`].
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is too large.
    pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, FrameError> {
        Self::encode(frame.frame_type(), frame.payload())
    }

    /// Decodes one COBS-encoded frame (delimiter already stripped) and verifies it.
    ///
    /// # Errors
    ///
    /// Returns an error when the bytes are not valid COBS, the frame is too
    /// short, the length field disagrees with the content, or the CRC fails.
    pub fn decode(encoded: &[u8]) -> Result<Frame, FrameError> {
        let decoded = cobs::decode_vec(encoded).map_err(|_invalid| FrameError::Malformed)?;
        if decoded.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort {
                actual: decoded.len(),
            });
        }

        let declared = usize::from(u16::from_le_bytes([decoded[1], decoded[2]]));
        let actual = decoded.len() - MIN_FRAME_LEN;
        if declared != actual {
            return Err(FrameError::LengthMismatch { declared, actual });
        }

        let crc_index = HEADER_LEN + declared;
        let received = decoded[crc_index];
        let calculated = Self::crc8(&decoded[..crc_index]);
        if received != calculated {
            return Err(FrameError::CrcMismatch {
                received,
                calculated,
            });
        }

        Frame::new(decoded[0], &decoded[HEADER_LEN..crc_index])
    }

    /// CRC-8 used by the frame trailer.
    ///
    /// ```
    /// use knob_link::FrameCodec;
    ///
    /// assert_eq!(0xF4, FrameCodec::crc8(b"123456789"));
    /// ```
    #[must_use]
    pub fn crc8(bytes: &[u8]) -> u8 {
        CRC8.checksum(bytes)
    }
}

/// Counters kept by a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct DecoderStats {
    frames: u64,
    discarded: u64,
}

impl DecoderStats {
    /// Number of frames accepted.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of delimited buffers dropped as invalid or oversized.
    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

/// Incremental decoder that turns a raw byte stream into validated frames.
///
/// Invalid input is discarded silently; the decoder re-synchronises on the
/// next delimiter.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    overflowed: bool,
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_ENCODED_FRAME_LEN),
            overflowed: false,
            stats: DecoderStats::default(),
        }
    }

    /// Feeds one byte; returns a frame exactly when a delimiter closes a valid one.
    ///
    /// ```
    /// use knob_link::{FrameCodec, FrameDecoder};
    ///
    /// let mut decoder = FrameDecoder::new();
    /// let wire = FrameCodec::encode(0x01, &[])?;
    /// let frames: Vec<_> = wire.iter().filter_map(|byte| decoder.feed(*byte)).collect();
    /// assert_eq!(1, frames.len());
    /// assert_eq!(0x01, frames[0].frame_type());
    /// # Ok::<(), knob_link::FrameError>(())
    /// ```
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        if byte != FRAME_DELIMITER {
            self.accumulate(byte);
            return None;
        }

        if self.overflowed {
            debug!(
                limit = MAX_ENCODED_FRAME_LEN,
                "delimiter seen after overflow, resuming framing"
            );
            self.overflowed = false;
            self.buffer.clear();
            return None;
        }

        if self.buffer.is_empty() {
            return None;
        }

        let result = FrameCodec::decode(&self.buffer);
        let frame = match result {
            Ok(frame) => {
                self.stats.frames += 1;
                trace!(
                    frame_type = frame.frame_type(),
                    payload_len = frame.payload().len(),
                    "frame decoded"
                );
                Some(frame)
            }
            Err(error) => {
                self.stats.discarded += 1;
                warn!(
                    %error,
                    encoded = %format_hex(&self.buffer[..self.buffer.len().min(16)]),
                    "discarding frame"
                );
                None
            }
        };
        self.buffer.clear();
        frame
    }

    /// Feeds a slice of bytes and collects every frame it completes.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|byte| self.feed(*byte)).collect()
    }

    /// Returns decoder counters.
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Returns whether the decoder is discarding until the next delimiter.
    #[must_use]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    fn accumulate(&mut self, byte: u8) {
        if self.overflowed {
            return;
        }
        if self.buffer.len() < MAX_ENCODED_FRAME_LEN {
            self.buffer.push(byte);
            return;
        }

        let error = FrameError::Overflow {
            limit: MAX_ENCODED_FRAME_LEN,
        };
        warn!(%error, "waiting for delimiter");
        self.stats.discarded += 1;
        self.overflowed = true;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn encode_pong_matches_wire_bytes() {
        let wire = FrameCodec::encode(0xF1, &[]).expect("empty payload should encode");
        assert_eq!(vec![0x02, 0xF1, 0x01, 0x02, 0x07, 0x00], wire);
    }

    #[test]
    fn encode_set_volume_matches_wire_bytes() {
        let wire = FrameCodec::encode(0x07, &[0x46]).expect("one-byte payload should encode");
        assert_eq!(vec![0x03, 0x07, 0x01, 0x03, 0x46, 0xDC, 0x00], wire);
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let payload = vec![0xAA; MAX_PAYLOAD_LEN + 1];
        let result = FrameCodec::encode(0x22, &payload);
        assert_matches!(
            result,
            Err(FrameError::PayloadTooLarge {
                payload_len: 256,
                max_payload_len: MAX_PAYLOAD_LEN,
            })
        );
    }

    #[test]
    fn encoded_frame_never_contains_delimiter_before_end() {
        let payload = vec![0x00; MAX_PAYLOAD_LEN];
        let wire = FrameCodec::encode(0x00, &payload).expect("max payload should encode");
        let (last, body) = wire.split_last().expect("wire form is never empty");
        assert_eq!(FRAME_DELIMITER, *last);
        assert!(!body.contains(&FRAME_DELIMITER));
        assert!(body.len() <= MAX_ENCODED_FRAME_LEN);
    }

    #[rstest]
    #[case::three_bytes(vec![0x04, 0x01, 0x01, 0x01], FrameError::TooShort { actual: 3 })]
    #[case::length(
        vec![0x03, 0x01, 0x05, 0x04, 0xAA, 0xBB, 0x9E],
        FrameError::LengthMismatch { declared: 5, actual: 2 }
    )]
    #[case::crc(vec![0x02, 0xF1, 0x01, 0x02, 0xC8], FrameError::CrcMismatch { received: 0xC8, calculated: 0x07 })]
    fn decode_rejects_invalid_frames(#[case] encoded: Vec<u8>, #[case] expected: FrameError) {
        assert_eq!(Err(expected), FrameCodec::decode(&encoded));
    }

    #[test]
    fn decoder_ignores_idle_delimiters() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(None, decoder.feed(0x00));
        assert_eq!(None, decoder.feed(0x00));
        assert_eq!(DecoderStats::default(), decoder.stats());
    }

    #[test]
    fn decoder_discards_until_delimiter_after_overflow() {
        let mut decoder = FrameDecoder::new();
        for _ in 0..(MAX_ENCODED_FRAME_LEN + 10) {
            assert_eq!(None, decoder.feed(0x5A));
        }
        assert!(decoder.is_overflowed());

        assert_eq!(None, decoder.feed(FRAME_DELIMITER));
        assert!(!decoder.is_overflowed());

        let wire = FrameCodec::encode(0x03, &[]).expect("next frame should encode");
        let frames = decoder.feed_slice(&wire);
        assert_eq!(1, frames.len());
        assert_eq!(0x03, frames[0].frame_type());
        assert_eq!(1, decoder.stats().discarded());
    }
}
