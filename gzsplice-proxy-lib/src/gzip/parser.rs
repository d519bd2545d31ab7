//! Incremental RFC 1952 member parser.
//!
//! The parser consumes a gzip member as arbitrarily chunked input and emits
//! segments: header bytes to relay verbatim, then compressed-data bytes.
//! Because the compressed-data length is unknown until end of input, the
//! final 8 buffered bytes are always withheld; `finish` resolves them as the
//! trailer once the input ends.

use bytes::{Bytes, BytesMut};

use super::GzipError;

/// FLG bit: 2-byte header CRC after the optional fields.
const FHCRC: u8 = 1 << 1;
/// FLG bit: extra field (u16 LE length + payload) after the fixed header.
const FEXTRA: u8 = 1 << 2;
/// FLG bit: NUL-terminated original file name.
const FNAME: u8 = 1 << 3;
/// FLG bit: NUL-terminated comment.
const FCOMMENT: u8 = 1 << 4;

const FIXED_HEADER_LEN: usize = 10;
const TRAILER_LEN: usize = 8;

/// Decoded member trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Uncompressed length mod 2^32 (ISIZE).
    pub input_size: u32,
}

/// One parsed piece of a member, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Fixed-header or optional-field bytes, relayed verbatim.
    Header(Bytes),
    /// Compressed-data bytes that can no longer be part of the trailer.
    Data(Bytes),
}

#[derive(Debug, Clone, Copy)]
enum State {
    FixedHeader,
    ExtraLen,
    ExtraData { remaining: usize },
    FileName,
    Comment,
    HeaderCrc,
    Body,
    Done { trailer: GzipTrailer },
}

/// Resumable gzip member parser.
///
/// Feed input with [`feed`](Self::feed), then drain
/// [`next_segment`](Self::next_segment) until it returns `None`; repeat for
/// every chunk. When the input ends, call [`finish`](Self::finish) to obtain
/// the trailer. Progress never depends on where chunk boundaries fall.
#[derive(Debug)]
pub struct GzipStreamParser {
    state: State,
    buf: BytesMut,
    flags: u8,
}

impl GzipStreamParser {
    pub fn new() -> Self {
        Self { state: State::FixedHeader, buf: BytesMut::new(), flags: 0 }
    }

    /// Append one input chunk.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Advance the state machine and return the next segment, or `None` when
    /// no progress is possible with the input buffered so far.
    pub fn next_segment(&mut self) -> Option<Segment> {
        loop {
            match self.state {
                State::FixedHeader => {
                    if self.buf.len() < FIXED_HEADER_LEN {
                        return None;
                    }
                    self.flags = self.buf[3];
                    self.state = if self.flags & FEXTRA != 0 {
                        State::ExtraLen
                    } else {
                        self.after_extra()
                    };
                    return Some(Segment::Header(self.buf.split_to(FIXED_HEADER_LEN).freeze()));
                }
                State::ExtraLen => {
                    if self.buf.len() < 2 {
                        return None;
                    }
                    let len = u16::from_le_bytes([self.buf[0], self.buf[1]]) as usize;
                    self.state = State::ExtraData { remaining: len };
                    return Some(Segment::Header(self.buf.split_to(2).freeze()));
                }
                State::ExtraData { remaining } => {
                    if remaining == 0 {
                        self.state = self.after_extra();
                        continue;
                    }
                    if self.buf.is_empty() {
                        return None;
                    }
                    let take = remaining.min(self.buf.len());
                    self.state = State::ExtraData { remaining: remaining - take };
                    return Some(Segment::Header(self.buf.split_to(take).freeze()));
                }
                State::FileName => {
                    let (bytes, terminated) = self.take_terminated()?;
                    if terminated {
                        self.state = self.after_name();
                    }
                    return Some(Segment::Header(bytes));
                }
                State::Comment => {
                    let (bytes, terminated) = self.take_terminated()?;
                    if terminated {
                        self.state = self.after_comment();
                    }
                    return Some(Segment::Header(bytes));
                }
                State::HeaderCrc => {
                    if self.buf.len() < 2 {
                        return None;
                    }
                    self.state = State::Body;
                    return Some(Segment::Header(self.buf.split_to(2).freeze()));
                }
                State::Body => {
                    // Withhold the trailer-sized lookahead; everything before
                    // it is definitely compressed data.
                    if self.buf.len() <= TRAILER_LEN {
                        return None;
                    }
                    let take = self.buf.len() - TRAILER_LEN;
                    return Some(Segment::Data(self.buf.split_to(take).freeze()));
                }
                State::Done { .. } => return None,
            }
        }
    }

    /// Minimum further input before [`next_segment`](Self::next_segment) can
    /// make progress; 0 when progress is possible right now or the member is
    /// complete. In the body, the requirement disappears at end of input,
    /// where [`finish`](Self::finish) resolves the retained bytes instead.
    pub fn bytes_needed(&self) -> usize {
        match self.state {
            State::FixedHeader => FIXED_HEADER_LEN.saturating_sub(self.buf.len()),
            State::ExtraLen | State::HeaderCrc => 2usize.saturating_sub(self.buf.len()),
            State::ExtraData { remaining } => {
                if remaining == 0 || !self.buf.is_empty() {
                    0
                } else {
                    1
                }
            }
            State::FileName | State::Comment => usize::from(self.buf.is_empty()),
            State::Body => (TRAILER_LEN + 1).saturating_sub(self.buf.len()),
            State::Done { .. } => 0,
        }
    }

    /// Resolve the end of input.
    ///
    /// Call after the input stream ends and `next_segment` has been drained.
    /// Returns the trailer, or an error if the member was cut short.
    /// Idempotent once the trailer has been parsed.
    pub fn finish(&mut self) -> Result<GzipTrailer, GzipError> {
        match self.state {
            State::Done { trailer } => Ok(trailer),
            State::Body => {
                debug_assert!(
                    self.buf.len() <= TRAILER_LEN,
                    "data segments not drained before finish"
                );
                if self.buf.len() < TRAILER_LEN {
                    return Err(GzipError::TruncatedTrailer(self.buf.len()));
                }
                let tail = self.buf.split_off(self.buf.len() - TRAILER_LEN);
                let crc32 = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
                let input_size = u32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]);
                let trailer = GzipTrailer { crc32, input_size };
                self.state = State::Done { trailer };
                Ok(trailer)
            }
            State::FixedHeader => Err(GzipError::TruncatedHeader("fixed header")),
            State::ExtraLen | State::ExtraData { .. } => {
                Err(GzipError::TruncatedHeader("extra field"))
            }
            State::FileName => Err(GzipError::TruncatedHeader("file name field")),
            State::Comment => Err(GzipError::TruncatedHeader("comment field")),
            State::HeaderCrc => Err(GzipError::TruncatedHeader("header crc")),
        }
    }

    /// Split off buffered bytes up to and including a NUL terminator, or all
    /// buffered bytes while the terminator has not arrived.
    fn take_terminated(&mut self) -> Option<(Bytes, bool)> {
        if self.buf.is_empty() {
            return None;
        }
        match self.buf.iter().position(|&b| b == 0) {
            Some(i) => Some((self.buf.split_to(i + 1).freeze(), true)),
            None => {
                let len = self.buf.len();
                Some((self.buf.split_to(len).freeze(), false))
            }
        }
    }

    fn after_extra(&self) -> State {
        if self.flags & FNAME != 0 {
            State::FileName
        } else {
            self.after_name()
        }
    }

    fn after_name(&self) -> State {
        if self.flags & FCOMMENT != 0 {
            State::Comment
        } else {
            self.after_comment()
        }
    }

    fn after_comment(&self) -> State {
        if self.flags & FHCRC != 0 {
            State::HeaderCrc
        } else {
            State::Body
        }
    }
}

impl Default for GzipStreamParser {
    fn default() -> Self {
        Self::new()
    }
}
