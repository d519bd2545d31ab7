//! Streaming splice of a precompressed fragment into a gzip member.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::inject::InjectionArtifact;

use super::crc32::crc32_combine;
use super::parser::{GzipStreamParser, Segment};
use super::GzipError;

/// Splices an [`InjectionArtifact`] into a gzip member as it streams
/// through, without touching the original compressed data.
///
/// Output order: the original header verbatim, the fragment's compressed
/// bytes, the original compressed-data region untouched, then a rebuilt
/// trailer. The rebuilt CRC combines the fragment's CRC with the original's;
/// the rebuilt length is their sum mod 2^32.
pub struct GzipSplicer {
    parser: GzipStreamParser,
    artifact: Arc<InjectionArtifact>,
    injected: bool,
}

impl GzipSplicer {
    pub fn new(artifact: Arc<InjectionArtifact>) -> Self {
        Self { parser: GzipStreamParser::new(), artifact, injected: false }
    }

    /// Process one upstream chunk, returning bytes ready for the client.
    ///
    /// The result may be empty while the parser waits out its trailer
    /// lookahead or a header field spanning a chunk boundary.
    pub fn push(&mut self, chunk: &[u8]) -> Bytes {
        self.parser.feed(chunk);
        let mut out = BytesMut::with_capacity(chunk.len());
        self.drain(&mut out);
        out.freeze()
    }

    /// Signal end of the upstream body.
    ///
    /// Returns the final bytes for the client: the fragment, if the member's
    /// data region was so short that no data segment ever surfaced it, and
    /// the rebuilt trailer. Call once, after the last `push`.
    pub fn finish(&mut self) -> Result<Bytes, GzipError> {
        let mut out = BytesMut::with_capacity(self.artifact.compressed().len() + 8);
        self.drain(&mut out);
        let trailer = self.parser.finish()?;
        if !self.injected {
            out.extend_from_slice(self.artifact.compressed());
            self.injected = true;
        }
        let crc = crc32_combine(
            self.artifact.crc32(),
            trailer.crc32,
            u64::from(trailer.input_size),
        );
        let len = trailer.input_size.wrapping_add(self.artifact.plain_size());
        out.put_u32_le(crc);
        out.put_u32_le(len);
        Ok(out.freeze())
    }

    fn drain(&mut self, out: &mut BytesMut) {
        while let Some(segment) = self.parser.next_segment() {
            match segment {
                Segment::Header(bytes) => out.extend_from_slice(&bytes),
                Segment::Data(bytes) => {
                    // The fragment goes in front of the first data byte; the
                    // header bytes stay ahead of it.
                    if !self.injected {
                        out.extend_from_slice(self.artifact.compressed());
                        self.injected = true;
                    }
                    out.extend_from_slice(&bytes);
                }
            }
        }
    }
}
