//! Startup-time construction of the injected fragment's compressed form.

use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::gzip::{GzipError, GzipStreamParser, Segment};

/// Markup injected when the configuration does not override it.
pub const DEFAULT_MARKUP: &str =
    "<!doctype html><script>console.warn(\"gzsplice injected\")</script>\n";

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("failed to compress the injection markup: {0}")]
    Compress(#[from] std::io::Error),
    #[error("compressed markup did not parse back: {0}")]
    Reparse(#[from] GzipError),
    #[error("artifact self-check failed: {0}")]
    SelfCheck(&'static str),
}

/// The precompressed injection fragment, built once at startup and shared by
/// every connection.
///
/// `compressed` holds the fragment's gzip compressed-data region with the
/// member header and trailer stripped. The encoder is flushed, not finished,
/// at the capture point, so the region ends byte-aligned with the deflate
/// stream still open: the original member's blocks continue right after it
/// and supply the single terminating block.
#[derive(Debug, Clone)]
pub struct InjectionArtifact {
    markup: Bytes,
    compressed: Bytes,
    crc32: u32,
    plain_size: u32,
}

impl InjectionArtifact {
    /// Compress `markup` and capture the splice-ready fragment.
    ///
    /// The builder parses its own output with [`GzipStreamParser`] to locate
    /// the header/payload split and read the trailer back, then checks the
    /// trailer against an independently computed CRC and the markup length.
    /// Any failure here is fatal to startup.
    pub fn build(markup: &[u8]) -> Result<Self, InjectError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(markup)?;
        // Sync flush: byte-aligns the deflate stream without terminating it.
        encoder.flush()?;
        let flushed = encoder.get_ref().len();
        let member = encoder.finish()?;

        let mut parser = GzipStreamParser::new();
        parser.feed(&member);
        let mut header_len = 0usize;
        while let Some(segment) = parser.next_segment() {
            if let Segment::Header(bytes) = segment {
                header_len += bytes.len();
            }
        }
        let trailer = parser.finish()?;

        if header_len > flushed {
            return Err(InjectError::SelfCheck("flush point fell inside the member header"));
        }
        if trailer.input_size as usize != markup.len() {
            return Err(InjectError::SelfCheck("trailer length does not match the markup"));
        }
        if trailer.crc32 != crc32fast::hash(markup) {
            return Err(InjectError::SelfCheck("trailer CRC does not match the markup"));
        }

        Ok(Self {
            markup: Bytes::copy_from_slice(markup),
            compressed: Bytes::copy_from_slice(&member[header_len..flushed]),
            crc32: trailer.crc32,
            plain_size: trailer.input_size,
        })
    }

    /// The plain fragment, for responses that are not gzip-encoded.
    pub fn markup(&self) -> &Bytes {
        &self.markup
    }

    /// The fragment's compressed-data region: header-stripped,
    /// trailer-stripped, byte-aligned, unterminated.
    pub fn compressed(&self) -> &[u8] {
        &self.compressed
    }

    /// Standalone CRC-32 of the plain fragment.
    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    /// Fragment length in bytes.
    pub fn plain_size(&self) -> u32 {
        self.plain_size
    }
}
