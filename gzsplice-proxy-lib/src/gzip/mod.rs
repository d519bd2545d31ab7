//! Streaming gzip container handling: the incremental member parser, the
//! CRC-32 combiner, and the splicer that stitches a precompressed fragment
//! into a member in flight.

mod crc32;
mod parser;
mod splicer;

pub use crc32::crc32_combine;
pub use parser::{GzipStreamParser, GzipTrailer, Segment};
pub use splicer::GzipSplicer;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GzipError {
    /// Input ended while still inside the member header.
    #[error("gzip stream ended inside the {0}")]
    TruncatedHeader(&'static str),
    /// Input ended before the full 8-byte trailer arrived.
    #[error("gzip stream ended with {0} trailer byte(s), expected 8")]
    TruncatedTrailer(usize),
}
