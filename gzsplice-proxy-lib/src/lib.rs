#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod gzip;
pub mod inject;
pub mod proxy;

pub use config::{load_from_path, Config};
pub use error::{ProxyError, Result};
pub use gzip::{crc32_combine, GzipError, GzipSplicer, GzipStreamParser, GzipTrailer, Segment};
pub use inject::{InjectionArtifact, DEFAULT_MARKUP};
pub use proxy::{forwarding, run};
