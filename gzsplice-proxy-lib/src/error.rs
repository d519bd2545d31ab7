use thiserror::Error;

use crate::gzip::GzipError;
use crate::inject::InjectError;

/// Errors that can occur in the proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Injection artifact error: {0}")]
    Inject(#[from] InjectError),

    #[error("Gzip container error: {0}")]
    Gzip(#[from] GzipError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] hyper::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;
