use http::StatusCode;
use thiserror::Error;

/// HTTP result type, T is typically a hyper::Response
/// HttpError is used to generate a synthetic error response
pub(crate) type HttpResult<T> = std::result::Result<T, HttpError>;

/// Describes things that can go wrong while relaying one request
///
/// The Display text doubles as the plain-text body of the synthetic
/// response sent back to the client.
#[derive(Debug, Error, Clone)]
pub enum HttpError {
    #[error("invalid target url")]
    InvalidTargetUrl,

    #[error("invalid target url protocol")]
    InvalidTargetScheme,

    #[error("Failed to get response from target: {0}")]
    UpstreamRequest(String),
}

impl From<HttpError> for StatusCode {
    fn from(e: HttpError) -> StatusCode {
        match e {
            HttpError::InvalidTargetUrl => StatusCode::BAD_REQUEST,
            HttpError::InvalidTargetScheme => StatusCode::BAD_REQUEST,
            HttpError::UpstreamRequest(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
