pub mod body;
pub mod forwarding;
pub mod handler;
pub mod http_result;
pub mod server;
pub mod synthetic_response;

pub use http_result::HttpError;
pub use server::run;

use http_body_util::combinators::BoxBody;

/// Boxed response body used on every path back to the client.
pub(crate) type RespBody = BoxBody<bytes::Bytes, crate::error::ProxyError>;
