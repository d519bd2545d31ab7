use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;

use crate::proxy::http_result::HttpError;
use crate::proxy::RespBody;

/// Build the plain-text response for a locally handled error.
///
/// These replies never touch upstream: a malformed target short-circuits
/// before any connection is dialed, and an upstream dial failure is
/// reported the same way.
pub(crate) fn error_text_response(err: &HttpError) -> Response<RespBody> {
    let mut res = Response::new(full_body(err.to_string()));
    *res.status_mut() = StatusCode::from(err.clone());
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}

fn full_body(text: String) -> RespBody {
    Full::new(Bytes::from(text))
        .map_err(|never| match never {})
        .boxed()
}
