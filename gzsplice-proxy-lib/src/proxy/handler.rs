use std::net::SocketAddr;
use std::sync::Arc;

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, Request, Response, StatusCode};
use hyper::body::Incoming;
use tracing::debug;

use crate::inject::InjectionArtifact;
use crate::proxy::body::{passthrough_body, prepend_body, splice_body};
use crate::proxy::forwarding::{extract_target, forward, UpstreamClient};
use crate::proxy::http_result::HttpResult;
use crate::proxy::RespBody;

/// Relay one client request: resolve the target, forward upstream, and
/// inject into eligible HTML responses on the way back.
pub(crate) async fn handle_request(
    req: Request<Incoming>,
    client: &UpstreamClient,
    artifact: &Arc<InjectionArtifact>,
    peer: SocketAddr,
) -> HttpResult<Response<RespBody>> {
    let target = extract_target(req.uri())?;
    debug!(?peer, target = %target, method = %req.method(), "forwarding");

    let resp = forward(req, target, client).await?;
    let (mut parts, body) = resp.into_parts();

    if !should_inject(parts.status, &parts.headers) {
        return Ok(Response::from_parts(parts, passthrough_body(body)));
    }

    // The body is about to change length; framing falls back to chunked.
    parts.headers.remove(CONTENT_LENGTH);

    let transformed = if is_gzip_encoded(&parts.headers) {
        debug!(?peer, status = %parts.status, "splicing into gzip body");
        splice_body(body, Arc::clone(artifact))
    } else {
        debug!(?peer, status = %parts.status, "prepending to plain body");
        prepend_body(body, artifact.markup().clone())
    };

    Ok(Response::from_parts(parts, transformed))
}

/// Injection applies only to HTML responses that carry a body: 204 and 304
/// are relayed untouched, as is anything whose content-type does not say
/// text/html. A missing content-type counts as non-HTML.
pub fn should_inject(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return false;
    }
    header_contains(headers, CONTENT_TYPE, "text/html")
}

/// Whether the response body is gzip-encoded.
pub fn is_gzip_encoded(headers: &HeaderMap) -> bool {
    header_contains(headers, CONTENT_ENCODING, "gzip")
}

fn header_contains(headers: &HeaderMap, name: HeaderName, needle: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains(needle))
}
