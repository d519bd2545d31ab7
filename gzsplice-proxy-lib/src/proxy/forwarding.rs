use std::time::Duration;

use http::header::{ACCEPT_ENCODING, HOST};
use http::{HeaderMap, HeaderValue, Request, Response, Uri, Version};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::TimeoutConfig;
use crate::proxy::http_result::{HttpError, HttpResult};

pub(crate) type UpstreamClient = Client<HttpsConnector<HttpConnector>, Incoming>;

/// Pull the target URL out of the request path.
///
/// The proxy is addressed as `http://host:port/?<target-url>`: the literal
/// `/?` prefix is stripped textually and the remainder must parse as an
/// absolute http or https URL. Anything else is rejected here, before any
/// upstream connection is dialed.
pub fn extract_target(uri: &Uri) -> HttpResult<Uri> {
    let raw = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let target: Uri = raw
        .replacen("/?", "", 1)
        .parse()
        .map_err(|_| HttpError::InvalidTargetUrl)?;
    match (target.scheme_str(), target.authority()) {
        (Some("http" | "https"), Some(_)) => Ok(target),
        (Some(_), _) => Err(HttpError::InvalidTargetScheme),
        _ => Err(HttpError::InvalidTargetUrl),
    }
}

/// Narrow `accept-encoding` so upstream only ever replies gzip or identity.
///
/// If the client advertised gzip on any accept-encoding line, the forwarded
/// header becomes exactly `gzip`; otherwise it is removed and upstream must
/// answer unencoded.
pub fn rewrite_accept_encoding(headers: &mut HeaderMap) {
    let advertises_gzip = headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("gzip"));
    if advertises_gzip {
        // insert replaces all existing lines of the header.
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    } else {
        headers.remove(ACCEPT_ENCODING);
    }
}

/// Build the shared upstream client: one pool serving both http and https
/// targets over HTTP/1.1.
pub(crate) fn create_client(timeout: &TimeoutConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_millis(timeout.connect_ms)));
    connector.enforce_http(false);

    let https = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(connector);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_millis(timeout.idle_ms))
        .build(https)
}

/// Rewrite the client request onto the target and dispatch it upstream.
///
/// The method, body, and remaining headers pass through; the host header is
/// replaced with the target authority and accept-encoding is narrowed.
pub(crate) async fn forward(
    req: Request<Incoming>,
    target: Uri,
    client: &UpstreamClient,
) -> HttpResult<Response<Incoming>> {
    let (mut parts, body) = req.into_parts();

    let host = match target.authority() {
        Some(authority) => HeaderValue::from_str(authority.as_str())
            .map_err(|e| HttpError::UpstreamRequest(format!("invalid target host: {e}")))?,
        None => return Err(HttpError::InvalidTargetUrl),
    };

    rewrite_accept_encoding(&mut parts.headers);
    parts.headers.insert(HOST, host);
    parts.uri = target;
    // Upstream is always spoken HTTP/1.1, whatever the client used.
    parts.version = Version::HTTP_11;

    client
        .request(Request::from_parts(parts, body))
        .await
        .map_err(|e| HttpError::UpstreamRequest(e.to_string()))
}
