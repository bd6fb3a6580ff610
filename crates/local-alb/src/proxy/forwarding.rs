//! Forwarding to upstream targets.

use super::client::{create_http_client, HttpClient};
use super::headers::{strip_hop_by_hop, X_FORWARDED_FOR, X_FORWARDED_PROTO};
use super::response_ext::{text_response, ProxyBody};
use crate::config::ForwardingConfig;
use crate::metrics;
use crate::pipeline::{ForwardTarget, Forwarder};
use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::header::HeaderValue;
use hyper::{Request, Response, StatusCode, Uri, Version};
use std::net::SocketAddr;
use tracing::{debug, error};

/// Peer address of the connection a request arrived on.
///
/// Attached to every request as an extension by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

/// Plain-text response carrying the status's canonical reason.
pub fn error_response(status: StatusCode) -> Response<ProxyBody> {
    text_response(status, status.canonical_reason().unwrap_or("Error"))
}

/// Forwards over a pooled HTTP/1.1 client.
pub struct HttpForwarder {
    client: HttpClient,
}

impl HttpForwarder {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ForwardingConfig) -> Self {
        Self::new(create_http_client(config))
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        target: &ForwardTarget,
        req: Request<ProxyBody>,
    ) -> Response<ProxyBody> {
        let upstream_req = match upstream_request(target, req) {
            Ok(upstream_req) => upstream_req,
            Err(e) => {
                error!("Failed to build upstream request for {}: {}", target, e);
                metrics::record_forward_error(&target.base_uri());
                return error_response(StatusCode::BAD_GATEWAY);
            }
        };

        debug!("Forwarding to: {}", upstream_req.uri());

        match self.client.request(upstream_req).await {
            Ok(upstream_response) => {
                let (mut parts, body) = upstream_response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, body.boxed())
            }
            Err(e) => {
                error!("Failed to forward request to {}: {}", target, e);
                metrics::record_forward_error(&target.base_uri());
                error_response(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

/// Rewrite an inbound request for `target`.
///
/// The path and query are kept as received and the inbound `Host` header is
/// passed through unchanged.
pub(crate) fn upstream_request(
    target: &ForwardTarget,
    req: Request<ProxyBody>,
) -> Result<Request<ProxyBody>, hyper::http::Error> {
    let (mut parts, body) = req.into_parts();

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    parts.uri = format!("{}{}", target.base_uri(), path).parse::<Uri>()?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);

    if let Some(ClientAddr(addr)) = parts.extensions.get::<ClientAddr>().copied() {
        parts.headers.insert(
            X_FORWARDED_FOR.clone(),
            HeaderValue::from_str(&addr.ip().to_string())?,
        );
    }
    parts
        .headers
        .insert(X_FORWARDED_PROTO.clone(), HeaderValue::from_static("http"));

    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use crate::proxy::empty_body;
    use hyper::header::HOST;

    fn target() -> ForwardTarget {
        ForwardTarget {
            host: "backend".to_string(),
            port: 9000,
            protocol: Protocol::Http,
        }
    }

    #[test]
    fn test_upstream_request_rewrites_uri_and_keeps_host() {
        let mut req = Request::builder()
            .uri("/api/items?id=7")
            .header(HOST, "app.local:8080")
            .header("connection", "keep-alive")
            .header("x-forwarded-for", "10.9.9.9")
            .body(empty_body())
            .unwrap();
        req.extensions_mut()
            .insert(ClientAddr("192.168.1.20:51000".parse().unwrap()));

        let upstream = upstream_request(&target(), req).unwrap();
        assert_eq!(upstream.uri(), "http://backend:9000/api/items?id=7");
        assert_eq!(upstream.headers()[HOST], "app.local:8080");
        assert_eq!(upstream.headers()["x-forwarded-for"], "192.168.1.20");
        assert_eq!(upstream.headers()["x-forwarded-proto"], "http");
        assert!(upstream.headers().get("connection").is_none());
    }

    #[test]
    fn test_upstream_request_https_target() {
        let target = ForwardTarget {
            host: "secure.internal".to_string(),
            port: 443,
            protocol: Protocol::Https,
        };
        let req = Request::builder().uri("/").body(empty_body()).unwrap();

        let upstream = upstream_request(&target, req).unwrap();
        assert_eq!(upstream.uri(), "https://secure.internal:443/");
        assert!(upstream.headers().get("x-forwarded-for").is_none());
    }

    #[test]
    fn test_error_response_reason() {
        let response = error_response(StatusCode::BAD_GATEWAY);
        assert_eq!(response.status(), 502);
        assert_eq!(response.headers()["content-type"], "text/plain");
    }
}
