//! HTTP boundary of the load balancer.
//!
//! # Module Structure
//!
//! - `server` - AlbServer struct and main run loop
//! - `handler` - rule selection and pipeline execution per request
//! - `forwarding` - `HttpForwarder`, the forwarding collaborator used in production
//! - `headers` - identity and hop-by-hop header handling
//! - `client` - HTTP client creation and configuration
//! - `tls` - certificate verification override for upstreams
//! - `network` - listener creation
//! - `response_ext` - body type and response helpers

mod client;
mod forwarding;
mod handler;
mod headers;
mod network;
mod response_ext;
mod server;
mod tls;

#[cfg(test)]
mod tests;

pub use client::{create_http_client, HttpClient};
pub use forwarding::{error_response, ClientAddr, HttpForwarder};
pub use headers::{
    apply_identity, identity_headers, strip_identity_headers, X_AMZN_OIDC_ACCESSTOKEN,
    X_AMZN_OIDC_DATA, X_AMZN_OIDC_IDENTITY,
};
pub use network::create_reusable_listener;
pub use response_ext::{empty_body, full_body, text_response, ProxyBody, ResponseExt};
pub use server::AlbServer;
