//! Per-request handling: rule selection, pipeline execution under the request
//! deadline, logging and metrics.

use super::forwarding::{error_response, ClientAddr};
use super::response_ext::ProxyBody;
use crate::matcher::{RuleSet, Selection};
use crate::metrics;
use crate::pipeline::{ActionPipeline, Outcome};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Shared, read-only state needed to handle one request.
pub struct RequestHandlerContext<'a> {
    pub rules: &'a RuleSet,
    pub pipeline: &'a ActionPipeline,
    pub request_timeout: Duration,
}

/// Handle an inbound request. Never fails; every error becomes a response.
pub async fn handle_request(
    ctx: &RequestHandlerContext<'_>,
    req: Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<Response<ProxyBody>, Infallible> {
    let mut req = req.map(|body| body.boxed());
    req.extensions_mut().insert(ClientAddr(remote_addr));
    Ok(handle(ctx, req).await)
}

pub(crate) async fn handle(
    ctx: &RequestHandlerContext<'_>,
    req: Request<ProxyBody>,
) -> Response<ProxyBody> {
    let start_time = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    debug!("Received request: {} {}", method, uri);

    let (actions, selection) = ctx.rules.resolve(&req);
    match selection {
        Selection::Rule(name) => {
            info!("Request {} {} matched rule '{}'", method, uri.path(), name)
        }
        Selection::Default => info!(
            "Request {} {} matched no rule, using default actions",
            method,
            uri.path()
        ),
    }
    let source = if actions.is_empty() {
        "none"
    } else {
        selection.label()
    };

    let (response, outcome) =
        match tokio::time::timeout(ctx.request_timeout, ctx.pipeline.run(actions, req)).await {
            Ok(outcome) => {
                let label = outcome.label();
                match &outcome {
                    Outcome::Failed(e) if e.is_misconfiguration() => {
                        error!("Misconfigured actions for {} {}: {}", method, uri, e)
                    }
                    Outcome::Failed(e) => error!("Request {} {} failed: {}", method, uri, e),
                    Outcome::Forwarded { target, response } => {
                        debug!("Forwarded to {} ({})", target, response.status())
                    }
                    Outcome::Responded(_) => {}
                }
                (outcome.into_response(), label)
            }
            Err(_) => {
                warn!(
                    "Request {} {} timed out after {}s",
                    method,
                    uri,
                    ctx.request_timeout.as_secs()
                );
                (error_response(StatusCode::GATEWAY_TIMEOUT), "timeout")
            }
        };

    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    metrics::record_request(source, outcome, response.status().as_u16(), duration_ms);

    response
}
