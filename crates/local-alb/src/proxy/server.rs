//! AlbServer struct and main run loop.

use super::forwarding::{error_response, HttpForwarder};
use super::handler::{handle_request, RequestHandlerContext};
use super::network::create_reusable_listener;
use super::response_ext::{ProxyBody, ResponseExt};
use crate::auth::{create_auth_provider, AuthProvider};
use crate::config::Config;
use crate::matcher::RuleSet;
use crate::metrics::collect_metrics;
use crate::pipeline::{ActionPipeline, Forwarder};
use anyhow::Context;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The listener: compiled rules plus the collaborators the actions need.
pub struct AlbServer {
    config: Config,
    rules: RuleSet,
    pipeline: ActionPipeline,
}

impl AlbServer {
    /// Compile `config` and create the configured auth provider and HTTP forwarder.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let auth = create_auth_provider(&config.auth)?;
        let forwarder = Arc::new(HttpForwarder::from_config(&config.forwarding));
        Self::with_collaborators(config, auth, forwarder)
    }

    pub fn with_collaborators(
        config: Config,
        auth: Arc<dyn AuthProvider>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Result<Self, anyhow::Error> {
        let rules = RuleSet::compile(&config)?;
        let pipeline = ActionPipeline::new(auth, forwarder, config.auth.login_path.clone());

        Ok(Self {
            config,
            rules,
            pipeline,
        })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Bind the configured listen address and serve until the task is cancelled.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.config.listen.socket_addr()?;
        let listener = create_reusable_listener(addr)
            .with_context(|| format!("Failed to bind listener on {addr}"))?;
        self.run_with_listener(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        let addr = listener.local_addr()?;
        info!("Listening on http://{}", addr);
        info!(
            "Loaded {} rules and {} default actions",
            self.rules.rules().len(),
            self.rules.default_actions().len()
        );

        if let Some(metrics) = &self.config.metrics {
            let metrics_addr = SocketAddr::new(addr.ip(), metrics.port);
            let metrics_listener = create_reusable_listener(metrics_addr)
                .with_context(|| format!("Failed to bind metrics listener on {metrics_addr}"))?;
            info!("Serving metrics on http://{}/metrics", metrics_addr);
            tokio::spawn(serve_metrics(metrics_listener));
        }

        let server = Arc::new(self);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { server.handle_request_internal(req, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }

    async fn handle_request_internal(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Response<ProxyBody>, Infallible> {
        let ctx = RequestHandlerContext {
            rules: &self.rules,
            pipeline: &self.pipeline,
            request_timeout: Duration::from_secs(self.config.listen.request_timeout_secs),
        };

        handle_request(&ctx, req, remote_addr).await
    }
}

async fn serve_metrics(listener: TcpListener) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Metrics listener failed: {}", e);
                return;
            }
        };

        tokio::spawn(async move {
            let service = service_fn(|req: Request<Incoming>| async move {
                Ok::<_, Infallible>(metrics_response(req.method(), req.uri().path()))
            });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                error!("Error serving metrics to {}: {}", remote_addr, err);
            }
        });
    }
}

fn metrics_response(method: &Method, path: &str) -> Response<ProxyBody> {
    if *method != Method::GET || path != "/metrics" {
        return error_response(StatusCode::NOT_FOUND);
    }

    let mut response = Response::new(Full::new(Bytes::from(collect_metrics())));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response.into_boxed()
}
