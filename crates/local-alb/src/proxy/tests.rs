//! Tests for the proxy module.
//!
//! Forwarding tests run against a throwaway hyper upstream on 127.0.0.1.

#[cfg(test)]
mod forwarder_tests {
    use crate::config::{ForwardingConfig, Protocol};
    use crate::pipeline::{ForwardTarget, Forwarder};
    use crate::proxy::{empty_body, full_body, ClientAddr, HttpForwarder};
    use http_body_util::BodyExt;
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Upstream that answers with a JSON object of the request line and headers it saw.
    async fn start_echo_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let service = service_fn(|req: Request<Incoming>| async move {
                        let mut seen = serde_json::Map::new();
                        seen.insert("uri".into(), req.uri().to_string().into());
                        for (name, value) in req.headers() {
                            seen.insert(
                                name.to_string(),
                                value.to_str().unwrap_or_default().into(),
                            );
                        }
                        let body = req.into_body().collect().await.unwrap().to_bytes();
                        seen.insert(
                            "body".into(),
                            String::from_utf8_lossy(&body).into_owned().into(),
                        );
                        let json = serde_json::Value::Object(seen).to_string();
                        Ok::<_, Infallible>(
                            Response::builder()
                                .header("connection", "keep-alive")
                                .body(full_body(json))
                                .unwrap(),
                        )
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        addr
    }

    fn forwarder() -> HttpForwarder {
        let config = ForwardingConfig {
            tls_skip_verify: true,
            ..Default::default()
        };
        HttpForwarder::from_config(&config)
    }

    fn target(port: u16) -> ForwardTarget {
        ForwardTarget {
            host: "127.0.0.1".to_string(),
            port,
            protocol: Protocol::Http,
        }
    }

    #[tokio::test]
    async fn test_forward_preserves_path_host_and_body() {
        let upstream = start_echo_upstream().await;
        let mut req = Request::builder()
            .method("POST")
            .uri("/orders?id=42")
            .header("host", "shop.local")
            .header("x-forwarded-for", "6.6.6.6")
            .body(full_body("payload"))
            .unwrap();
        req.extensions_mut()
            .insert(ClientAddr("10.1.2.3:40000".parse().unwrap()));

        let response = forwarder().forward(&target(upstream.port()), req).await;
        assert_eq!(response.status(), 200);
        assert!(response.headers().get("connection").is_none());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let seen: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(seen["uri"], "/orders?id=42");
        assert_eq!(seen["host"], "shop.local");
        assert_eq!(seen["x-forwarded-for"], "10.1.2.3");
        assert_eq!(seen["x-forwarded-proto"], "http");
        assert_eq!(seen["body"], "payload");
    }

    #[tokio::test]
    async fn test_forward_to_unreachable_target_is_bad_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let req = Request::builder().uri("/").body(empty_body()).unwrap();
        let response = forwarder().forward(&target(port), req).await;

        assert_eq!(response.status(), 502);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "Bad Gateway");
    }
}

#[cfg(test)]
mod handler_tests {
    use crate::auth::StaticAuthProvider;
    use crate::config::Config;
    use crate::matcher::RuleSet;
    use crate::pipeline::{ActionPipeline, ForwardTarget, Forwarder};
    use crate::proxy::handler::{handle, RequestHandlerContext};
    use crate::proxy::{empty_body, text_response, ProxyBody};
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use hyper::{Request, Response, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Never answers within any test deadline.
    #[derive(Default)]
    struct StalledForwarder {
        completed: AtomicUsize,
    }

    #[async_trait]
    impl Forwarder for StalledForwarder {
        async fn forward(
            &self,
            _target: &ForwardTarget,
            _req: Request<ProxyBody>,
        ) -> Response<ProxyBody> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            text_response(StatusCode::OK, "late")
        }
    }

    fn rules(yaml: &str) -> RuleSet {
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        RuleSet::compile(&config).unwrap()
    }

    fn pipeline(forwarder: Arc<StalledForwarder>) -> ActionPipeline {
        ActionPipeline::new(
            Arc::new(StaticAuthProvider::new("local-user")),
            forwarder,
            "/alb/auth",
        )
    }

    fn get(uri: &str) -> Request<ProxyBody> {
        Request::builder().uri(uri).body(empty_body()).unwrap()
    }

    #[tokio::test]
    async fn test_timeout_abandons_pipeline() {
        let rules = rules(
            r#"
listen:
  port: 8080
default_actions:
  - type: forward
    host: backend
    port: 9000
"#,
        );
        let forwarder = Arc::new(StalledForwarder::default());
        let pipeline = pipeline(forwarder.clone());
        let ctx = RequestHandlerContext {
            rules: &rules,
            pipeline: &pipeline,
            request_timeout: Duration::from_millis(50),
        };

        let response = handle(&ctx, get("/")).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(forwarder.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_match_without_default_is_internal_error() {
        let rules = rules(
            r#"
listen:
  port: 8080
rules:
  - conditions:
      - field: path-pattern
        values: ["/only"]
    actions:
      - type: fixed-response
        status_code: 200
"#,
        );
        let pipeline = pipeline(Arc::new(StalledForwarder::default()));
        let ctx = RequestHandlerContext {
            rules: &rules,
            pipeline: &pipeline,
            request_timeout: Duration::from_secs(5),
        };

        assert_eq!(handle(&ctx, get("/only")).await.status(), StatusCode::OK);

        let response = handle(&ctx, get("/elsewhere")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "Internal server error");
    }
}
