//! Compiled actions.
//!
//! Actions are compiled once from configuration: status codes are checked,
//! redirect locations are built and validated, header values are parsed.
//! Nothing here can fail per request.

use crate::config::{ActionConfig, Protocol, RedirectConfig, UnauthenticatedPolicy};
use anyhow::Context;
use bytes::Bytes;
use hyper::header::HeaderValue;
use hyper::{StatusCode, Uri};
use std::fmt;

#[derive(Debug, Clone)]
pub enum Action {
    Forward(ForwardTarget),
    Redirect(Redirect),
    FixedResponse(FixedResponse),
    AuthenticateOidc(Authenticate),
}

/// Upstream a forward action hands the request to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl ForwardTarget {
    /// `scheme://host:port`, without a trailing slash
    pub fn base_uri(&self) -> String {
        format!("{}://{}:{}", self.protocol.as_str(), self.host, self.port)
    }
}

impl fmt::Display for ForwardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_uri())
    }
}

#[derive(Debug, Clone)]
pub struct Redirect {
    pub status: StatusCode,
    pub location: HeaderValue,
}

#[derive(Debug, Clone)]
pub struct FixedResponse {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct Authenticate {
    pub on_unauthenticated: UnauthenticatedPolicy,
    pub scope: String,
}

impl Action {
    pub fn compile(config: &ActionConfig) -> Result<Self, anyhow::Error> {
        let action = match config {
            ActionConfig::Forward(forward) => Action::Forward(ForwardTarget {
                host: forward.host.clone(),
                port: forward.port,
                protocol: forward.protocol,
            }),
            ActionConfig::Redirect(redirect) => {
                let location = redirect_location(redirect)?;
                Action::Redirect(Redirect {
                    status: StatusCode::from_u16(redirect.status_code.as_u16())?,
                    location: HeaderValue::from_str(&location)
                        .with_context(|| format!("Invalid redirect location '{location}'"))?,
                })
            }
            ActionConfig::FixedResponse(fixed) => Action::FixedResponse(FixedResponse {
                status: StatusCode::from_u16(fixed.status_code).with_context(|| {
                    format!("Invalid fixed-response status_code {}", fixed.status_code)
                })?,
                content_type: HeaderValue::from_str(&fixed.content_type).with_context(|| {
                    format!("Invalid fixed-response content_type '{}'", fixed.content_type)
                })?,
                body: Bytes::from(fixed.message_body.clone()),
            }),
            ActionConfig::AuthenticateOidc(auth) => Action::AuthenticateOidc(Authenticate {
                on_unauthenticated: auth.on_unauthenticated_request,
                scope: auth.scope.clone(),
            }),
        };
        Ok(action)
    }

    /// Every kind except authentication ends the pipeline
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Action::AuthenticateOidc(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Forward(_) => "forward",
            Action::Redirect(_) => "redirect",
            Action::FixedResponse(_) => "fixed-response",
            Action::AuthenticateOidc(_) => "authenticate-oidc",
        }
    }
}

pub fn compile_actions(configs: &[ActionConfig]) -> Result<Vec<Action>, anyhow::Error> {
    configs
        .iter()
        .enumerate()
        .map(|(index, config)| {
            Action::compile(config)
                .with_context(|| format!("{} action at position {}", config.kind(), index + 1))
        })
        .collect()
}

/// Build `protocol://host[:port]/path[?query]` from literal redirect fields.
pub fn redirect_location(redirect: &RedirectConfig) -> Result<String, anyhow::Error> {
    let mut location = format!("{}://{}", redirect.protocol.as_str(), redirect.host);

    if let Some(port) = redirect.port {
        location.push_str(&format!(":{port}"));
    }

    if !redirect.path.starts_with('/') {
        location.push('/');
    }
    location.push_str(&redirect.path);

    let query = redirect.query.trim_start_matches('?');
    if !query.is_empty() {
        location.push('?');
        location.push_str(query);
    }

    location
        .parse::<Uri>()
        .with_context(|| format!("Invalid redirect location '{location}'"))?;

    Ok(location)
}
