//! Per-request execution of an action list.
//!
//! The cursor and the `AuthContext` are locals of [`ActionPipeline::run`], so
//! nothing established for one request is visible to another.

use super::action::{Action, Authenticate, FixedResponse, ForwardTarget, Redirect};
use super::error::PipelineError;
use super::Forwarder;
use crate::auth::{AuthContext, AuthProvider};
use crate::config::UnauthenticatedPolicy;
use crate::metrics;
use crate::proxy::{apply_identity, empty_body, full_body, text_response, ProxyBody};
use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a pipeline run ended.
#[derive(Debug)]
pub enum Outcome {
    /// A fixed response, redirect, denial or login redirect was written
    Responded(Response<ProxyBody>),
    /// The request was handed to `target`; `response` is whatever the forwarder returned
    Forwarded {
        target: ForwardTarget,
        response: Response<ProxyBody>,
    },
    Failed(PipelineError),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Responded(_) => "responded",
            Outcome::Forwarded { .. } => "forwarded",
            Outcome::Failed(_) => "failed",
        }
    }

    /// The response to send to the client. Failures become a generic 500.
    pub fn into_response(self) -> Response<ProxyBody> {
        match self {
            Outcome::Responded(response) | Outcome::Forwarded { response, .. } => response,
            Outcome::Failed(_) => internal_error(),
        }
    }
}

pub fn internal_error() -> Response<ProxyBody> {
    text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

enum AuthStep {
    /// Move to the next action, with or without an identity
    Continue(Option<AuthContext>),
    /// Stop with this response
    Respond(Response<ProxyBody>),
}

/// Runs action lists against requests using the configured collaborators.
pub struct ActionPipeline {
    auth: Arc<dyn AuthProvider>,
    forwarder: Arc<dyn Forwarder>,
    login_path: String,
}

impl ActionPipeline {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        forwarder: Arc<dyn Forwarder>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            forwarder,
            login_path: login_path.into(),
        }
    }

    pub async fn run(&self, actions: &[Action], req: Request<ProxyBody>) -> Outcome {
        if actions.is_empty() {
            return Outcome::Failed(PipelineError::EmptyActions);
        }

        let mut identity: Option<AuthContext> = None;

        for (index, action) in actions.iter().enumerate() {
            match action {
                Action::AuthenticateOidc(step) => {
                    if index != 0 {
                        return Outcome::Failed(PipelineError::MisplacedAuthentication {
                            position: index + 1,
                        });
                    }
                    match self.authenticate(step, &req).await {
                        Ok(AuthStep::Continue(established)) => identity = established,
                        Ok(AuthStep::Respond(response)) => return Outcome::Responded(response),
                        Err(e) => return Outcome::Failed(e),
                    }
                }
                Action::FixedResponse(fixed) => return Outcome::Responded(fixed_response(fixed)),
                Action::Redirect(redirect) => {
                    return Outcome::Responded(redirect_response(redirect))
                }
                Action::Forward(target) => {
                    return self.forward(target, req, identity.as_ref()).await
                }
            }
        }

        Outcome::Failed(PipelineError::UnterminatedActions)
    }

    async fn authenticate(
        &self,
        step: &Authenticate,
        req: &Request<ProxyBody>,
    ) -> Result<AuthStep, PipelineError> {
        let identity = match self.auth.authenticate(req, &step.scope).await {
            Ok(identity) => identity,
            Err(e) => {
                metrics::record_authentication("error");
                return Err(e.into());
            }
        };

        if let Some(identity) = identity {
            metrics::record_authentication("authenticated");
            debug!("Authenticated as '{}'", identity.username);
            return Ok(AuthStep::Continue(Some(identity)));
        }

        metrics::record_authentication("unauthenticated");
        match step.on_unauthenticated {
            UnauthenticatedPolicy::Allow => {
                debug!("Not authenticated, continuing anonymously");
                Ok(AuthStep::Continue(None))
            }
            UnauthenticatedPolicy::Deny => {
                warn!("Denied unauthenticated request: {} {}", req.method(), req.uri());
                Ok(AuthStep::Respond(text_response(
                    StatusCode::UNAUTHORIZED,
                    "Unauthorized",
                )))
            }
            UnauthenticatedPolicy::Authenticate => {
                Ok(AuthStep::Respond(self.login_redirect(&step.scope, req)?))
            }
        }
    }

    fn login_redirect(
        &self,
        scope: &str,
        req: &Request<ProxyBody>,
    ) -> Result<Response<ProxyBody>, PipelineError> {
        let original = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let location = format!(
            "{}?scope={}&redirect_uri={}",
            self.login_path,
            urlencoding::encode(scope),
            urlencoding::encode(original)
        );
        debug!("Redirecting to login: {}", location);

        let response = Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, location)
            .body(empty_body())?;
        Ok(response)
    }

    async fn forward(
        &self,
        target: &ForwardTarget,
        mut req: Request<ProxyBody>,
        identity: Option<&AuthContext>,
    ) -> Outcome {
        if let Err(e) = apply_identity(req.headers_mut(), identity) {
            return Outcome::Failed(e.into());
        }

        let response = self.forwarder.forward(target, req).await;
        Outcome::Forwarded {
            target: target.clone(),
            response,
        }
    }
}

fn fixed_response(fixed: &FixedResponse) -> Response<ProxyBody> {
    let mut response = Response::new(full_body(fixed.body.clone()));
    *response.status_mut() = fixed.status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, fixed.content_type.clone());
    response
}

fn redirect_response(redirect: &Redirect) -> Response<ProxyBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = redirect.status;
    response
        .headers_mut()
        .insert(LOCATION, redirect.location.clone());
    response
}
