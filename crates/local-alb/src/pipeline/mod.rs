//! Action pipeline: compiled actions and the per-request state machine that runs them.
//!
//! # Module Structure
//!
//! - `action` - actions compiled from configuration
//! - `executor` - `ActionPipeline::run` and its `Outcome`
//! - `error` - pipeline failures

mod action;
mod error;
mod executor;

use crate::proxy::ProxyBody;
use async_trait::async_trait;
use hyper::{Request, Response};

pub use action::{
    compile_actions, redirect_location, Action, Authenticate, FixedResponse, ForwardTarget,
    Redirect,
};
pub use error::PipelineError;
pub use executor::{ActionPipeline, Outcome};

/// Hands a request to an upstream target.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Transport failures are answered by the forwarder itself with a 502.
    async fn forward(&self, target: &ForwardTarget, req: Request<ProxyBody>)
        -> Response<ProxyBody>;
}
