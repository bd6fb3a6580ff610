//! Authentication-provider collaborator.
//!
//! An `authenticate-oidc` action asks an [`AuthProvider`] whether the request
//! carries an authenticated identity. The provider exchange itself (redirects,
//! code exchange, token validation) lives behind this trait; the emulator ships
//! development providers only.

mod providers;

use crate::config::{AuthConfig, AuthProviderKind};
use crate::proxy::ProxyBody;
use anyhow::Context;
use async_trait::async_trait;
use hyper::header::HeaderName;
use hyper::Request;
use std::sync::Arc;

pub use providers::{AnonymousAuthProvider, HeaderAuthProvider, StaticAuthProvider};

/// Identity established by a successful authentication action.
///
/// Lives only for the pipeline run of the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub username: String,
    /// Forwarded as `x-amzn-oidc-accesstoken` when present
    pub access_token: Option<String>,
    /// Forwarded as `x-amzn-oidc-data` when present
    pub claims: Option<String>,
}

impl AuthContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_token: None,
            claims: None,
        }
    }
}

/// The provider could not decide. Distinct from "not authenticated", which is `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(Some(_))` when authenticated, `Ok(None)` when not.
    async fn authenticate(
        &self,
        req: &Request<ProxyBody>,
        scope: &str,
    ) -> Result<Option<AuthContext>, AuthError>;
}

/// Create the provider selected by configuration.
pub fn create_auth_provider(config: &AuthConfig) -> Result<Arc<dyn AuthProvider>, anyhow::Error> {
    let provider: Arc<dyn AuthProvider> = match config.provider {
        AuthProviderKind::Static => {
            tracing::info!(
                "Using static auth provider (every request is '{}')",
                config.username
            );
            Arc::new(StaticAuthProvider::new(config.username.clone()))
        }
        AuthProviderKind::Header => {
            let header = HeaderName::from_bytes(config.header.as_bytes())
                .with_context(|| format!("Invalid auth.header '{}'", config.header))?;
            tracing::info!("Using header auth provider (identity from '{}')", header);
            Arc::new(HeaderAuthProvider::new(header))
        }
        AuthProviderKind::Anonymous => {
            tracing::info!("Using anonymous auth provider (no request is authenticated)");
            Arc::new(AnonymousAuthProvider)
        }
    };
    Ok(provider)
}
