//! Development authentication providers.

use super::{AuthContext, AuthError, AuthProvider};
use crate::proxy::ProxyBody;
use async_trait::async_trait;
use hyper::header::HeaderName;
use hyper::Request;
use tracing::debug;

/// Authenticates every request as the same user.
#[derive(Debug, Clone)]
pub struct StaticAuthProvider {
    username: String,
}

impl StaticAuthProvider {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn authenticate(
        &self,
        _req: &Request<ProxyBody>,
        _scope: &str,
    ) -> Result<Option<AuthContext>, AuthError> {
        Ok(Some(AuthContext::new(self.username.clone())))
    }
}

/// Takes the identity from a request header, e.g. one set by a test client.
#[derive(Debug, Clone)]
pub struct HeaderAuthProvider {
    header: HeaderName,
}

impl HeaderAuthProvider {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

#[async_trait]
impl AuthProvider for HeaderAuthProvider {
    async fn authenticate(
        &self,
        req: &Request<ProxyBody>,
        scope: &str,
    ) -> Result<Option<AuthContext>, AuthError> {
        let username = req
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match username {
            Some(username) => {
                debug!("Authenticated '{}' for scope '{}'", username, scope);
                Ok(Some(AuthContext::new(username)))
            }
            None => Ok(None),
        }
    }
}

/// Never authenticates.
#[derive(Debug, Clone, Copy)]
pub struct AnonymousAuthProvider;

#[async_trait]
impl AuthProvider for AnonymousAuthProvider {
    async fn authenticate(
        &self,
        _req: &Request<ProxyBody>,
        _scope: &str,
    ) -> Result<Option<AuthContext>, AuthError> {
        Ok(None)
    }
}
