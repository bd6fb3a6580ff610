//! Authentication provider configuration.
//!
//! The emulator does not speak OIDC to a real identity provider; instead one of
//! a few development providers decides whether a request is authenticated.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub provider: AuthProviderKind,
    /// Identity reported by the `static` provider
    #[serde(default = "default_username")]
    pub username: String,
    /// Request header read by the `header` provider
    #[serde(default = "default_user_header")]
    pub header: String,
    /// Where `authenticate-oidc` actions send unauthenticated clients
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: AuthProviderKind::default(),
            username: default_username(),
            header: default_user_header(),
            login_path: default_login_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    /// Every request is authenticated as `username`
    #[default]
    Static,
    /// A request is authenticated when `header` is present; its value is the username
    Header,
    /// No request is ever authenticated
    Anonymous,
}

fn default_login_path() -> String {
    "/alb/auth".to_string()
}

fn default_username() -> String {
    "local-user".to_string()
}

fn default_user_header() -> String {
    "x-local-alb-user".to_string()
}
