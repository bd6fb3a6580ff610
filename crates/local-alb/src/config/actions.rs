//! Rule action configuration.

use super::protocol::Protocol;
use serde::{Deserialize, Serialize};

/// One step of request disposition.
///
/// Only `authenticate-oidc` can hand control to the next action in its list;
/// every other kind ends the list. Hence an `authenticate-oidc` action may only
/// appear first, and a list must end in a terminal action.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionConfig {
    Forward(ForwardConfig),
    Redirect(RedirectConfig),
    FixedResponse(FixedResponseConfig),
    AuthenticateOidc(AuthenticateOidcConfig),
}

impl ActionConfig {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionConfig::AuthenticateOidc(_))
    }

    /// Configuration tag of this action, used in log and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ActionConfig::Forward(_) => "forward",
            ActionConfig::Redirect(_) => "redirect",
            ActionConfig::FixedResponse(_) => "fixed-response",
            ActionConfig::AuthenticateOidc(_) => "authenticate-oidc",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ForwardConfig {
    /// Stands in for the target group
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RedirectConfig {
    #[serde(default)]
    pub status_code: RedirectStatus,
    #[serde(default = "default_redirect_protocol")]
    pub protocol: Protocol,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default = "default_redirect_path")]
    pub path: String,
    #[serde(default)]
    pub query: String,
}

fn default_redirect_protocol() -> Protocol {
    Protocol::Https
}

fn default_redirect_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum RedirectStatus {
    /// 301 Moved Permanently
    #[default]
    #[serde(rename = "HTTP_301")]
    Permanent,
    /// 302 Found
    #[serde(rename = "HTTP_302")]
    Temporary,
}

impl RedirectStatus {
    pub fn as_u16(&self) -> u16 {
        match self {
            RedirectStatus::Permanent => 301,
            RedirectStatus::Temporary => 302,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FixedResponseConfig {
    pub status_code: u16,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub message_body: String,
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthenticateOidcConfig {
    #[serde(default)]
    pub on_unauthenticated_request: UnauthenticatedPolicy,
    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_scope() -> String {
    "openid".to_string()
}

/// What an `authenticate-oidc` action does with a request that is not authenticated.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnauthenticatedPolicy {
    /// Redirect to the login entry point
    #[default]
    Authenticate,
    /// Answer 401
    Deny,
    /// Continue to the next action without an identity
    Allow,
}
