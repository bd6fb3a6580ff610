//! Protocol types shared by listeners, redirects and forward targets.

use serde::{Deserialize, Serialize};

/// Protocol of a forward target or redirect location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum Protocol {
    /// Plain HTTP
    #[default]
    #[serde(rename = "http", alias = "HTTP")]
    Http,
    /// HTTP over TLS
    #[serde(rename = "https", alias = "HTTPS")]
    Https,
}

impl Protocol {
    /// URL scheme for this protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}
