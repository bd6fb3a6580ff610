//! Rule condition configuration.

use serde::{Deserialize, Serialize};

/// One predicate over a request attribute. A condition matches when ANY of its
/// values matches; a rule matches when ALL of its conditions match.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "field", rename_all = "kebab-case")]
pub enum ConditionConfig {
    /// Glob match against the `Host` header (case-insensitive)
    HostHeader {
        #[serde(default)]
        values: Vec<String>,
    },
    /// Glob match against a named request header (case-sensitive)
    HttpHeader {
        http_header_name: String,
        #[serde(default)]
        values: Vec<String>,
    },
    /// Exact match against the request method
    HttpRequestMethod {
        #[serde(default)]
        values: Vec<String>,
    },
    /// Glob match against the URL path (case-insensitive)
    PathPattern {
        #[serde(default)]
        values: Vec<String>,
    },
    /// Glob match against named query parameters (case-sensitive)
    QueryString {
        #[serde(default)]
        values: Vec<QueryStringPair>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct QueryStringPair {
    pub key: String,
    pub value: String,
}

impl ConditionConfig {
    /// Configuration tag of this condition, used in log and error messages
    pub fn field(&self) -> &'static str {
        match self {
            ConditionConfig::HostHeader { .. } => "host-header",
            ConditionConfig::HttpHeader { .. } => "http-header",
            ConditionConfig::HttpRequestMethod { .. } => "http-request-method",
            ConditionConfig::PathPattern { .. } => "path-pattern",
            ConditionConfig::QueryString { .. } => "query-string",
        }
    }

    /// Number of acceptable values; zero means the condition can never match
    pub fn value_count(&self) -> usize {
        match self {
            ConditionConfig::HostHeader { values }
            | ConditionConfig::HttpHeader { values, .. }
            | ConditionConfig::HttpRequestMethod { values }
            | ConditionConfig::PathPattern { values } => values.len(),
            ConditionConfig::QueryString { values } => values.len(),
        }
    }
}
