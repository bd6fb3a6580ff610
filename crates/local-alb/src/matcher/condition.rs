//! Compiled rule conditions and their evaluation.

use super::pattern::Pattern;
use super::request::{header_value, host, path, query_param};
use crate::config::ConditionConfig;
use anyhow::Context;
use hyper::header::HeaderName;
use hyper::Request;

/// A condition with its patterns compiled. Each variant matches when ANY of
/// its values matches; an empty value list never matches.
#[derive(Debug, Clone)]
pub enum Condition {
    HostHeader(Vec<Pattern>),
    HttpHeader {
        name: HeaderName,
        values: Vec<Pattern>,
    },
    HttpRequestMethod(Vec<String>),
    PathPattern(Vec<Pattern>),
    QueryString(Vec<(String, Pattern)>),
}

impl Condition {
    pub fn compile(config: &ConditionConfig) -> Result<Self, anyhow::Error> {
        let condition = match config {
            ConditionConfig::HostHeader { values } => {
                Condition::HostHeader(compile_all(values, false)?)
            }
            ConditionConfig::HttpHeader {
                http_header_name,
                values,
            } => Condition::HttpHeader {
                name: HeaderName::from_bytes(http_header_name.as_bytes()).with_context(|| {
                    format!("'{http_header_name}' is not a valid http_header_name")
                })?,
                values: compile_all(values, true)?,
            },
            ConditionConfig::HttpRequestMethod { values } => {
                Condition::HttpRequestMethod(values.clone())
            }
            ConditionConfig::PathPattern { values } => {
                Condition::PathPattern(compile_all(values, false)?)
            }
            ConditionConfig::QueryString { values } => Condition::QueryString(
                values
                    .iter()
                    .map(|pair| -> Result<(String, Pattern), anyhow::Error> {
                        Ok((pair.key.clone(), Pattern::compile(&pair.value, true)?))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        Ok(condition)
    }

    /// Evaluate against a request. Never fails; a missing attribute reads as "".
    pub fn evaluate<B>(&self, req: &Request<B>) -> bool {
        match self {
            Condition::HostHeader(patterns) => any_match(patterns, host(req)),
            Condition::HttpHeader { name, values } => any_match(values, header_value(req, name)),
            Condition::HttpRequestMethod(methods) => {
                let method = req.method().as_str();
                methods.iter().any(|m| m == method)
            }
            Condition::PathPattern(patterns) => any_match(patterns, &path(req)),
            Condition::QueryString(pairs) => pairs
                .iter()
                .any(|(key, pattern)| pattern.matches(&query_param(req, key))),
        }
    }
}

fn compile_all(values: &[String], case_sensitive: bool) -> Result<Vec<Pattern>, anyhow::Error> {
    values
        .iter()
        .map(|v| Pattern::compile(v, case_sensitive).map_err(anyhow::Error::from))
        .collect()
}

fn any_match(patterns: &[Pattern], value: &str) -> bool {
    patterns.iter().any(|p| p.matches(value))
}
