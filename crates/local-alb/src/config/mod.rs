//! Configuration types for the local load balancer.

mod actions;
mod auth;
mod conditions;
mod forwarding;
mod listen;
mod protocol;
mod rules;

use std::path::Path;

use anyhow::Context;
use hyper::header::HeaderName;
use serde::{Deserialize, Serialize};
use tracing::warn;

// Re-export all types for library consumers
pub use actions::{
    ActionConfig, AuthenticateOidcConfig, FixedResponseConfig, ForwardConfig, RedirectConfig,
    RedirectStatus, UnauthenticatedPolicy,
};
pub use auth::{AuthConfig, AuthProviderKind};
pub use conditions::{ConditionConfig, QueryStringPair};
pub use forwarding::ForwardingConfig;
pub use listen::{ListenConfig, MetricsConfig};
pub use protocol::Protocol;
pub use rules::RuleConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub listen: ListenConfig,

    /// Prometheus endpoint; not served when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub forwarding: ForwardingConfig,

    /// Used when no rule matches
    #[serde(default)]
    pub default_actions: Vec<ActionConfig>,

    /// Evaluated in order; the first rule whose conditions all match wins
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Config {
    /// Load a YAML (or `.json`) configuration file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Config = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config '{}'", path.display()))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config '{}'", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen.port == 0 {
            anyhow::bail!("listen.port must be non-zero");
        }
        if self.listen.request_timeout_secs == 0 {
            anyhow::bail!("listen.request_timeout_secs must be greater than zero");
        }
        self.listen.socket_addr()?;

        self.validate_auth()?;

        if self.default_actions.is_empty() {
            warn!("No default_actions configured: requests matching no rule will get a 500");
        } else {
            validate_actions(&self.default_actions, "default_actions")?;
        }

        for (index, rule) in self.rules.iter().enumerate() {
            let label = format!("rule '{}'", rule.display_name(index));

            for condition in &rule.conditions {
                validate_condition(condition, &label)?;
            }

            validate_actions(&rule.actions, &label)?;
        }

        Ok(())
    }

    fn validate_auth(&self) -> Result<(), anyhow::Error> {
        if !self.auth.login_path.starts_with('/') {
            anyhow::bail!(
                "auth.login_path must be an absolute path, got '{}'",
                self.auth.login_path
            );
        }

        if self.auth.provider == AuthProviderKind::Header {
            HeaderName::from_bytes(self.auth.header.as_bytes()).map_err(|_| {
                anyhow::anyhow!("auth.header '{}' is not a valid header name", self.auth.header)
            })?;
        }

        Ok(())
    }
}

fn validate_condition(condition: &ConditionConfig, label: &str) -> Result<(), anyhow::Error> {
    if condition.value_count() == 0 {
        warn!(
            "{} has a {} condition with no values; it can never match",
            label,
            condition.field()
        );
    }

    if let ConditionConfig::HttpHeader {
        http_header_name, ..
    } = condition
    {
        HeaderName::from_bytes(http_header_name.as_bytes()).map_err(|_| {
            anyhow::anyhow!("{label}: '{http_header_name}' is not a valid http_header_name")
        })?;
    }

    Ok(())
}

/// Check the ordering invariant of an action list: it is non-empty, only its
/// first action may be `authenticate-oidc`, and it ends in a terminal action
/// with nothing after it.
fn validate_actions(actions: &[ActionConfig], label: &str) -> Result<(), anyhow::Error> {
    let Some(last) = actions.last() else {
        anyhow::bail!("{label} has no actions");
    };

    for (index, action) in actions.iter().enumerate() {
        if index > 0 && !action.is_terminal() {
            anyhow::bail!(
                "{label}: authenticate-oidc must be the first action, found at position {}",
                index + 1
            );
        }

        if action.is_terminal() && index + 1 < actions.len() {
            anyhow::bail!(
                "{label}: {} action at position {} is terminal but is followed by {} more action(s)",
                action.kind(),
                index + 1,
                actions.len() - index - 1
            );
        }

        validate_action(action, label)?;
    }

    if !last.is_terminal() {
        anyhow::bail!(
            "{label}: action list must end with a forward, redirect or fixed-response action"
        );
    }

    Ok(())
}

fn validate_action(action: &ActionConfig, label: &str) -> Result<(), anyhow::Error> {
    match action {
        ActionConfig::Forward(forward) => {
            if forward.host.is_empty() {
                anyhow::bail!("{label}: forward action requires a host");
            }
            if forward.port == 0 {
                anyhow::bail!("{label}: forward action requires a non-zero port");
            }
        }
        ActionConfig::Redirect(redirect) => {
            if redirect.host.is_empty() {
                anyhow::bail!("{label}: redirect action requires a host");
            }
        }
        ActionConfig::FixedResponse(fixed) => {
            if !(100..=599).contains(&fixed.status_code) {
                anyhow::bail!(
                    "{label}: fixed-response status_code {} is outside 100-599",
                    fixed.status_code
                );
            }
        }
        ActionConfig::AuthenticateOidc(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO: &str = r#"
listen:
  port: 8080
default_actions:
  - type: fixed-response
    status_code: 200
    content_type: text/html
    message_body: HELLO!
rules:
  - name: test
    conditions:
      - field: http-request-method
        values: ["GET"]
    actions:
      - type: fixed-response
        status_code: 200
        content_type: text/html
        message_body: HELLO TEST!
  - conditions:
      - field: path-pattern
        values: ["/auth/*"]
    actions:
      - type: authenticate-oidc
        on_unauthenticated_request: deny
      - type: forward
        host: localhost
        port: 8088
"#;

    #[test]
    fn test_parse_config() {
        let config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        config.validate().unwrap();

        assert_eq!(config.listen.port, 8080);
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.request_timeout_secs, 60);
        assert!(config.metrics.is_none());
        assert_eq!(config.default_actions.len(), 1);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].display_name(0), "test");
        assert_eq!(config.rules[1].display_name(1), "rule-1");

        assert_eq!(
            config.rules[0].conditions[0],
            ConditionConfig::HttpRequestMethod {
                values: vec!["GET".to_string()]
            }
        );

        match &config.rules[1].actions[0] {
            ActionConfig::AuthenticateOidc(auth) => {
                assert_eq!(auth.on_unauthenticated_request, UnauthenticatedPolicy::Deny);
                assert_eq!(auth.scope, "openid");
            }
            other => panic!("unexpected action {other:?}"),
        }
        match &config.rules[1].actions[1] {
            ActionConfig::Forward(forward) => {
                assert_eq!(forward.host, "localhost");
                assert_eq!(forward.port, 8088);
                assert_eq!(forward.protocol, Protocol::Http);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_parse_all_condition_fields() {
        let yaml = r#"
listen:
  port: 8080
rules:
  - conditions:
      - field: host-header
        values: ["*.example.com"]
      - field: http-header
        http_header_name: x-env
        values: ["dev", "qa?"]
      - field: query-string
        values:
          - key: version
            value: "v*"
    actions:
      - type: redirect
        status_code: HTTP_302
        host: example.com
        port: 8443
        path: /new
        query: a=b
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let conditions = &config.rules[0].conditions;
        assert_eq!(conditions[0].field(), "host-header");
        assert_eq!(conditions[1].value_count(), 2);
        assert_eq!(
            conditions[2],
            ConditionConfig::QueryString {
                values: vec![QueryStringPair {
                    key: "version".to_string(),
                    value: "v*".to_string(),
                }]
            }
        );

        match &config.rules[0].actions[0] {
            ActionConfig::Redirect(redirect) => {
                assert_eq!(redirect.status_code, RedirectStatus::Temporary);
                assert_eq!(redirect.protocol, Protocol::Https);
                assert_eq!(redirect.port, Some(8443));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_auth_defaults() {
        let config: Config = serde_yaml::from_str("listen:\n  port: 8080\n").unwrap();
        assert_eq!(config.auth.provider, AuthProviderKind::Static);
        assert_eq!(config.auth.username, "local-user");
        assert_eq!(config.auth.login_path, "/alb/auth");
        assert!(!config.forwarding.tls_skip_verify);
    }

    #[test]
    fn test_unknown_policy_is_rejected_at_parse_time() {
        let yaml = r#"
listen:
  port: 8080
default_actions:
  - type: authenticate-oidc
    on_unauthenticated_request: maybe
  - type: fixed-response
    status_code: 200
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_unknown_condition_field_is_rejected_at_parse_time() {
        let yaml = r#"
listen:
  port: 8080
rules:
  - conditions:
      - field: source-ip
        values: ["10.0.0.0/8"]
    actions:
      - type: fixed-response
        status_code: 200
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_authenticate_must_come_first() {
        let yaml = r#"
listen:
  port: 8080
default_actions:
  - type: fixed-response
    status_code: 200
  - type: authenticate-oidc
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_actions"), "{err}");
    }

    #[test]
    fn test_action_list_must_end_terminal() {
        let yaml = r#"
listen:
  port: 8080
rules:
  - name: dangling
    actions:
      - type: authenticate-oidc
        on_unauthenticated_request: allow
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("rule 'dangling'"), "{err}");
        assert!(err.contains("must end with"), "{err}");
    }

    #[test]
    fn test_terminal_action_cannot_be_followed() {
        let yaml = r#"
listen:
  port: 8080
default_actions:
  - type: fixed-response
    status_code: 200
  - type: fixed-response
    status_code: 404
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rule_without_actions_is_rejected() {
        let yaml = r#"
listen:
  port: 8080
rules:
  - conditions: []
    actions: []
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_fixed_response_status() {
        let yaml = r#"
listen:
  port: 8080
default_actions:
  - type: fixed-response
    status_code: 42
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_header_name() {
        let yaml = r#"
listen:
  port: 8080
rules:
  - conditions:
      - field: http-header
        http_header_name: "bad header"
        values: ["x"]
    actions:
      - type: fixed-response
        status_code: 200
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listener_settings_are_checked() {
        let config: Config = serde_yaml::from_str("listen:\n  port: 0\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config =
            serde_yaml::from_str("listen:\n  port: 8080\n  request_timeout_secs: 0\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config =
            serde_yaml::from_str("listen:\n  port: 8080\n  host: my-laptop\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_default_actions_is_allowed() {
        let config: Config = serde_yaml::from_str("listen:\n  port: 8080\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.rules.len(), 2);
    }

    #[test]
    fn test_from_file_json() {
        let json = r#"{
            "listen": {"port": 9000},
            "default_actions": [
                {"type": "fixed-response", "status_code": 404, "message_body": "nope"}
            ]
        }"#;
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.listen.port, 9000);
        match &config.default_actions[0] {
            ActionConfig::FixedResponse(fixed) => {
                assert_eq!(fixed.status_code, 404);
                assert_eq!(fixed.content_type, "text/plain");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_from_file_rejects_invalid_config() {
        let yaml = r#"
listen:
  port: 8080
default_actions:
  - type: authenticate-oidc
"#;
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
