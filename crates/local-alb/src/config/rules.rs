//! Listener rule configuration.

use super::actions::ActionConfig;
use super::conditions::ConditionConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RuleConfig {
    /// Label used in logs and metrics (default: `rule-<index>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// All conditions must match; an empty list matches every request
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
    pub actions: Vec<ActionConfig>,
}

impl RuleConfig {
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("rule-{index}"))
    }
}
