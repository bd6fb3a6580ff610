//! Rule compilation and first-match selection.

use super::condition::Condition;
use crate::config::{Config, RuleConfig};
use crate::pipeline::{compile_actions, Action};
use anyhow::Context;
use hyper::Request;

#[derive(Debug)]
pub struct CompiledRule {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

impl CompiledRule {
    pub fn compile(rule: &RuleConfig, index: usize) -> Result<Self, anyhow::Error> {
        let name = rule.display_name(index);

        let conditions = rule
            .conditions
            .iter()
            .map(Condition::compile)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid condition in rule '{name}'"))?;

        let actions = compile_actions(&rule.actions)
            .with_context(|| format!("Invalid action in rule '{name}'"))?;

        Ok(Self {
            name,
            conditions,
            actions,
        })
    }

    /// True when every condition matches; no conditions matches everything.
    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        self.conditions.iter().all(|c| c.evaluate(req))
    }
}

/// Result of rule selection for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// A rule matched
    Rule(&'a str),
    /// No rule matched; the default actions apply
    Default,
}

impl Selection<'_> {
    /// Label for logs and metrics
    pub fn label(&self) -> &str {
        match self {
            Selection::Rule(name) => name,
            Selection::Default => "default",
        }
    }
}

/// The immutable, compiled listener configuration shared by all requests.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    default_actions: Vec<Action>,
}

impl RuleSet {
    pub fn new(rules: Vec<CompiledRule>, default_actions: Vec<Action>) -> Self {
        Self {
            rules,
            default_actions,
        }
    }

    pub fn compile(config: &Config) -> Result<Self, anyhow::Error> {
        let rules = config
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| CompiledRule::compile(rule, index))
            .collect::<Result<Vec<_>, _>>()?;

        let default_actions = compile_actions(&config.default_actions)
            .context("Invalid action in default_actions")?;

        Ok(Self::new(rules, default_actions))
    }

    /// First rule, in declaration order, whose conditions all match.
    pub fn first_match<B>(&self, req: &Request<B>) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matches(req))
    }

    /// Actions to run for `req` and whether a rule (rather than the default) matched.
    ///
    /// The returned list is empty only when nothing matched and no default
    /// actions are configured.
    pub fn select<B>(&self, req: &Request<B>) -> (&[Action], bool) {
        match self.first_match(req) {
            Some(rule) => (&rule.actions, true),
            None => (&self.default_actions, false),
        }
    }

    /// Like [`RuleSet::select`], also naming what was selected.
    pub fn resolve<B>(&self, req: &Request<B>) -> (&[Action], Selection<'_>) {
        match self.first_match(req) {
            Some(rule) => (&rule.actions, Selection::Rule(&rule.name)),
            None => (&self.default_actions, Selection::Default),
        }
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn default_actions(&self) -> &[Action] {
        &self.default_actions
    }
}
