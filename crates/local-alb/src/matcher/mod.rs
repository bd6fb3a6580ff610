//! Request matching: glob patterns, conditions and first-match rule selection.
//!
//! # Module Structure
//!
//! - `pattern` - glob compilation (load time) and matching (request time)
//! - `request` - request attribute extraction (host, header, query parameter)
//! - `condition` - compiled conditions; ANY value matches
//! - `rule` - compiled rules; ALL conditions match, first rule wins

mod condition;
mod pattern;
mod request;
mod rule;

pub use condition::Condition;
pub use pattern::{matches, Pattern, PatternError};
pub use request::{header_value, host, path, query_param};
pub use rule::{CompiledRule, RuleSet, Selection};
