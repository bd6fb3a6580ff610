//! Local emulator of an application load balancer's listener rules.
//!
//! A request is matched against an ordered list of rules (host, header,
//! method, path and query conditions); the first matching rule's actions run
//! in order: authenticate, then forward, redirect or answer with a fixed
//! response.

pub mod auth;
pub mod config;
pub mod matcher;
pub mod metrics;
pub mod pipeline;
pub mod proxy;

pub use config::Config;
pub use matcher::RuleSet;
pub use pipeline::{ActionPipeline, Outcome};
pub use proxy::AlbServer;
