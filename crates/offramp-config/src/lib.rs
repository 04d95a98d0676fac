//! Offramp Rule Configuration
//!
//! This crate turns JSON rule configurations into redirect policies.

pub mod builder;
pub mod schema;

pub use builder::{build_policies, parse_config, BuildReport, ConfigError, Lint};
pub use schema::{GuardConfig, RuleConfig};
