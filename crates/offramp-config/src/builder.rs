//! Config to policy translation
//!
//! Structural defects in a config are hard [`ConfigError`]s. A rule the
//! destination self-check neutralized is not an error: the policy exists
//! and passes every input, which is the designed degraded behavior. Those
//! come back as [`Lint`]s so tooling can surface them.

use std::str::FromStr;

use chrono::Weekday;
use log::warn;
use thiserror::Error;

use offramp_core::url;
use offramp_core::{HostBlocklist, Neutralization, PathRedirect, PolicySet, RedirectTarget};

use crate::schema::{GuardConfig, RuleConfig};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rule {index}: unknown weekday '{value}'")]
    UnknownWeekday { index: usize, value: String },
    #[error("rule {index}: no match condition (empty prefixes and include_root false)")]
    NoMatchCondition { index: usize },
    #[error("rule {index}: empty domain list")]
    EmptyDomainList { index: usize },
    #[error("rule {index}: empty destination")]
    EmptyDestination { index: usize },
}

// =============================================================================
// Build Output
// =============================================================================

/// A rule that survived building but will never fire.
#[derive(Debug, Clone)]
pub struct Lint {
    pub rule_index: usize,
    pub rule_summary: String,
    pub reason: Neutralization,
}

impl std::fmt::Display for Lint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rule {} ({}) neutralized: {}",
            self.rule_index, self.rule_summary, self.reason
        )
    }
}

/// Built policies plus everything worth telling the operator.
pub struct BuildReport {
    pub policies: PolicySet,
    pub lints: Vec<Lint>,
}

// =============================================================================
// Building
// =============================================================================

/// Parse a JSON config document.
pub fn parse_config(text: &str) -> Result<GuardConfig, ConfigError> {
    Ok(serde_json::from_str(text)?)
}

/// Turn a parsed config into an ordered [`PolicySet`].
///
/// Rule order in the config is decision order. Neutralized rules are kept
/// in the set (they pass everything) and reported as lints, logged at
/// `warn` level.
pub fn build_policies(config: &GuardConfig) -> Result<BuildReport, ConfigError> {
    let mut policies = PolicySet::new();
    let mut lints = Vec::new();

    for (index, rule) in config.rules.iter().enumerate() {
        let neutralization = match rule {
            RuleConfig::PathRedirect {
                destination,
                prefixes,
                include_root,
                hosts,
            } => {
                let built =
                    build_path_rule(index, destination, prefixes, *include_root, hosts)?;
                let neutralization = built.neutralization();
                policies.push(built);
                neutralization
            }
            RuleConfig::HostBlocklist {
                destination,
                domains,
                allow_on,
            } => {
                let built = build_blocklist_rule(index, destination, domains, allow_on.as_deref())?;
                let neutralization = built.neutralization();
                policies.push(built);
                neutralization
            }
        };

        if let Some(reason) = neutralization {
            let lint = Lint {
                rule_index: index,
                rule_summary: rule.summary(),
                reason,
            };
            warn!("{}", lint);
            lints.push(lint);
        }
    }

    Ok(BuildReport { policies, lints })
}

fn parse_destination(index: usize, destination: &str) -> Result<RedirectTarget, ConfigError> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(ConfigError::EmptyDestination { index });
    }
    if url::is_absolute(destination) {
        Ok(RedirectTarget::Url(destination.to_string()))
    } else {
        Ok(RedirectTarget::Path(destination.to_string()))
    }
}

fn build_path_rule(
    index: usize,
    destination: &str,
    prefixes: &[String],
    include_root: bool,
    hosts: &[String],
) -> Result<PathRedirect, ConfigError> {
    if prefixes.is_empty() && !include_root {
        return Err(ConfigError::NoMatchCondition { index });
    }
    let target = parse_destination(index, destination)?;

    let mut all_prefixes: Vec<String> = Vec::with_capacity(prefixes.len() + 1);
    if include_root {
        all_prefixes.push("/".to_string());
    }
    all_prefixes.extend(prefixes.iter().map(|p| p.trim().to_string()));

    let mut rule = PathRedirect::new(all_prefixes, target);
    if !hosts.is_empty() {
        rule = rule.with_host_scope(hosts.iter().map(|h| h.trim().to_string()));
    }
    Ok(rule)
}

fn build_blocklist_rule(
    index: usize,
    destination: &str,
    domains: &[String],
    allow_on: Option<&str>,
) -> Result<HostBlocklist, ConfigError> {
    if domains.is_empty() {
        return Err(ConfigError::EmptyDomainList { index });
    }
    let target = parse_destination(index, destination)?;

    let mut rule = HostBlocklist::new(domains.iter().map(|d| d.trim().to_string()), target);
    if let Some(value) = allow_on {
        let day = Weekday::from_str(value).map_err(|_| ConfigError::UnknownWeekday {
            index,
            value: value.to_string(),
        })?;
        rule = rule.with_allowed_weekdays([day]);
    }
    Ok(rule)
}
