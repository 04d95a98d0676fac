//! Redirect policies
//!
//! A policy is a pure decision function from the current location to an
//! optional redirect target. Policies carry no per-check state; all
//! configuration is fixed at construction and the same input always yields
//! the same answer (modulo an explicit time-based exemption that reads the
//! wall clock fresh on every call).
//!
//! Two built-in rule shapes cover the deployed scripts:
//! - [`PathRedirect`]: path prefixes on a host scope, origin-relative or
//!   absolute destination
//! - [`HostBlocklist`]: blocked base domains with a fixed off-site
//!   destination and an optional weekday allowance
//!
//! [`PolicySet`] chains several rules with first-match-wins order.
//!
//! # Loop safety
//!
//! A rule whose destination would satisfy its own trigger condition would
//! bounce the page forever. Every built-in rule checks its destination at
//! construction time and neutralizes itself (returns `None` for every
//! input) when the destination is provably self-blocking or cannot be
//! proven safe. See [`Neutralization`].

use thiserror::Error;

use crate::types::{Location, RedirectTarget};

mod host;
mod path;

pub use host::{HostBlocklist, WeekdaySource};
pub use path::PathRedirect;

// =============================================================================
// Decision Trait
// =============================================================================

/// A pure decision function over the current location.
pub trait RedirectPolicy {
    /// Where to send the page, or `None` to leave it alone.
    fn decide(&self, location: &Location) -> Option<RedirectTarget>;
}

/// Plain closures work as policies.
impl<F> RedirectPolicy for F
where
    F: Fn(&Location) -> Option<RedirectTarget>,
{
    fn decide(&self, location: &Location) -> Option<RedirectTarget> {
        self(location)
    }
}

// =============================================================================
// Neutralization
// =============================================================================

/// Why a rule was disabled at construction time.
///
/// A neutralized rule stays in place but returns `None` for every input.
/// This is the structural answer to redirect loops: a misconfigured
/// destination is a configuration defect, and the safe degraded behavior
/// is to take no action at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Neutralization {
    /// The destination's host is on the rule's own blocklist.
    #[error("destination host is on the rule's own blocklist")]
    SelfBlocked,
    /// The destination's path matches the rule's own path condition.
    #[error("destination path matches the rule's own path condition")]
    SelfMatchingPath,
    /// The destination's host cannot be statically determined, so the
    /// self-check cannot be proven.
    #[error("destination host cannot be determined")]
    NoDestinationHost,
}

// =============================================================================
// Policy Set
// =============================================================================

/// Ordered collection of policies; the first rule that returns a target
/// wins and later rules are not consulted.
#[derive(Default)]
pub struct PolicySet {
    policies: Vec<Box<dyn RedirectPolicy>>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self {
            policies: Vec::new(),
        }
    }

    /// Append a rule after all existing ones.
    pub fn push(&mut self, policy: impl RedirectPolicy + 'static) {
        self.policies.push(Box::new(policy));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, policy: impl RedirectPolicy + 'static) -> Self {
        self.push(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl RedirectPolicy for PolicySet {
    fn decide(&self, location: &Location) -> Option<RedirectTarget> {
        self.policies.iter().find_map(|p| p.decide(location))
    }
}
