//! Path-prefix redirect rule

use crate::domain;
use crate::types::{Location, RedirectTarget};
use crate::url;

use super::{Neutralization, RedirectPolicy};

// =============================================================================
// Path Matching
// =============================================================================

/// True when `path` hits any configured prefix. The root prefix `/` only
/// matches the root path exactly; any other prefix matches everything
/// under it.
#[inline]
fn path_matches(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        if prefix == "/" {
            path == "/"
        } else {
            path.starts_with(prefix.as_str())
        }
    })
}

// =============================================================================
// Rule
// =============================================================================

/// Redirects paths under configured prefixes to a fixed destination,
/// optionally limited to a set of base domains.
///
/// With an empty host scope the rule applies on every host; a non-empty
/// scope restricts it to the listed domains and their subdomains.
#[derive(Debug, Clone)]
pub struct PathRedirect {
    prefixes: Vec<String>,
    host_scope: Vec<String>,
    destination: RedirectTarget,
    neutralized: Option<Neutralization>,
}

impl PathRedirect {
    pub fn new(
        prefixes: impl IntoIterator<Item = impl Into<String>>,
        destination: RedirectTarget,
    ) -> Self {
        let mut rule = Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            host_scope: Vec::new(),
            destination,
            neutralized: None,
        };
        rule.recheck_destination();
        rule
    }

    /// Restrict the rule to `domains` and their subdomains.
    pub fn with_host_scope(mut self, domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.host_scope = domains.into_iter().map(Into::into).collect();
        self.recheck_destination();
        self
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn host_scope(&self) -> &[String] {
        &self.host_scope
    }

    pub fn destination(&self) -> &RedirectTarget {
        &self.destination
    }

    /// `Some` when the destination failed the construction-time loop check
    /// and the rule will never fire.
    pub fn neutralization(&self) -> Option<Neutralization> {
        self.neutralized
    }

    fn in_scope(&self, host: &str) -> bool {
        self.host_scope.is_empty() || domain::matching_domain(host, &self.host_scope).is_some()
    }

    /// Re-run the loop check. Builders call this after every field change
    /// so the outcome does not depend on call order.
    fn recheck_destination(&mut self) {
        self.neutralized = match &self.destination {
            // Origin-relative target keeps the current host, so scope
            // still matches and only the path decides.
            RedirectTarget::Path(p) => path_matches(url::path(p), &self.prefixes)
                .then_some(Neutralization::SelfMatchingPath),
            RedirectTarget::Url(u) => match url::host(u) {
                Some(h) if !self.in_scope(h) => None,
                Some(_) => path_matches(url::path(u), &self.prefixes)
                    .then_some(Neutralization::SelfMatchingPath),
                None if self.host_scope.is_empty() => path_matches(url::path(u), &self.prefixes)
                    .then_some(Neutralization::SelfMatchingPath),
                None => Some(Neutralization::NoDestinationHost),
            },
        };
    }
}

impl RedirectPolicy for PathRedirect {
    fn decide(&self, location: &Location) -> Option<RedirectTarget> {
        if self.neutralized.is_some() {
            return None;
        }
        if !self.in_scope(&location.host) {
            return None;
        }
        if path_matches(&location.path, &self.prefixes) {
            Some(self.destination.clone())
        } else {
            None
        }
    }
}
