//! Host-blocklist redirect rule

use chrono::{Datelike, Weekday};

use crate::domain;
use crate::types::{Location, RedirectTarget};

use super::{Neutralization, RedirectPolicy};

// =============================================================================
// Clock
// =============================================================================

/// Supplies the current weekday; injected so tests control the clock.
pub type WeekdaySource = fn() -> Weekday;

fn local_weekday() -> Weekday {
    chrono::Local::now().weekday()
}

// =============================================================================
// Rule
// =============================================================================

/// Sends every visit to a blocked base domain (or any of its subdomains)
/// to a fixed destination.
///
/// An optional weekday allowance suspends the whole rule on listed days.
/// The day is read from the clock on every check; a tab left open across
/// midnight picks up the new day on its next navigation.
#[derive(Debug, Clone)]
pub struct HostBlocklist {
    domains: Vec<String>,
    destination: RedirectTarget,
    allowed_weekdays: Vec<Weekday>,
    weekday_source: WeekdaySource,
    neutralized: Option<Neutralization>,
}

impl HostBlocklist {
    pub fn new(
        domains: impl IntoIterator<Item = impl Into<String>>,
        destination: RedirectTarget,
    ) -> Self {
        let domains: Vec<String> = domains.into_iter().map(Into::into).collect();

        // Loop check: a destination hosted on a blocked domain would be
        // redirected again the moment it loads. A destination without a
        // statically known host cannot be proven safe, which counts as
        // unsafe.
        let neutralized = match destination.host() {
            Some(h) if domain::matching_domain(h, &domains).is_some() => {
                Some(Neutralization::SelfBlocked)
            }
            Some(_) => None,
            None => Some(Neutralization::NoDestinationHost),
        };

        Self {
            domains,
            destination,
            allowed_weekdays: Vec::new(),
            weekday_source: local_weekday,
            neutralized,
        }
    }

    /// Suspend the rule on the given weekdays.
    pub fn with_allowed_weekdays(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.allowed_weekdays = days.into_iter().collect();
        self
    }

    /// Replace the clock. Production uses the local wall clock.
    pub fn with_weekday_source(mut self, source: WeekdaySource) -> Self {
        self.weekday_source = source;
        self
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn destination(&self) -> &RedirectTarget {
        &self.destination
    }

    pub fn allowed_weekdays(&self) -> &[Weekday] {
        &self.allowed_weekdays
    }

    /// `Some` when the destination failed the construction-time loop check
    /// and the rule will never fire.
    pub fn neutralization(&self) -> Option<Neutralization> {
        self.neutralized
    }
}

impl RedirectPolicy for HostBlocklist {
    fn decide(&self, location: &Location) -> Option<RedirectTarget> {
        if self.neutralized.is_some() {
            return None;
        }
        // Read the day on every check, never at construction.
        if !self.allowed_weekdays.is_empty() {
            let today = (self.weekday_source)();
            if self.allowed_weekdays.contains(&today) {
                return None;
            }
        }
        if domain::matching_domain(&location.host, &self.domains).is_some() {
            Some(self.destination.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn blocklist() -> HostBlocklist {
        HostBlocklist::new(
            ["example.com", "tracker.net"],
            RedirectTarget::Url("https://safe.org/".to_string()),
        )
    }

    #[test]
    fn test_blocked_host_redirects() {
        let rule = blocklist();
        let target = RedirectTarget::Url("https://safe.org/".to_string());
        assert_eq!(rule.decide(&Location::new("example.com", "/")), Some(target.clone()));
        assert_eq!(
            rule.decide(&Location::new("sub.example.com", "/page")),
            Some(target)
        );
    }

    #[test]
    fn test_unblocked_host_passes() {
        let rule = blocklist();
        assert!(rule.decide(&Location::new("example.org", "/")).is_none());
        assert!(rule.decide(&Location::new("safe.org", "/")).is_none());
    }

    #[test]
    fn test_embedded_domain_not_a_subdomain() {
        let rule = blocklist();
        assert!(rule
            .decide(&Location::new("example.com.evil.org", "/"))
            .is_none());
    }

    #[test]
    fn test_self_blocked_destination_disables_rule() {
        let rule = HostBlocklist::new(
            ["safe.org"],
            RedirectTarget::Url("https://safe.org/".to_string()),
        );
        assert_eq!(rule.neutralization(), Some(Neutralization::SelfBlocked));
        // Every input passes, including hosts that would otherwise match.
        assert!(rule.decide(&Location::new("safe.org", "/")).is_none());
        assert!(rule.decide(&Location::new("m.safe.org", "/")).is_none());
        assert!(rule.decide(&Location::new("other.com", "/")).is_none());
    }

    #[test]
    fn test_subdomain_destination_also_self_blocked() {
        let rule = HostBlocklist::new(
            ["safe.org"],
            RedirectTarget::Url("https://start.safe.org/".to_string()),
        );
        assert_eq!(rule.neutralization(), Some(Neutralization::SelfBlocked));
    }

    #[test]
    fn test_relative_destination_unprovable() {
        let rule = HostBlocklist::new(["example.com"], RedirectTarget::Path("/start".to_string()));
        assert_eq!(rule.neutralization(), Some(Neutralization::NoDestinationHost));
        assert!(rule.decide(&Location::new("example.com", "/")).is_none());
    }

    #[test]
    fn test_allowed_weekday_suspends_rule() {
        let rule = blocklist()
            .with_allowed_weekdays([Weekday::Sun])
            .with_weekday_source(|| Weekday::Sun);
        assert!(rule.decide(&Location::new("example.com", "/")).is_none());

        let rule = blocklist()
            .with_allowed_weekdays([Weekday::Sun])
            .with_weekday_source(|| Weekday::Mon);
        assert!(rule.decide(&Location::new("example.com", "/")).is_some());
    }

    #[test]
    fn test_weekday_read_on_every_check() {
        static ADVANCED: AtomicBool = AtomicBool::new(false);
        fn flipping() -> Weekday {
            if ADVANCED.fetch_xor(true, Ordering::SeqCst) {
                Weekday::Mon
            } else {
                Weekday::Sun
            }
        }

        let rule = blocklist()
            .with_allowed_weekdays([Weekday::Sun])
            .with_weekday_source(flipping);
        let home = Location::new("example.com", "/");

        // Sunday at first check, Monday by the next: the second check must
        // see the new day.
        assert!(rule.decide(&home).is_none());
        assert!(rule.decide(&home).is_some());
    }

    #[test]
    fn test_no_allowance_ignores_clock() {
        let rule = blocklist().with_weekday_source(|| Weekday::Sun);
        assert!(rule.decide(&Location::new("example.com", "/")).is_some());
    }
}
