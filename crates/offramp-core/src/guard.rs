//! Navigation guard
//!
//! Watches every transition of the page's location and applies a
//! [`RedirectPolicy`], redirecting with replace semantics when the policy
//! returns a target. Four trigger points cover all the ways a location can
//! change:
//!
//! 1. once, synchronously, when [`NavigationGuard::install`] runs (the
//!    initial load)
//! 2. on every popstate notification (back/forward traversal)
//! 3. after every push through a [`GuardedHistory`]
//! 4. after every replace through a [`GuardedHistory`]
//!
//! History mutations are intercepted by wrapping, not by changing the
//! original: [`GuardedHistory`] forwards the call to the wrapped history
//! unmodified, then runs one check against the updated location. The
//! hosting page sees exactly the mutation it asked for.
//!
//! # Timing precondition
//!
//! The guard can only see mutations that happen after it is installed.
//! The host must run [`NavigationGuard::install`] before any other code
//! can navigate, and must route subsequent history mutations through the
//! wrapper. Client-side routers typically fire their first route change
//! during startup, so installation belongs at the earliest point the host
//! allows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::policy::RedirectPolicy;
use crate::types::{CheckOutcome, Location, RedirectTarget};

// =============================================================================
// Host Environment Contract
// =============================================================================

/// What the guard needs from the page it protects.
///
/// Implementations read live state: [`location`](Self::location) must
/// reflect the browser at call time, never a cached snapshot.
pub trait HostPage {
    /// Current location, read fresh.
    fn location(&self) -> Location;

    /// Navigate away, overwriting the current history entry so that going
    /// back cannot land on the location being left.
    fn replace_location(&self, target: &RedirectTarget);

    /// Register a handler for back/forward traversal notifications.
    fn on_popstate(&self, handler: Box<dyn Fn()>);
}

/// History mutation entry points, reduced to the url-carrying form.
///
/// Browser `pushState` takes a state object and title alongside the url;
/// those ride through untouched at the host boundary and only the url
/// matters to the guard, so the wrapper works on this projection.
pub trait HistoryOps {
    /// Add a new history entry for `url`.
    fn push(&self, url: &str);

    /// Replace the current history entry with `url`.
    fn replace(&self, url: &str);
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstallError {
    /// A second install would double-subscribe popstate and double-check
    /// every navigation.
    #[error("navigation guard is already installed")]
    AlreadyInstalled,
}

// =============================================================================
// Guard
// =============================================================================

/// Checks the live location against a policy and redirects on match.
///
/// Clones share the policy and the install latch, so a clone captured by
/// an event handler or a [`GuardedHistory`] observes the same state as
/// the original.
pub struct NavigationGuard<P> {
    page: P,
    policy: Arc<dyn RedirectPolicy>,
    installed: Arc<AtomicBool>,
}

impl<P: Clone> Clone for NavigationGuard<P> {
    fn clone(&self) -> Self {
        Self {
            page: self.page.clone(),
            policy: Arc::clone(&self.policy),
            installed: Arc::clone(&self.installed),
        }
    }
}

impl<P: HostPage> NavigationGuard<P> {
    pub fn new(page: P, policy: impl RedirectPolicy + 'static) -> Self {
        Self {
            page,
            policy: Arc::new(policy),
            installed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run one check against the current location and redirect on match.
    ///
    /// Reads the location fresh, consults the policy once, and performs at
    /// most one replacing navigation. Stateless across calls.
    pub fn check_now(&self) -> CheckOutcome {
        let location = self.page.location();
        match self.policy.decide(&location) {
            Some(target) => {
                debug!("redirecting {} -> {}", location, target);
                self.page.replace_location(&target);
                CheckOutcome::Redirect(target)
            }
            None => CheckOutcome::Pass,
        }
    }

    /// True once [`install`](Self::install) has succeeded on this guard or
    /// any of its clones.
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}

impl<P: HostPage + Clone + 'static> NavigationGuard<P> {
    /// Activate the guard: run the initial check synchronously, then
    /// subscribe to popstate. Returns [`InstallError::AlreadyInstalled`]
    /// without checking anything if this guard (or a clone) was installed
    /// before.
    ///
    /// History mutations are covered separately: wrap the page's history
    /// in a [`GuardedHistory`] built from a clone of this guard.
    pub fn install(&self) -> Result<(), InstallError> {
        if self.installed.swap(true, Ordering::SeqCst) {
            return Err(InstallError::AlreadyInstalled);
        }

        self.check_now();

        let guard = self.clone();
        self.page.on_popstate(Box::new(move || {
            guard.check_now();
        }));

        debug!("navigation guard installed");
        Ok(())
    }

    /// Wrap a history in a [`GuardedHistory`] driven by a clone of this
    /// guard. The host rebinds its history entry points to the result.
    pub fn wrap_history<H: HistoryOps>(&self, inner: H) -> GuardedHistory<H, P> {
        GuardedHistory::new(inner, self.clone())
    }
}

// =============================================================================
// History Wrapper
// =============================================================================

/// Decorator around a history that appends a guard check to every
/// mutation.
///
/// Composition, not mutation: the wrapped history's behavior is invoked
/// exactly as requested, and only afterwards does the guard read the (now
/// updated) location. Installing means rebinding the host's history entry
/// points to this wrapper.
pub struct GuardedHistory<H, P> {
    inner: H,
    guard: NavigationGuard<P>,
}

impl<H: HistoryOps, P: HostPage> GuardedHistory<H, P> {
    pub fn new(inner: H, guard: NavigationGuard<P>) -> Self {
        Self { inner, guard }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: HistoryOps, P: HostPage> HistoryOps for GuardedHistory<H, P> {
    fn push(&self, url: &str) {
        self.inner.push(url);
        self.guard.check_now();
    }

    fn replace(&self, url: &str) {
        self.inner.replace(url);
        self.guard.check_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PathRedirect;
    use crate::url;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    // A minimal in-memory page: current location, a linear history, and
    // popstate handlers. Clones share state, like handles to one browser
    // tab.
    #[derive(Clone)]
    struct FakePage {
        state: Arc<Mutex<PageState>>,
        pop_handlers: Arc<Mutex<Vec<Box<dyn Fn()>>>>,
    }

    struct PageState {
        host: String,
        path: String,
        entries: Vec<String>,
        replaced: Vec<String>,
    }

    impl FakePage {
        fn new(host: &str, path: &str) -> Self {
            Self {
                state: Arc::new(Mutex::new(PageState {
                    host: host.to_string(),
                    path: path.to_string(),
                    entries: vec![path.to_string()],
                    replaced: Vec::new(),
                })),
                pop_handlers: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn set_location(&self, host: &str, path: &str) {
            let mut state = self.state.lock().unwrap();
            state.host = host.to_string();
            state.path = path.to_string();
        }

        fn path(&self) -> String {
            self.state.lock().unwrap().path.clone()
        }

        fn entries(&self) -> Vec<String> {
            self.state.lock().unwrap().entries.clone()
        }

        fn replaced(&self) -> Vec<String> {
            self.state.lock().unwrap().replaced.clone()
        }

        fn dispatch_popstate(&self) {
            let handlers = self.pop_handlers.lock().unwrap();
            for handler in handlers.iter() {
                handler();
            }
        }

        fn apply_url(state: &mut PageState, raw: &str) {
            if let Some(host) = url::host(raw) {
                state.host = host.to_string();
            }
            state.path = url::path(raw).to_string();
        }
    }

    impl HostPage for FakePage {
        fn location(&self) -> Location {
            let state = self.state.lock().unwrap();
            Location::new(&state.host, &state.path)
        }

        fn replace_location(&self, target: &RedirectTarget) {
            let mut state = self.state.lock().unwrap();
            let raw = target.as_str().to_string();
            Self::apply_url(&mut state, &raw);
            state.replaced.push(raw.clone());
            match state.entries.last_mut() {
                Some(last) => *last = raw,
                None => state.entries.push(raw),
            }
        }

        fn on_popstate(&self, handler: Box<dyn Fn()>) {
            self.pop_handlers.lock().unwrap().push(handler);
        }
    }

    impl HistoryOps for FakePage {
        fn push(&self, raw: &str) {
            let mut state = self.state.lock().unwrap();
            state.entries.push(raw.to_string());
            Self::apply_url(&mut state, raw);
        }

        fn replace(&self, raw: &str) {
            let mut state = self.state.lock().unwrap();
            match state.entries.last_mut() {
                Some(last) => *last = raw.to_string(),
                None => state.entries.push(raw.to_string()),
            }
            Self::apply_url(&mut state, raw);
        }
    }

    fn feed_policy() -> PathRedirect {
        PathRedirect::new(["/", "/feed"], RedirectTarget::Path("/im".to_string()))
    }

    // Counts policy consultations; one consultation == one check.
    fn counting_policy(
        inner: impl RedirectPolicy + 'static,
    ) -> (Arc<AtomicUsize>, impl RedirectPolicy + 'static) {
        let checks = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&checks);
        let policy = move |location: &Location| {
            seen.fetch_add(1, Ordering::SeqCst);
            inner.decide(location)
        };
        (checks, policy)
    }

    #[test]
    fn test_install_checks_exactly_once() {
        let page = FakePage::new("vk.com", "/im");
        let (checks, policy) = counting_policy(feed_policy());
        let guard = NavigationGuard::new(page, policy);

        assert_eq!(checks.load(Ordering::SeqCst), 0);
        guard.install().unwrap();
        assert_eq!(checks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_install_redirects_blocked_initial_load() {
        let page = FakePage::new("vk.com", "/feed");
        let guard = NavigationGuard::new(page.clone(), feed_policy());

        guard.install().unwrap();
        assert_eq!(page.path(), "/im");
        assert_eq!(page.replaced(), vec!["/im".to_string()]);
    }

    #[test]
    fn test_double_install_rejected_without_checking() {
        let page = FakePage::new("vk.com", "/im");
        let (checks, policy) = counting_policy(feed_policy());
        let guard = NavigationGuard::new(page, policy);

        guard.install().unwrap();
        assert_eq!(guard.install(), Err(InstallError::AlreadyInstalled));
        assert_eq!(checks.load(Ordering::SeqCst), 1);
        assert!(guard.is_installed());
    }

    #[test]
    fn test_clones_share_install_latch() {
        let page = FakePage::new("vk.com", "/im");
        let guard = NavigationGuard::new(page, feed_policy());
        let clone = guard.clone();

        guard.install().unwrap();
        assert_eq!(clone.install(), Err(InstallError::AlreadyInstalled));
        assert!(clone.is_installed());
    }

    #[test]
    fn test_popstate_adds_exactly_one_check() {
        let page = FakePage::new("vk.com", "/im");
        let (checks, policy) = counting_policy(feed_policy());
        let guard = NavigationGuard::new(page.clone(), policy);
        guard.install().unwrap();

        page.dispatch_popstate();
        assert_eq!(checks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_popstate_observes_live_location() {
        let page = FakePage::new("vk.com", "/im");
        let guard = NavigationGuard::new(page.clone(), feed_policy());
        guard.install().unwrap();
        assert_eq!(page.path(), "/im");

        // Back lands on the feed, then the traversal event fires.
        page.set_location("vk.com", "/feed");
        page.dispatch_popstate();
        assert_eq!(page.path(), "/im");
    }

    #[test]
    fn test_push_forwards_unmodified_then_checks() {
        let page = FakePage::new("vk.com", "/im");
        let (checks, policy) = counting_policy(feed_policy());
        let guard = NavigationGuard::new(page.clone(), policy);
        guard.install().unwrap();
        let history = guard.wrap_history(page.clone());

        history.push("/about?tab=1");
        assert_eq!(checks.load(Ordering::SeqCst), 2);
        // The original mutation happened exactly as requested.
        assert_eq!(
            page.entries(),
            vec!["/im".to_string(), "/about?tab=1".to_string()]
        );
        assert_eq!(page.path(), "/about");
    }

    #[test]
    fn test_push_check_sees_post_mutation_location() {
        let page = FakePage::new("vk.com", "/im");
        let guard = NavigationGuard::new(page.clone(), feed_policy());
        guard.install().unwrap();
        let history = GuardedHistory::new(page.clone(), guard);

        // The redirect proves the check ran against /feed/123, not /im.
        history.push("/feed/123");
        assert_eq!(page.path(), "/im");
    }

    #[test]
    fn test_replace_forwards_unmodified_then_checks() {
        let page = FakePage::new("vk.com", "/im");
        let (checks, policy) = counting_policy(feed_policy());
        let guard = NavigationGuard::new(page.clone(), policy);
        guard.install().unwrap();
        let history = GuardedHistory::new(page.clone(), guard);

        history.replace("/about");
        assert_eq!(checks.load(Ordering::SeqCst), 2);
        assert_eq!(page.entries(), vec!["/about".to_string()]);
        assert_eq!(page.path(), "/about");
    }

    #[test]
    fn test_replace_check_sees_post_mutation_location() {
        let page = FakePage::new("vk.com", "/im");
        let guard = NavigationGuard::new(page.clone(), feed_policy());
        guard.install().unwrap();
        let history = GuardedHistory::new(page.clone(), guard);

        history.replace("/feed");
        assert_eq!(page.path(), "/im");
    }

    #[test]
    fn test_redirect_overwrites_blocked_entry() {
        let page = FakePage::new("vk.com", "/im");
        let guard = NavigationGuard::new(page.clone(), feed_policy());
        guard.install().unwrap();
        let history = guard.wrap_history(page.clone());

        history.push("/feed/123");
        // The blocked entry is gone; back from /im cannot reach it.
        assert_eq!(page.entries(), vec!["/im".to_string(), "/im".to_string()]);
    }

    #[test]
    fn test_unmatched_navigation_passes() {
        let page = FakePage::new("vk.com", "/im");
        let guard = NavigationGuard::new(page.clone(), feed_policy());
        guard.install().unwrap();
        let history = GuardedHistory::new(page.clone(), guard);

        history.push("/video");
        history.push("/docs");
        assert_eq!(page.replaced(), Vec::<String>::new());
        assert_eq!(page.path(), "/docs");
    }

    #[test]
    fn test_check_now_reads_location_fresh() {
        let page = FakePage::new("example.com", "/safe");
        let guard = NavigationGuard::new(page.clone(), feed_policy());

        assert_eq!(guard.check_now(), CheckOutcome::Pass);
        page.set_location("example.com", "/feed");
        assert_eq!(
            guard.check_now(),
            CheckOutcome::Redirect(RedirectTarget::Path("/im".to_string()))
        );
    }

    #[test]
    fn test_check_now_is_stateless_across_calls() {
        let page = FakePage::new("vk.com", "/video");
        let (checks, policy) = counting_policy(feed_policy());
        let guard = NavigationGuard::new(page, policy);

        assert_eq!(guard.check_now(), CheckOutcome::Pass);
        assert_eq!(guard.check_now(), CheckOutcome::Pass);
        assert_eq!(checks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_absolute_destination_moves_host() {
        let blocked = PathRedirect::new(
            ["/feed"],
            RedirectTarget::Url("https://safe.org/start".to_string()),
        );
        let page = FakePage::new("vk.com", "/feed");
        let guard = NavigationGuard::new(page.clone(), blocked);

        guard.install().unwrap();
        assert_eq!(page.location(), Location::new("safe.org", "/start"));
    }
}
