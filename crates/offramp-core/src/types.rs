//! Core type definitions for Offramp
//!
//! These types flow through every check the guard performs and are shared
//! between the policies, the guard plumbing, and the host-page bindings.

use std::fmt;

use crate::url;

// =============================================================================
// Location Snapshot
// =============================================================================

/// Snapshot of the page location at the moment of a check.
///
/// Always read fresh from the host page; never cached between checks, since
/// it must reflect the live browser state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Current hostname, without scheme or port.
    pub host: String,
    /// Current path, starting with `/`.
    pub path: String,
}

impl Location {
    /// Create a snapshot from host and path parts.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }

    /// Build a snapshot from a URL string, falling back to `current_host`
    /// when the URL carries no authority part (a bare path such as the
    /// argument of an in-page history mutation). Inputs must be absolute
    /// or `/`-prefixed; a schemeless `"vk.com/feed"` would land in `path`
    /// verbatim, so boundaries taking user input reject that shape first.
    pub fn from_url(url: &str, current_host: &str) -> Self {
        let host = url::host(url).unwrap_or(current_host);
        Self {
            host: host.to_string(),
            path: url::path(url).to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.host, self.path)
    }
}

// =============================================================================
// Redirect Target
// =============================================================================

/// Where a policy sends the page.
///
/// `Path` keeps the current origin (the `location.origin + "/im"` form);
/// `Url` is an absolute destination that may leave the site entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Origin-relative destination path.
    Path(String),
    /// Absolute destination URL.
    Url(String),
}

impl RedirectTarget {
    /// Hostname of the destination, when one is statically present.
    /// `Path` targets stay on whatever host triggered the redirect.
    pub fn host(&self) -> Option<&str> {
        match self {
            RedirectTarget::Path(_) => None,
            RedirectTarget::Url(u) => url::host(u),
        }
    }

    /// Path component of the destination.
    pub fn path_component(&self) -> &str {
        match self {
            RedirectTarget::Path(p) => p,
            RedirectTarget::Url(u) => url::path(u),
        }
    }

    /// The string handed to the host page for the replacing navigation.
    pub fn as_str(&self) -> &str {
        match self {
            RedirectTarget::Path(p) => p,
            RedirectTarget::Url(u) => u,
        }
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Check Outcome
// =============================================================================

/// Result of one guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Every policy passed; no navigation was performed.
    Pass,
    /// A policy matched and a replacing navigation to the target was issued.
    Redirect(RedirectTarget),
}

impl CheckOutcome {
    /// True when the check issued a navigation.
    pub fn is_redirect(&self) -> bool {
        matches!(self, CheckOutcome::Redirect(_))
    }
}
