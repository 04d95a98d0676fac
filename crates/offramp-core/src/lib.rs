//! Offramp Core Library
//!
//! This crate provides the navigation guard and redirect policies for
//! Offramp, a page-level redirect blocker. The guard watches every
//! transition of the page location and applies a decision function that may
//! steer the browser somewhere else with a replacing navigation.
//!
//! # Architecture
//!
//! The guard is host-agnostic: it talks to the page through the [`HostPage`]
//! and [`HistoryOps`] traits and re-checks the location at four trigger
//! points (registration, popstate, and after each intercepted push/replace
//! history mutation). Decision functions are pure `(path, host)` lookups
//! with a construction-time self-check that disarms any rule whose
//! destination would re-trigger it.
//!
//! # Modules
//!
//! - `types`: location snapshot, redirect target, and check outcome types
//! - `url`: allocation-free host/path extraction from URL strings
//! - `domain`: exact-or-subdomain base-domain matching
//! - `policy`: the pluggable decision functions and their combinator
//! - `guard`: interception plumbing and the check loop

pub mod domain;
pub mod guard;
pub mod policy;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use guard::{GuardedHistory, HistoryOps, HostPage, InstallError, NavigationGuard};
pub use policy::{
    HostBlocklist, Neutralization, PathRedirect, PolicySet, RedirectPolicy, WeekdaySource,
};
pub use types::{CheckOutcome, Location, RedirectTarget};
