//! Trace replay against an in-memory page
//!
//! Drives a [`NavigationGuard`] through a scripted browser session: an
//! initial document load, pushes and replaces through the guarded history
//! wrapper, and back/forward traversals that fire popstate. Shows what a
//! config does to a whole session without loading a browser.
//!
//! Trace files are JSONL, one step per line:
//!
//! ```text
//! {"op": "load", "url": "https://vk.com/feed"}
//! {"op": "push", "url": "/video"}
//! {"op": "back"}
//! ```

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use offramp_config::{build_policies, parse_config};
use offramp_core::{url, HistoryOps, HostPage, Location, NavigationGuard, RedirectTarget};

pub struct ReplayOptions {
    pub config_path: String,
    pub trace_path: String,
}

// =============================================================================
// Trace Format
// =============================================================================

/// One step of a scripted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStep {
    /// Full document load (absolute URL).
    Load(String),
    /// `history.pushState` with the given url argument.
    Push(String),
    /// `history.replaceState` with the given url argument.
    Replace(String),
    /// Back traversal.
    Back,
    /// Forward traversal.
    Forward,
}

/// Parse a JSONL trace. Blank lines and `#` comment lines are skipped;
/// anything else must be a JSON object with an `op` field.
pub fn parse_trace(text: &str) -> Result<Vec<TraceStep>, String> {
    let mut steps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let number = index + 1;
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|e| format!("trace line {}: {}", number, e))?;
        let op = value
            .get("op")
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("trace line {}: missing 'op' field", number))?;

        let step = match op {
            "load" => TraceStep::Load(step_url(&value, number, op)?),
            "push" => TraceStep::Push(step_url(&value, number, op)?),
            "replace" => TraceStep::Replace(step_url(&value, number, op)?),
            "back" => TraceStep::Back,
            "forward" => TraceStep::Forward,
            other => return Err(format!("trace line {}: unknown op '{}'", number, other)),
        };
        steps.push(step);
    }
    Ok(steps)
}

fn step_url(value: &serde_json::Value, number: usize, op: &str) -> Result<String, String> {
    let raw = value
        .get("url")
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("trace line {}: op '{}' needs a 'url' field", number, op))?;
    // The scripted page does not resolve relative paths against the current
    // entry, so every trace url must be absolute or start with '/'.
    if !url::is_absolute(raw) && !raw.starts_with('/') {
        return Err(format!(
            "trace line {}: url must be absolute or start with '/', got '{}'",
            number, raw
        ));
    }
    Ok(raw.to_string())
}

// =============================================================================
// Scripted Page
// =============================================================================

/// In-memory stand-in for a browser tab: a current location, a session
/// history with a movable cursor, and popstate subscribers. Clones are
/// handles to the same tab.
///
/// Entries are stored resolved (host plus path), so traversing back across
/// a host change restores the host the entry was created on.
#[derive(Clone)]
pub struct ScriptedPage {
    state: Rc<RefCell<PageState>>,
    pop_handlers: Rc<RefCell<Vec<Box<dyn Fn()>>>>,
}

struct PageState {
    host: String,
    path: String,
    entries: Vec<Location>,
    cursor: usize,
    redirects: Vec<String>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PageState {
                host: String::new(),
                path: "/".to_string(),
                entries: Vec::new(),
                cursor: 0,
                redirects: Vec::new(),
            })),
            pop_handlers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Full document load: drop any forward history, append an entry, move
    /// there. Popstate does not fire for loads.
    pub fn load(&self, raw: &str) {
        let mut state = self.state.borrow_mut();
        Self::append_entry(&mut state, raw);
    }

    /// Move the cursor back one entry and fire popstate. No-op at the
    /// oldest entry, like a browser: no move, no event.
    pub fn back(&self) -> bool {
        let moved = {
            let mut state = self.state.borrow_mut();
            if state.cursor == 0 {
                false
            } else {
                state.cursor -= 1;
                Self::restore_entry(&mut state);
                true
            }
        };
        if moved {
            self.dispatch_popstate();
        }
        moved
    }

    /// Move the cursor forward one entry and fire popstate. No-op at the
    /// newest entry.
    pub fn forward(&self) -> bool {
        let moved = {
            let mut state = self.state.borrow_mut();
            if state.cursor + 1 >= state.entries.len() {
                false
            } else {
                state.cursor += 1;
                Self::restore_entry(&mut state);
                true
            }
        };
        if moved {
            self.dispatch_popstate();
        }
        moved
    }

    /// Number of entries currently in the session history.
    pub fn history_len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Number of replacing navigations the guard has issued so far.
    pub fn redirect_count(&self) -> usize {
        self.state.borrow().redirects.len()
    }

    /// Target of the most recent replacing navigation.
    pub fn last_redirect(&self) -> Option<String> {
        self.state.borrow().redirects.last().cloned()
    }

    fn dispatch_popstate(&self) {
        let handlers = self.pop_handlers.borrow();
        for handler in handlers.iter() {
            handler();
        }
    }

    fn append_entry(state: &mut PageState, raw: &str) {
        let location = Location::from_url(raw, &state.host);
        let keep = (state.cursor + 1).min(state.entries.len());
        state.entries.truncate(keep);
        state.entries.push(location.clone());
        state.cursor = state.entries.len() - 1;
        state.host = location.host;
        state.path = location.path;
    }

    fn overwrite_entry(state: &mut PageState, location: Location) {
        state.host = location.host.clone();
        state.path = location.path.clone();
        let cursor = state.cursor;
        match state.entries.get_mut(cursor) {
            Some(entry) => *entry = location,
            None => state.entries.push(location),
        }
    }

    fn restore_entry(state: &mut PageState) {
        let entry = state.entries[state.cursor].clone();
        state.host = entry.host;
        state.path = entry.path;
    }
}

impl Default for ScriptedPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPage for ScriptedPage {
    fn location(&self) -> Location {
        let state = self.state.borrow();
        Location::new(&state.host, &state.path)
    }

    fn replace_location(&self, target: &RedirectTarget) {
        let mut state = self.state.borrow_mut();
        let location = Location::from_url(target.as_str(), &state.host);
        Self::overwrite_entry(&mut state, location);
        state.redirects.push(target.as_str().to_string());
    }

    fn on_popstate(&self, handler: Box<dyn Fn()>) {
        self.pop_handlers.borrow_mut().push(handler);
    }
}

impl HistoryOps for ScriptedPage {
    fn push(&self, raw: &str) {
        let mut state = self.state.borrow_mut();
        Self::append_entry(&mut state, raw);
    }

    fn replace(&self, raw: &str) {
        let mut state = self.state.borrow_mut();
        let location = Location::from_url(raw, &state.host);
        Self::overwrite_entry(&mut state, location);
    }
}

// =============================================================================
// Replay Driver
// =============================================================================

pub fn run(opts: ReplayOptions) -> Result<(), String> {
    let config_text = fs::read_to_string(&opts.config_path)
        .map_err(|e| format!("Failed to read '{}': {}", opts.config_path, e))?;
    let trace_text = fs::read_to_string(&opts.trace_path)
        .map_err(|e| format!("Failed to read '{}': {}", opts.trace_path, e))?;

    let config = parse_config(&config_text).map_err(|e| e.to_string())?;
    let report = build_policies(&config).map_err(|e| e.to_string())?;
    for lint in &report.lints {
        println!("Warning: {}", lint);
    }

    let steps = parse_trace(&trace_text)?;
    match steps.first() {
        None => return Err("trace is empty".to_string()),
        Some(TraceStep::Load(_)) => {}
        Some(_) => return Err("trace must start with a 'load' step".to_string()),
    }

    let page = ScriptedPage::new();
    let guard = NavigationGuard::new(page.clone(), report.policies);
    let history = guard.wrap_history(page.clone());

    println!("Replaying {} steps from '{}'", steps.len(), opts.trace_path);
    println!();

    for (index, step) in steps.iter().enumerate() {
        let before = page.redirect_count();
        let mut moved = true;
        let (op, shown) = match step {
            TraceStep::Load(url) => {
                page.load(url);
                if index == 0 {
                    guard.install().map_err(|e| e.to_string())?;
                } else {
                    guard.check_now();
                }
                ("load", url.clone())
            }
            TraceStep::Push(url) => {
                history.push(url);
                ("push", url.clone())
            }
            TraceStep::Replace(url) => {
                history.replace(url);
                ("replace", url.clone())
            }
            TraceStep::Back => {
                moved = page.back();
                ("back", String::new())
            }
            TraceStep::Forward => {
                moved = page.forward();
                ("forward", String::new())
            }
        };

        let outcome = if !moved {
            "no-op".to_string()
        } else if page.redirect_count() > before {
            format!(
                "redirect to {} (now {})",
                page.last_redirect().unwrap_or_default(),
                page.location()
            )
        } else {
            "pass".to_string()
        };
        println!("[{:>3}] {:<8} {:<36} -> {}", index + 1, op, shown, outcome);

        // One bounded follow-up per redirect: if the landing location
        // triggers a rule too, the rules chase each other and the operator
        // needs to know. The chain is never followed further.
        let after_step = page.redirect_count();
        if after_step > before {
            guard.check_now();
            if page.redirect_count() > after_step {
                println!(
                    "      warning: landing location redirects again (now {}); rules are chasing each other",
                    page.location()
                );
            }
        }
    }

    println!();
    println!("Replay complete");
    println!("  Final location: {}", page.location());
    println!("  History depth:  {}", page.history_len());
    println!("  Redirects:      {}", page.redirect_count());
    Ok(())
}
