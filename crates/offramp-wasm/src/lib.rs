//! WebAssembly bindings for Offramp
//!
//! Installs the navigation guard against the real browser: location reads
//! and `location.replace` through `web-sys`, popstate via an event
//! listener, and `history.pushState`/`replaceState` interception by
//! rebinding the history properties to wrapping closures. The saved
//! original `Function` objects still perform every mutation; the wrappers
//! only append a check.
//!
//! Timing: the embedder must call [`install`] before any page script can
//! mutate navigation state (userscript `document-start` timing), otherwise
//! the first client-side route change can slip past unchecked.

use std::sync::atomic::{AtomicBool, Ordering};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use offramp_config::{build_policies, parse_config};
use offramp_core::{domain, url};
use offramp_core::{HostPage, Location, NavigationGuard, RedirectPolicy, RedirectTarget};

static INSTALLED: AtomicBool = AtomicBool::new(false);

// =============================================================================
// Browser Page
// =============================================================================

/// Live page handle; every read goes straight to `window`.
#[derive(Clone)]
struct BrowserPage {
    window: web_sys::Window,
}

impl BrowserPage {
    fn new(window: web_sys::Window) -> Self {
        Self { window }
    }
}

impl HostPage for BrowserPage {
    fn location(&self) -> Location {
        let location = self.window.location();
        Location::new(
            location.hostname().unwrap_or_default(),
            location.pathname().unwrap_or_else(|_| "/".to_string()),
        )
    }

    fn replace_location(&self, target: &RedirectTarget) {
        // Replacing navigation keeps the back button away from the entry
        // being left.
        let _ = self.window.location().replace(target.as_str());
    }

    fn on_popstate(&self, handler: Box<dyn Fn()>) {
        let closure = Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
        let _ = self
            .window
            .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        // The listener lives as long as the page.
        closure.forget();
    }
}

// =============================================================================
// History Interception
// =============================================================================

fn original_method(history: &JsValue, name: &str) -> Result<js_sys::Function, JsValue> {
    js_sys::Reflect::get(history, &JsValue::from_str(name))?.dyn_into()
}

/// Rebind one history method to a wrapper that applies the saved original
/// with its arguments untouched, then checks the updated location. A throw
/// from the original (say a `SecurityError` on a cross-origin url)
/// propagates to the caller unchanged; the check only runs after a
/// successful mutation.
fn hook_history_method(
    history: &JsValue,
    name: &str,
    original: js_sys::Function,
    guard: NavigationGuard<BrowserPage>,
) -> Result<(), JsValue> {
    let target = history.clone();
    let wrapper = Closure::wrap(Box::new(
        move |state: JsValue, title: JsValue, url: JsValue| {
            match original.call3(&target, &state, &title, &url) {
                Ok(_) => {
                    guard.check_now();
                }
                Err(e) => wasm_bindgen::throw_val(e),
            }
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue)>);

    js_sys::Reflect::set(history, &JsValue::from_str(name), wrapper.as_ref())?;
    wrapper.forget();
    Ok(())
}

// =============================================================================
// Exports
// =============================================================================

/// Install the navigation guard into the current page.
///
/// Parses the JSON rule config, rebinds `history.pushState` and
/// `history.replaceState` to checking wrappers, subscribes `popstate`, and
/// runs the initial check synchronously. A second call returns an error
/// without touching the page, so installing twice can never double-trigger
/// checks. A config error also leaves the page untouched and does not
/// latch the install.
#[wasm_bindgen]
pub fn install(config_json: &str) -> Result<(), JsValue> {
    if INSTALLED.load(Ordering::SeqCst) {
        return Err(JsValue::from_str(
            "Already installed. Reload the page to reinstall.",
        ));
    }

    let config = parse_config(config_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
    let report = build_policies(&config)
        .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window available"))?;
    let history: JsValue = window
        .history()
        .map_err(|_| JsValue::from_str("No history available"))?
        .into();

    let page = BrowserPage::new(window);
    let guard = NavigationGuard::new(page, report.policies);

    let push_original = original_method(&history, "pushState")?;
    let replace_original = original_method(&history, "replaceState")?;
    hook_history_method(&history, "pushState", push_original, guard.clone())?;
    hook_history_method(&history, "replaceState", replace_original, guard.clone())?;

    guard
        .install()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    INSTALLED.store(true, Ordering::SeqCst);
    Ok(())
}

/// True once a guard is active in this page.
#[wasm_bindgen]
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}

/// Evaluate a config against a URL without touching the page. The URL must
/// be absolute or start with `/`; anything else (`"vk.com/feed"`) would be
/// read as a bare path and silently match nothing. Returns the redirect
/// target, or `None` when every rule passes.
#[wasm_bindgen]
pub fn check_url(config_json: &str, url: &str) -> Result<Option<String>, JsValue> {
    if !url::is_absolute(url) && !url.starts_with('/') {
        return Err(JsValue::from_str(&format!(
            "URL must be absolute or start with '/', got '{}'",
            url
        )));
    }

    let config = parse_config(config_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
    let report = build_policies(&config)
        .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;

    let location = Location::from_url(url, "");
    Ok(report
        .policies
        .decide(&location)
        .map(|target| target.as_str().to_string()))
}

/// Hostname of an absolute URL, if it carries one.
#[wasm_bindgen]
pub fn extract_host_js(input: &str) -> Option<String> {
    url::host(input).map(|h| h.to_string())
}

/// True when `host` is `base` or one of its subdomains.
#[wasm_bindgen]
pub fn host_matches_js(host: &str, base: &str) -> bool {
    domain::host_matches(host, base)
}
