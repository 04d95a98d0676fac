#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const SCOPED_CONFIG: &str = r#"{ "rules": [
    { "kind": "path_redirect", "destination": "/im",
      "prefixes": ["/feed"], "include_root": true,
      "hosts": ["vk.com", "vk.ru"] }
]}"#;

// One test drives the whole install lifecycle: the harness page is shared
// between tests, so the sequence has to live in a single function. The
// config is host-scoped away from the harness origin, so the initial
// check never navigates the test page.
#[wasm_bindgen_test]
fn install_lifecycle() {
    assert!(!offramp_wasm::is_installed());

    assert!(offramp_wasm::install("{ not json").is_err());
    assert!(!offramp_wasm::is_installed());

    offramp_wasm::install(SCOPED_CONFIG).unwrap();
    assert!(offramp_wasm::is_installed());

    assert!(offramp_wasm::install(SCOPED_CONFIG).is_err());

    // pushState now goes through the wrapper. A same-origin url succeeds;
    // a cross-origin url makes the saved original throw, and the wrapper
    // must surface that throw instead of swallowing it.
    let history = web_sys::window().unwrap().history().unwrap();
    assert!(history
        .push_state_with_url(&JsValue::NULL, "", Some("/wrapped"))
        .is_ok());
    assert!(history
        .push_state_with_url(
            &JsValue::NULL,
            "",
            Some("https://cross-origin.example/feed")
        )
        .is_err());
}

#[wasm_bindgen_test]
fn stateless_helpers() {
    assert_eq!(
        offramp_wasm::extract_host_js("https://vk.com/feed"),
        Some("vk.com".to_string())
    );
    assert_eq!(offramp_wasm::extract_host_js("/feed"), None);

    assert!(offramp_wasm::host_matches_js("m.vk.com", "vk.com"));
    assert!(!offramp_wasm::host_matches_js("vk.com.evil.org", "vk.com"));

    let config = r#"{ "rules": [
        { "kind": "host_blocklist", "destination": "https://safe.org",
          "domains": ["example.com"] }
    ]}"#;
    assert_eq!(
        offramp_wasm::check_url(config, "https://sub.example.com/page").unwrap(),
        Some("https://safe.org".to_string())
    );
    assert_eq!(
        offramp_wasm::check_url(config, "https://safe.org/").unwrap(),
        None
    );
    // Schemeless relative input is rejected rather than read as a path.
    assert!(offramp_wasm::check_url(config, "example.com/page").is_err());
}
