//! JSON configuration schema
//!
//! One config file describes the full rule set of a deployment. Rules are
//! ordered; earlier rules win. The schema carries raw strings only;
//! turning them into policies, including the destination self-check, is
//! the builder's job.
//!
//! ```json
//! { "rules": [
//!   { "kind": "path_redirect", "destination": "/im",
//!     "prefixes": ["/feed", "/al_feed"], "include_root": true,
//!     "hosts": ["vk.com", "vk.ru"] },
//!   { "kind": "host_blocklist", "destination": "https://github.com/sorrtory",
//!     "domains": ["facebook.com", "news.google.com"], "allow_on": "sunday" }
//! ]}
//! ```

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Redirect configured path prefixes to a fixed destination, optionally
    /// only on certain hosts.
    PathRedirect {
        destination: String,
        #[serde(default)]
        prefixes: Vec<String>,
        /// Also match the root path exactly (`/` but not `/anything`).
        #[serde(default)]
        include_root: bool,
        /// Base domains the rule applies on; empty means every host.
        #[serde(default)]
        hosts: Vec<String>,
    },
    /// Redirect every visit to a blocked base domain to a fixed destination.
    HostBlocklist {
        destination: String,
        domains: Vec<String>,
        /// Weekday name suspending the rule, e.g. `"sunday"`.
        #[serde(default)]
        allow_on: Option<String>,
    },
}

impl RuleConfig {
    /// Short `kind -> destination` label for lints and CLI output.
    pub fn summary(&self) -> String {
        match self {
            RuleConfig::PathRedirect { destination, .. } => {
                format!("path_redirect -> {}", destination)
            }
            RuleConfig::HostBlocklist { destination, .. } => {
                format!("host_blocklist -> {}", destination)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"{
        "rules": [
            { "kind": "path_redirect", "destination": "/im",
              "prefixes": ["/feed", "/al_feed"], "include_root": true,
              "hosts": ["vk.com", "vk.ru"] },
            { "kind": "host_blocklist", "destination": "https://github.com/sorrtory",
              "domains": ["facebook.com", "news.google.com"], "allow_on": "sunday" }
        ]
    }"#;

    #[test]
    fn test_parse_example_config() {
        let config: GuardConfig = serde_json::from_str(EXAMPLE).unwrap();
        assert_eq!(config.rules.len(), 2);

        match &config.rules[0] {
            RuleConfig::PathRedirect {
                destination,
                prefixes,
                include_root,
                hosts,
            } => {
                assert_eq!(destination, "/im");
                assert_eq!(prefixes, &["/feed", "/al_feed"]);
                assert!(include_root);
                assert_eq!(hosts, &["vk.com", "vk.ru"]);
            }
            other => panic!("wrong rule kind: {:?}", other),
        }

        match &config.rules[1] {
            RuleConfig::HostBlocklist {
                destination,
                domains,
                allow_on,
            } => {
                assert_eq!(destination, "https://github.com/sorrtory");
                assert_eq!(domains.len(), 2);
                assert_eq!(allow_on.as_deref(), Some("sunday"));
            }
            other => panic!("wrong rule kind: {:?}", other),
        }
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{ "rules": [
            { "kind": "path_redirect", "destination": "/im", "prefixes": ["/feed"] }
        ]}"#;
        let config: GuardConfig = serde_json::from_str(json).unwrap();
        match &config.rules[0] {
            RuleConfig::PathRedirect {
                include_root, hosts, ..
            } => {
                assert!(!include_root);
                assert!(hosts.is_empty());
            }
            other => panic!("wrong rule kind: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = r#"{ "rules": [ { "kind": "regex_rewrite", "destination": "/x" } ] }"#;
        assert!(serde_json::from_str::<GuardConfig>(json).is_err());
    }

    #[test]
    fn test_blocklist_requires_domains() {
        let json = r#"{ "rules": [ { "kind": "host_blocklist", "destination": "https://a.org" } ] }"#;
        assert!(serde_json::from_str::<GuardConfig>(json).is_err());
    }

    #[test]
    fn test_summary_labels() {
        let config: GuardConfig = serde_json::from_str(EXAMPLE).unwrap();
        assert_eq!(config.rules[0].summary(), "path_redirect -> /im");
        assert_eq!(
            config.rules[1].summary(),
            "host_blocklist -> https://github.com/sorrtory"
        );
    }
}
