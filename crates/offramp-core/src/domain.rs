//! Base-domain matching against live hostnames
//!
//! A rule domain like `vk.com` covers the host itself and every subdomain
//! (`m.vk.com`, `login.vk.com`). Matching respects label boundaries, so
//! `vk.com.evil.org` never matches a `vk.com` rule. Hostnames compare
//! case-insensitively per DNS.

// =============================================================================
// Matching
// =============================================================================

/// True when `host` is `domain` itself or a subdomain of it.
#[inline]
pub fn host_matches(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }

    let host = host.as_bytes();
    let domain = domain.as_bytes();

    if host.eq_ignore_ascii_case(domain) {
        return true;
    }

    // Subdomain: host must end with ".<domain>", dot included so that a
    // longer registrable name cannot alias a shorter rule.
    if host.len() > domain.len() {
        let tail = &host[host.len() - domain.len()..];
        let sep = host[host.len() - domain.len() - 1];
        return sep == b'.' && tail.eq_ignore_ascii_case(domain);
    }

    false
}

/// First domain in `domains` that covers `host`, if any.
#[inline]
pub fn matching_domain<'a>(host: &str, domains: &'a [String]) -> Option<&'a str> {
    domains
        .iter()
        .find(|d| host_matches(host, d))
        .map(|d| d.as_str())
}
