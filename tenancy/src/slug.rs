//! Hostname to tenant slug parsing.
//!
//! A tenant slug is lowercase ASCII letters, digits and single hyphens, with
//! no leading or trailing hyphen. Slugs can only be built through
//! normalization, so a `TenantSlug` value always satisfies that shape.

use serde::Serialize;
use std::fmt;

const CACHE_KEY_PREFIX: &str = "tenant:slug:";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantSlug(String);

impl TenantSlug {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the lookup result for this slug is cached.
    pub fn cache_key(&self) -> String {
        format!("{CACHE_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercases `raw`, collapses every run of characters outside `[a-z0-9]`
/// into a single hyphen and trims hyphens from both ends.
/// Returns `None` if nothing is left.
pub fn normalize_slug(raw: &str) -> Option<TenantSlug> {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for ch in raw.chars().map(|c| c.to_ascii_lowercase()) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        None
    } else {
        Some(TenantSlug(slug))
    }
}

/// Derives the tenant slug from a hostname. The port must already be removed.
///
/// - `*localhost*` hosts use the first label when there is more than one
///   (`demo.localhost` -> `demo`, bare `localhost` -> none).
/// - Otherwise a leading `www` label is dropped. Two remaining labels form a
///   dedicated tenant domain and are kept whole (`example.com` ->
///   `example-com`). With three or more the leftmost label is the tenant.
///   There is no public suffix handling.
/// - Single label hosts have no tenant.
///
/// A resolved slug such as `acme` is itself a single label host, so feeding
/// it back in yields `None`.
pub fn parse_tenant_slug(hostname: &str) -> Option<TenantSlug> {
    let parts: Vec<&str> = hostname.split('.').collect();

    let candidate = if hostname.contains("localhost") {
        if parts.len() > 1 {
            Some(parts[0].to_string())
        } else {
            None
        }
    } else {
        let clean_parts = match parts.split_first() {
            Some((&"www", rest)) => rest,
            _ => &parts[..],
        };

        match clean_parts.len() {
            2 => Some(clean_parts.join(".")),
            n if n > 2 => Some(clean_parts[0].to_string()),
            _ => None,
        }
    };

    normalize_slug(&candidate?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(hostname: &str) -> Option<String> {
        parse_tenant_slug(hostname).map(|s| s.to_string())
    }

    #[test]
    fn test_localhost() {
        assert_eq!(slug("localhost"), None);
        assert_eq!(slug("tenant.localhost"), Some("tenant".into()));
        assert_eq!(slug("demo.localhost"), Some("demo".into()));
        // Only the first label counts, even with deeper nesting
        assert_eq!(slug("a.b.localhost"), Some("a".into()));
        // Substring match, not a label match
        assert_eq!(slug("shop.mylocalhost.dev"), Some("shop".into()));
    }

    #[test]
    fn test_two_label_domains() {
        assert_eq!(slug("www.example.com"), Some("example-com".into()));
        assert_eq!(slug("example.com"), Some("example-com".into()));
        assert_eq!(slug("EXAMPLE.COM"), Some("example-com".into()));
    }

    #[test]
    fn test_subdomain_tenancy() {
        assert_eq!(slug("acme.example.com"), Some("acme".into()));
        assert_eq!(slug("www.acme.example.com"), Some("acme".into()));
        // No public suffix awareness
        assert_eq!(slug("shop.co.uk"), Some("shop".into()));
        assert_eq!(slug("My_Shop.example.com"), Some("my-shop".into()));
    }

    #[test]
    fn test_no_tenant() {
        assert_eq!(slug(""), None);
        assert_eq!(slug("intranet"), None);
        assert_eq!(slug("www"), None);
        // Candidate normalizes to nothing
        assert_eq!(slug("---.example.com"), None);
        assert_eq!(slug("_.localhost"), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_slug("Acme Corp!").unwrap().as_str(), "acme-corp");
        assert_eq!(normalize_slug("--a__b--c--").unwrap().as_str(), "a-b-c");
        assert_eq!(normalize_slug("caf\u{e9}-42").unwrap().as_str(), "caf-42");
        assert_eq!(normalize_slug("..."), None);
        assert_eq!(normalize_slug(""), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["Acme Corp", "example.com", "a--b", "x", "Über-Store 9"] {
            let once = normalize_slug(raw).unwrap();
            let twice = normalize_slug(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        for host in ["acme.example.com", "demo.localhost", "www.example.com"] {
            assert_eq!(parse_tenant_slug(host), parse_tenant_slug(host));
        }
    }

    #[test]
    fn test_resolved_slug_does_not_round_trip() {
        let resolved = parse_tenant_slug("acme.example.com").unwrap();
        assert_eq!(resolved.as_str(), "acme");
        assert_eq!(parse_tenant_slug(resolved.as_str()), None);

        // Two label results contain a hyphen but no dot, so they do not round trip either
        let resolved = parse_tenant_slug("example.com").unwrap();
        assert_eq!(parse_tenant_slug(resolved.as_str()), None);
    }

    #[test]
    fn test_cache_key() {
        let slug = parse_tenant_slug("acme.example.com").unwrap();
        assert_eq!(slug.cache_key(), "tenant:slug:acme");
    }
}
