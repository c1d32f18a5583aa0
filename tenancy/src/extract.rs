//! Obtains the hostname a tenant is derived from, on the server (request
//! headers) or on the client (the browser location).

use crate::config::HostnameSource;
use crate::slug::{TenantSlug, parse_tenant_slug};
use http::header::{HOST, REFERER};
use http::{HeaderMap, Request};
use url::Url;

/// Removes a trailing `:port` from a `Host` header value. Bracketed IPv6
/// literals keep their brackets.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}

/// Hostname from the `Host` header, or from the URI authority when the
/// header is missing (HTTP/2 carries it in `:authority`).
pub fn request_hostname<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(|host| strip_port(host).to_string())
        .or_else(|| req.uri().host().map(String::from))
}

/// Hostname of the `Referer` URL. Any problem with the header (missing, not
/// UTF-8, not a URL, no host) yields `None`.
pub fn referer_hostname(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(REFERER)?.to_str().ok()?;
    match Url::parse(referer) {
        Ok(url) => url.host_str().map(String::from),
        Err(e) => {
            tracing::debug!(referer, error = %e, "Ignoring malformed referer");
            None
        }
    }
}

/// Tenant slug from the request's own host.
pub fn slug_from_host<B>(req: &Request<B>) -> Option<TenantSlug> {
    request_hostname(req).and_then(|hostname| parse_tenant_slug(&hostname))
}

/// Tenant slug preferring the `Referer` hostname over the request's host.
///
/// A storefront calling the API from another origin identifies the tenant
/// through its own origin, which only the referer carries. When the referer
/// yields a hostname it is authoritative, even if that hostname has no slug.
pub fn slug_from_referer_or_host<B>(req: &Request<B>) -> Option<TenantSlug> {
    match referer_hostname(req.headers()) {
        Some(hostname) => parse_tenant_slug(&hostname),
        None => slug_from_host(req),
    }
}

pub fn slug_for_request<B>(req: &Request<B>, source: HostnameSource) -> Option<TenantSlug> {
    match source {
        HostnameSource::Host => slug_from_host(req),
        HostnameSource::Referer => slug_from_referer_or_host(req),
    }
}

/// Client side accessor. `location` is the browsing context's current
/// location; outside a browser there is none and no resolution is attempted.
pub fn slug_from_location(location: Option<&Url>) -> Option<TenantSlug> {
    location?.host_str().and_then(parse_tenant_slug)
}
