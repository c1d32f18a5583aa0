use crate::cache::TenantCache;
use crate::config::{Config, HostnameSource};
use crate::errors::{StoreError, TenantError};
use crate::extract::slug_for_request;
use crate::metrics_defs::{STORE_LOOKUP_DURATION, STORE_LOOKUP_ERRORS, TENANT_RESOLUTION};
use crate::slug::TenantSlug;
use crate::store::{OrganizationStore, get_store};
use crate::types::{Organization, TenantContext};
use http::Request;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Server side entry point of tenant resolution. Built once at startup and
/// shared by every request handler.
#[derive(Clone)]
pub struct TenantResolver {
    store: Arc<dyn OrganizationStore>,
    cache: TenantCache,
    ttl: Duration,
    hostname_source: HostnameSource,
}

impl TenantResolver {
    pub fn new(
        store: Arc<dyn OrganizationStore>,
        cache: TenantCache,
        ttl: Duration,
        hostname_source: HostnameSource,
    ) -> Self {
        TenantResolver {
            store,
            cache,
            ttl,
            hostname_source,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let store = get_store(&config.store)?;
        let cache = TenantCache::new(config.cache.max_capacity, config.cache.negative_ttl());
        Ok(Self::new(
            store,
            cache,
            config.cache.ttl(),
            config.hostname_source,
        ))
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    /// Tenant slug carried by the request, if any.
    pub fn slug_for_request<B>(&self, req: &Request<B>) -> Option<TenantSlug> {
        slug_for_request(req, self.hostname_source)
    }

    /// Looks up the organization for `slug` through the cache.
    pub async fn resolve(&self, slug: &TenantSlug) -> Result<Option<Arc<Organization>>, TenantError> {
        let store = &self.store;
        self.cache
            .remember(&slug.cache_key(), self.ttl, || async move {
                let started = Instant::now();
                let result = store.find_by_slug(slug).await;
                histogram!(STORE_LOOKUP_DURATION).record(started.elapsed().as_secs_f64());
                if let Err(e) = &result {
                    counter!(STORE_LOOKUP_ERRORS).increment(1);
                    tracing::error!(%slug, error = %e, "Organization lookup failed");
                }
                result
            })
            .await
    }

    /// Builds the tenant context for a request whose slug was already
    /// extracted. A missing slug or an unknown organization is not an error.
    pub async fn context_for(&self, slug: Option<TenantSlug>) -> Result<TenantContext, TenantError> {
        let Some(slug) = slug else {
            counter!(TENANT_RESOLUTION, "outcome" => "no_slug").increment(1);
            return Ok(TenantContext::default());
        };

        let tenant = self.resolve(&slug).await?;
        let outcome = match tenant {
            Some(_) => "resolved",
            None => "unknown",
        };
        counter!(TENANT_RESOLUTION, "outcome" => outcome).increment(1);
        tracing::debug!(%slug, outcome, "Resolved tenant");

        Ok(TenantContext::new(Some(slug), tenant))
    }
}
