// Short lived cache of slug lookups. Concurrent misses for the same key run
// the producer once and every waiter receives its result. Store errors are
// never cached.
use crate::errors::{StoreError, TenantError};
use crate::metrics_defs::{TENANT_CACHE_COALESCED, TENANT_CACHE_HIT, TENANT_CACHE_MISS};
use crate::types::Organization;
use moka::Expiry;
use moka::future::Cache;
use shared::counter;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct CachedLookup {
    organization: Option<Arc<Organization>>,
    ttl: Duration,
}

/// How a lookup was answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CacheOutcome {
    /// Read from a live entry.
    Hit,
    /// Ran the producer.
    Miss,
    /// Waited on a producer another caller started for the same key.
    Coalesced,
}

struct LookupExpiry;

impl Expiry<String, CachedLookup> for LookupExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedLookup,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct TenantCache {
    entries: Cache<String, CachedLookup>,
    negative_ttl: Duration,
}

impl TenantCache {
    /// `negative_ttl` applies to lookups that found no organization. A zero
    /// duration disables caching them.
    pub fn new(max_capacity: u64, negative_ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(LookupExpiry)
            .build();

        TenantCache {
            entries,
            negative_ttl,
        }
    }

    /// Returns the cached lookup for `key`, or runs `producer`, caches its
    /// result for `ttl` (or the negative TTL when it found nothing) and
    /// returns it.
    pub async fn remember<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<Option<Arc<Organization>>, TenantError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Organization>, StoreError>>,
    {
        let (organization, outcome) = self.lookup(key, ttl, producer).await?;
        match outcome {
            CacheOutcome::Hit => counter!(TENANT_CACHE_HIT).increment(1),
            CacheOutcome::Miss => counter!(TENANT_CACHE_MISS).increment(1),
            CacheOutcome::Coalesced => counter!(TENANT_CACHE_COALESCED).increment(1),
        }
        Ok(organization)
    }

    async fn lookup<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<(Option<Arc<Organization>>, CacheOutcome), TenantError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Organization>, StoreError>>,
    {
        if let Some(cached) = self.entries.get(key).await {
            return Ok((cached.organization, CacheOutcome::Hit));
        }

        let produced = AtomicBool::new(false);
        let negative_ttl = self.negative_ttl;

        let cached = self
            .entries
            .try_get_with(key.to_string(), async {
                produced.store(true, Ordering::Relaxed);
                let organization = producer().await?;
                let ttl = match organization {
                    Some(_) => ttl,
                    None => negative_ttl,
                };
                Ok::<_, StoreError>(CachedLookup {
                    organization: organization.map(Arc::new),
                    ttl,
                })
            })
            .await?;

        if !produced.load(Ordering::Relaxed) {
            return Ok((cached.organization, CacheOutcome::Coalesced));
        }

        if cached.organization.is_none() && negative_ttl.is_zero() {
            self.entries.invalidate(key).await;
        }
        Ok((cached.organization, CacheOutcome::Miss))
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}
