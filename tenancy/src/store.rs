//! Backing stores that own organization records. Tenant resolution only
//! ever asks them one question: which organization has this slug.

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::slug::TenantSlug;
use crate::types::Organization;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use url::Url;

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Exact, case-sensitive match on the organization slug.
    async fn find_by_slug(&self, slug: &TenantSlug) -> Result<Option<Organization>, StoreError>;

    /// Reported by the `/ready` endpoint.
    fn is_ready(&self) -> bool {
        true
    }
}

pub fn get_store(config: &StoreConfig) -> Result<Arc<dyn OrganizationStore>, StoreError> {
    let store: Arc<dyn OrganizationStore> = match config {
        StoreConfig::Static { organizations } => {
            Arc::new(StaticStore::new(organizations.iter().cloned()))
        }
        StoreConfig::Http {
            url,
            timeout_ms,
            retries,
            base_delay_ms,
        } => Arc::new(HttpStore::new(
            url.clone(),
            Duration::from_millis(*timeout_ms),
            *retries,
            Duration::from_millis(*base_delay_ms),
        )?),
    };
    Ok(store)
}

/// Organizations known up front, typically from configuration.
pub struct StaticStore {
    by_slug: HashMap<String, Organization>,
}

impl StaticStore {
    pub fn new<I>(organizations: I) -> Self
    where
        I: IntoIterator<Item = Organization>,
    {
        StaticStore {
            by_slug: organizations
                .into_iter()
                .map(|org| (org.slug.clone(), org))
                .collect(),
        }
    }
}

#[async_trait]
impl OrganizationStore for StaticStore {
    async fn find_by_slug(&self, slug: &TenantSlug) -> Result<Option<Organization>, StoreError> {
        Ok(self.by_slug.get(slug.as_str()).cloned())
    }
}

const RETRIABLE_STATUS_CODES: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,     // 429
    StatusCode::INTERNAL_SERVER_ERROR, // 500
    StatusCode::BAD_GATEWAY,           // 502
    StatusCode::SERVICE_UNAVAILABLE,   // 503
    StatusCode::GATEWAY_TIMEOUT,       // 504
];

/// Consecutive failed lookups after which the store reports not ready.
const UNHEALTHY_AFTER_FAILURES: u32 = 3;
/// Failures older than this no longer count against readiness, so a store
/// that stopped receiving traffic recovers on its own.
const FAILURE_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct Health {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

impl Health {
    fn record(&mut self, ok: bool, now: Instant) {
        if ok {
            *self = Health::default();
        } else {
            self.consecutive_failures += 1;
            self.last_failure = Some(now);
        }
    }

    fn is_ready_at(&self, now: Instant) -> bool {
        match self.last_failure {
            Some(at) if now.duration_since(at) < FAILURE_WINDOW => {
                self.consecutive_failures < UNHEALTHY_AFTER_FAILURES
            }
            _ => true,
        }
    }
}

/// Looks organizations up through the platform API at
/// `GET {base_url}/organizations/{slug}/`.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
    retries: u32,
    base_delay: Duration,
    health: Mutex<Health>,
}

impl HttpStore {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        retries: u32,
        base_delay: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        // Url::join replaces the last path segment unless the base ends with a slash
        let base_url = if base_url.path().ends_with('/') {
            base_url
        } else {
            let path = format!("{}/", base_url.path());
            let mut url = base_url;
            url.set_path(&path);
            url
        };

        Ok(HttpStore {
            client,
            base_url,
            retries,
            base_delay,
            health: Mutex::new(Health::default()),
        })
    }

    async fn fetch(&self, url: &Url) -> Result<Option<Organization>, StoreError> {
        let mut attempt = 0;

        loop {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }

            if status.is_success() {
                return Ok(Some(response.json::<Organization>().await?));
            }

            if !RETRIABLE_STATUS_CODES.contains(&status) {
                return Err(StoreError::UnexpectedStatus(status.as_u16()));
            }

            if attempt >= self.retries {
                return Err(StoreError::RetriesExceeded(attempt + 1));
            }

            let delay = self
                .base_delay
                .saturating_mul(2_u32.saturating_pow(attempt));
            tracing::warn!(%url, %status, attempt, "Retrying organization lookup");
            sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl OrganizationStore for HttpStore {
    async fn find_by_slug(&self, slug: &TenantSlug) -> Result<Option<Organization>, StoreError> {
        let url = self.base_url.join(&format!("organizations/{slug}/"))?;
        let result = self.fetch(&url).await;
        self.health.lock().record(result.is_ok(), Instant::now());
        result
    }

    fn is_ready(&self) -> bool {
        self.health.lock().is_ready_at(Instant::now())
    }
}
