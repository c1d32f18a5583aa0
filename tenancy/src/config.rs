use crate::errors::ValidationError;
use crate::slug::normalize_slug;
use crate::types::Organization;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Which request header determines the tenant on the server side.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HostnameSource {
    /// The request's own `Host`.
    Host,
    /// The `Referer` hostname when present and valid, otherwise `Host`.
    /// Used when storefronts call the API cross-origin.
    #[default]
    Referer,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a cached organization.
    pub ttl_secs: u64,
    /// Lifetime of a cached "no such organization" result. 0 disables
    /// negative caching.
    pub negative_ttl_secs: u64,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_secs: 300,
            negative_ttl_secs: 30,
            max_capacity: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn negative_ttl(&self) -> Duration {
        Duration::from_secs(self.negative_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_capacity == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        if self.ttl_secs == 0 {
            return Err(ValidationError::ZeroTtl);
        }
        // An unknown slug must not stay hidden longer than a known one
        if self.negative_ttl_secs > self.ttl_secs {
            return Err(ValidationError::NegativeTtlExceedsTtl(
                self.negative_ttl_secs,
                self.ttl_secs,
            ));
        }
        Ok(())
    }
}

pub const MAX_STORE_RETRIES: u32 = 10;

fn default_timeout_ms() -> u64 {
    2000
}

fn default_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// Organizations listed inline.
    Static { organizations: Vec<Organization> },
    /// Organizations served by the platform API.
    Http {
        url: Url,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        #[serde(default = "default_retries")]
        retries: u32,
        #[serde(default = "default_base_delay_ms")]
        base_delay_ms: u64,
    },
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let organizations = match self {
            StoreConfig::Static { organizations } => organizations,
            StoreConfig::Http { retries, .. } => {
                if *retries > MAX_STORE_RETRIES {
                    return Err(ValidationError::TooManyRetries(*retries));
                }
                return Ok(());
            }
        };

        let mut seen = HashSet::new();
        for org in organizations {
            let normalized = normalize_slug(&org.slug);
            if normalized.as_ref().map(|s| s.as_str()) != Some(org.slug.as_str()) {
                return Err(ValidationError::InvalidSlug(org.slug.clone()));
            }
            if org.id.is_empty() {
                return Err(ValidationError::EmptyId(org.slug.clone()));
            }
            if !seen.insert(org.slug.as_str()) {
                return Err(ValidationError::DuplicateSlug(org.slug.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub hostname_source: HostnameSource,
    #[serde(default)]
    pub cache: CacheConfig,
    pub store: StoreConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.cache.validate()?;
        self.store.validate()
    }
}
