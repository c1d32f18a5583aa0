use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("organization store request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("invalid store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("organization store returned unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("organization store unavailable after {0} attempts")]
    RetriesExceeded(u32),
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum TenantError {
    // Shared because a single failed lookup is handed to every request
    // waiting on the same slug.
    #[error("tenant lookup failed: {0}")]
    Store(#[from] Arc<StoreError>),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("organization slug {0:?} is not a normalized slug")]
    InvalidSlug(String),
    #[error("duplicate organization slug: {0}")]
    DuplicateSlug(String),
    #[error("empty organization id for slug {0}")]
    EmptyId(String),
    #[error("cache max_capacity cannot be 0")]
    ZeroCapacity,
    #[error("cache ttl_secs cannot be 0")]
    ZeroTtl,
    #[error("cache negative_ttl_secs ({0}) cannot exceed ttl_secs ({1})")]
    NegativeTtlExceedsTtl(u64, u64),
    #[error("store retries cannot exceed {max}, got {0}", max = crate::config::MAX_STORE_RETRIES)]
    TooManyRetries(u32),
}
