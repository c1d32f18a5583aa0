//! Metrics definitions for tenant resolution.

use shared::metrics_defs::{MetricDef, MetricType};

pub const TENANT_CACHE_HIT: MetricDef = MetricDef {
    name: "tenant_cache.hit",
    metric_type: MetricType::Counter,
    description: "Tenant lookups served from the cache, including cached misses",
};

pub const TENANT_CACHE_MISS: MetricDef = MetricDef {
    name: "tenant_cache.miss",
    metric_type: MetricType::Counter,
    description: "Tenant lookups that queried the organization store",
};

pub const TENANT_CACHE_COALESCED: MetricDef = MetricDef {
    name: "tenant_cache.coalesced",
    metric_type: MetricType::Counter,
    description: "Tenant lookups that waited on a store query started by another request",
};

pub const STORE_LOOKUP_DURATION: MetricDef = MetricDef {
    name: "organization_store.lookup.duration",
    metric_type: MetricType::Histogram,
    description: "Time to look up an organization by slug in seconds",
};

pub const STORE_LOOKUP_ERRORS: MetricDef = MetricDef {
    name: "organization_store.lookup.errors",
    metric_type: MetricType::Counter,
    description: "Organization store lookups that failed",
};

pub const TENANT_RESOLUTION: MetricDef = MetricDef {
    name: "tenant.resolution",
    metric_type: MetricType::Counter,
    description: "Requests by resolution outcome. Tagged with outcome: resolved, unknown, no_slug.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    TENANT_CACHE_HIT,
    TENANT_CACHE_MISS,
    TENANT_CACHE_COALESCED,
    STORE_LOOKUP_DURATION,
    STORE_LOOKUP_ERRORS,
    TENANT_RESOLUTION,
];
