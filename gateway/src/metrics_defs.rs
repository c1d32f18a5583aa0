use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "gateway.requests",
    metric_type: MetricType::Counter,
    description: "Requests handled by the gateway. Tagged with status.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "gateway.request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds, tenant resolution included",
};

pub const RATE_LIMITED: MetricDef = MetricDef {
    name: "gateway.rate_limited",
    metric_type: MetricType::Counter,
    description: "Requests rejected by the rate limiter",
};

pub const RATE_LIMIT_WINDOWS: MetricDef = MetricDef {
    name: "gateway.rate_limit.windows",
    metric_type: MetricType::Gauge,
    description: "Client IPs with an open rate limit window",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUESTS, REQUEST_DURATION, RATE_LIMITED, RATE_LIMIT_WINDOWS];
