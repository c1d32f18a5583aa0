//! HTTP gateway that scopes every storefront API request to a tenant.

use crate::config::Config;
use crate::errors::GatewayError;
use crate::metrics_defs::RATE_LIMIT_WINDOWS;
use crate::rate_limit::RateLimiter;
use crate::service::GatewayService;
use shared::admin_service::AdminService;
use shared::gauge;
use shared::http::run_http_service;
use std::sync::Arc;
use tenancy::TenantResolver;

pub mod api;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod rate_limit;
pub mod service;

pub async fn run(config: Config) -> Result<(), GatewayError> {
    config.validate()?;

    let resolver = TenantResolver::from_config(&config.tenancy)?;
    let rate_limiter = config.rate_limit.as_ref().map(|rl| {
        let limiter = Arc::new(RateLimiter::new(rl));
        spawn_sweeper(limiter.clone());
        limiter
    });

    let service = GatewayService::new(resolver.clone(), rate_limiter, config.require_tenant);
    let admin_service: AdminService<_, GatewayError> =
        AdminService::new(move || resolver.is_ready());

    let gateway_task = run_http_service(&config.listener.host, config.listener.port, service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(gateway_task, admin_task)?;
    Ok(())
}

fn spawn_sweeper(limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window());
        loop {
            interval.tick().await;
            let removed = limiter.sweep();
            let tracked = limiter.tracked();
            gauge!(RATE_LIMIT_WINDOWS).set(tracked as f64);
            tracing::debug!(removed, tracked, "Swept rate limit windows");
        }
    });
}
