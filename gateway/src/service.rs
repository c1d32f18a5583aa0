use crate::api::{error_response, route};
use crate::errors::GatewayError;
use crate::metrics_defs::{RATE_LIMITED, REQUEST_DURATION, REQUESTS};
use crate::rate_limit::{Decision, RateLimiter};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderName, HeaderValue, RETRY_AFTER};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::http::PeerAddr;
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tenancy::TenantResolver;

pub type GatewayBody = BoxBody<Bytes, GatewayError>;

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Quota left to a client that passed the rate limiter.
struct Quota {
    limit: u32,
    remaining: u32,
}

struct GatewayState {
    resolver: TenantResolver,
    rate_limiter: Option<Arc<RateLimiter>>,
    require_tenant: bool,
}

/// Runs every request through rate limiting and tenant resolution, then
/// hands it to the API routes with its `TenantContext` in the extensions.
#[derive(Clone)]
pub struct GatewayService {
    state: Arc<GatewayState>,
}

impl GatewayService {
    pub fn new(
        resolver: TenantResolver,
        rate_limiter: Option<Arc<RateLimiter>>,
        require_tenant: bool,
    ) -> Self {
        GatewayService {
            state: Arc::new(GatewayState {
                resolver,
                rate_limiter,
                require_tenant,
            }),
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<GatewayBody> {
        let started = Instant::now();
        let response = self.process(req).await;

        counter!(REQUESTS, "status" => response.status().as_str().to_string()).increment(1);
        histogram!(REQUEST_DURATION).record(started.elapsed().as_secs_f64());
        response
    }

    async fn process<B>(&self, req: Request<B>) -> Response<GatewayBody> {
        let quota = match self.check_rate_limit(&req) {
            Ok(quota) => quota,
            Err(response) => return response,
        };

        let mut response = self.resolve_and_route(req).await;
        if let Some(quota) = quota {
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(quota.limit));
            headers.insert(
                X_RATELIMIT_REMAINING.clone(),
                HeaderValue::from(quota.remaining),
            );
        }
        response
    }

    async fn resolve_and_route<B>(&self, mut req: Request<B>) -> Response<GatewayBody> {
        let slug = self.state.resolver.slug_for_request(&req);
        let context = match self.state.resolver.context_for(slug).await {
            Ok(context) => context,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %req.uri().path(),
                    "Tenant resolution failed"
                );
                return error_response(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "tenant lookup unavailable",
                );
            }
        };

        if self.state.require_tenant && !context.is_scoped() {
            tracing::debug!(slug = ?context.slug, "Rejecting request without tenant");
            return error_response(StatusCode::NOT_FOUND, "unknown tenant");
        }

        req.extensions_mut().insert(context);
        route(&req)
    }

    /// `Err` carries the 429 response for a client over its limit.
    fn check_rate_limit<B>(
        &self,
        req: &Request<B>,
    ) -> Result<Option<Quota>, Response<GatewayBody>> {
        let Some(limiter) = self.state.rate_limiter.as_ref() else {
            return Ok(None);
        };
        let peer = req.extensions().get::<PeerAddr>().map(|p| p.0.ip());

        let Some(ip) = limiter.client_ip(req.headers(), peer) else {
            tracing::warn!("Cannot determine client IP for rate limiting, allowing request");
            return Ok(None);
        };

        match limiter.check(ip) {
            Decision::Allowed { remaining } => Ok(Some(Quota {
                limit: limiter.max_requests(),
                remaining,
            })),
            Decision::Limited { retry_after } => {
                counter!(RATE_LIMITED).increment(1);
                tracing::info!(%ip, "Rate limit exceeded");

                let mut response =
                    error_response(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
                // Round up so clients never retry inside the window
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                let headers = response.headers_mut();
                headers.insert(RETRY_AFTER, HeaderValue::from(secs));
                headers.insert(
                    X_RATELIMIT_LIMIT.clone(),
                    HeaderValue::from(limiter.max_requests()),
                );
                headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32));
                Err(response)
            }
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<GatewayBody>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use http_body_util::BodyExt;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tenancy::cache::TenantCache;
    use tenancy::config::HostnameSource;
    use tenancy::store::{OrganizationStore, StaticStore};
    use tenancy::{Organization, StoreError, TenantSlug};

    struct FailingStore;

    #[async_trait::async_trait]
    impl OrganizationStore for FailingStore {
        async fn find_by_slug(
            &self,
            _slug: &TenantSlug,
        ) -> Result<Option<Organization>, StoreError> {
            Err(StoreError::UnexpectedStatus(500))
        }
    }

    fn resolver_with(store: Arc<dyn OrganizationStore>) -> TenantResolver {
        TenantResolver::new(
            store,
            TenantCache::new(100, Duration::from_secs(30)),
            Duration::from_secs(300),
            HostnameSource::Referer,
        )
    }

    fn resolver() -> TenantResolver {
        resolver_with(Arc::new(StaticStore::new([
            Organization::new("org_1", "acme", "Acme"),
            Organization::new("org_2", "tenanta", "Tenant A"),
        ])))
    }

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/api/tenant");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    async fn json_body(response: Response<GatewayBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_resolves_tenant_from_host() {
        let service = GatewayService::new(resolver(), None, false);
        let response = service
            .handle(request(&[("host", "acme.example.com:443")]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({
                "slug": "acme",
                "tenant_id": "org_1",
                "tenant": {"id": "org_1", "slug": "acme", "name": "Acme"},
            })
        );
    }

    #[tokio::test]
    async fn test_referer_wins_over_host() {
        let service = GatewayService::new(resolver(), None, false);
        let response = service
            .handle(request(&[
                ("host", "api.backend.com"),
                ("referer", "https://tenantA.storefront.com/cart"),
            ]))
            .await;

        let body = json_body(response).await;
        assert_eq!(body["tenant_id"], "org_2");
    }

    #[tokio::test]
    async fn test_malformed_referer_uses_host() {
        let service = GatewayService::new(resolver(), None, false);
        let response = service
            .handle(request(&[
                ("host", "acme.example.com"),
                ("referer", "::not a url::"),
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["slug"], "acme");
    }

    #[tokio::test]
    async fn test_unscoped_requests() {
        // Tenant optional: the request proceeds without scope
        let service = GatewayService::new(resolver(), None, false);
        let response = service.handle(request(&[("host", "localhost:8000")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"slug": null, "tenant_id": null, "tenant": null})
        );

        let response = service
            .handle(request(&[("host", "nobody.example.com")]))
            .await;
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"slug": "nobody", "tenant_id": null, "tenant": null})
        );

        // Tenant required
        let service = GatewayService::new(resolver(), None, true);
        let response = service
            .handle(request(&[("host", "nobody.example.com")]))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error_message"], "unknown tenant");

        let response = service.handle(request(&[("host", "localhost")])).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_store_failure() {
        let service = GatewayService::new(resolver_with(Arc::new(FailingStore)), None, false);
        let response = service
            .handle(request(&[("host", "acme.example.com")]))
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        // Requests without a slug never reach the store
        let response = service.handle(request(&[("host", "localhost")])).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_routes() {
        let service = GatewayService::new(resolver(), None, false);

        let req = Request::builder()
            .uri("/api/products")
            .header("host", "acme.example.com")
            .body(())
            .unwrap();
        assert_eq!(service.handle(req).await.status(), StatusCode::NOT_FOUND);

        let req = Request::builder()
            .method("POST")
            .uri("/api/tenant")
            .header("host", "acme.example.com")
            .body(())
            .unwrap();
        assert_eq!(
            service.handle(req).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
            max_requests: 2,
            window_secs: 60,
            trust_forwarded_headers: false,
        }));
        let service = GatewayService::new(resolver(), Some(limiter), false);

        let peer_request = |peer: &str| {
            let mut req = request(&[("host", "acme.example.com")]);
            let addr: SocketAddr = peer.parse().unwrap();
            req.extensions_mut().insert(PeerAddr(addr));
            req
        };

        for remaining in ["1", "0"] {
            let response = service.handle(peer_request("10.0.0.1:5000")).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-limit"], "2");
            assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
        }

        let response = service.handle(peer_request("10.0.0.1:5001")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        let retry_after: u64 = response.headers()[RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after > 0 && retry_after <= 60);

        // A different client is unaffected
        let response = service.handle(peer_request("10.0.0.2:5000")).await;
        assert_eq!(response.status(), StatusCode::OK);

        // Without any way to identify the client the request is let through
        let response = service.handle(request(&[("host", "acme.example.com")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_ignores_spoofed_forwarded_for() {
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
            max_requests: 2,
            window_secs: 60,
            trust_forwarded_headers: false,
        }));
        let service = GatewayService::new(resolver(), Some(limiter.clone()), false);

        let mut statuses = Vec::new();
        for i in 0..50 {
            let forwarded = format!("203.0.113.{i}");
            let mut req = request(&[
                ("host", "acme.example.com"),
                ("x-forwarded-for", forwarded.as_str()),
            ]);
            req.extensions_mut()
                .insert(PeerAddr("198.51.100.9:4000".parse().unwrap()));
            statuses.push(service.handle(req).await.status());
        }

        let limited = statuses
            .iter()
            .filter(|status| **status == StatusCode::TOO_MANY_REQUESTS)
            .count();
        assert_eq!(limited, 48);
        assert_eq!(limiter.tracked(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_behind_trusted_proxy() {
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
            max_requests: 1,
            window_secs: 60,
            trust_forwarded_headers: true,
        }));
        let service = GatewayService::new(resolver(), Some(limiter), false);

        // Every client arrives through the same proxy address
        let proxied = |client: &str| {
            let mut req = request(&[
                ("host", "acme.example.com"),
                ("x-forwarded-for", client),
            ]);
            req.extensions_mut()
                .insert(PeerAddr("10.0.0.254:4000".parse().unwrap()));
            req
        };

        assert_eq!(service.handle(proxied("203.0.113.1")).await.status(), StatusCode::OK);
        assert_eq!(service.handle(proxied("203.0.113.2")).await.status(), StatusCode::OK);
        assert_eq!(
            service.handle(proxied("203.0.113.1")).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
