use crate::service::GatewayBody;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use shared::http::make_json_response;
use tenancy::{Organization, TenantContext};

pub const TENANT_PATH: &str = "/api/tenant";

#[derive(Serialize, Debug)]
struct TenantResponse<'a> {
    slug: Option<&'a str>,
    tenant_id: Option<&'a str>,
    tenant: Option<&'a Organization>,
}

impl<'a> From<&'a TenantContext> for TenantResponse<'a> {
    fn from(context: &'a TenantContext) -> Self {
        TenantResponse {
            slug: context.slug.as_ref().map(|s| s.as_str()),
            tenant_id: context.tenant_id.as_deref(),
            tenant: context.tenant.as_deref(),
        }
    }
}

#[derive(Serialize, Debug)]
struct ApiErrorResponse<'a> {
    error_message: &'a str,
}

pub fn error_response(status: StatusCode, message: &str) -> Response<GatewayBody> {
    make_json_response(
        status,
        &ApiErrorResponse {
            error_message: message,
        },
    )
}

/// Dispatches a request that already went through tenant resolution.
pub fn route<B>(req: &Request<B>) -> Response<GatewayBody> {
    if req.uri().path() != TENANT_PATH {
        return error_response(StatusCode::NOT_FOUND, "not found");
    }

    if *req.method() != Method::GET {
        return error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    }

    let context = req
        .extensions()
        .get::<TenantContext>()
        .cloned()
        .unwrap_or_default();

    make_json_response(StatusCode::OK, &TenantResponse::from(&context))
}
