//! Tenant resolution for multi-tenant storefront requests.
//!
//! A request's hostname (or its referer's, for cross-origin storefront
//! calls) is parsed into a [`TenantSlug`], which the [`TenantResolver`] looks
//! up in an [`OrganizationStore`] through a short lived cache. The outcome is
//! a [`TenantContext`] that downstream handlers use for authorization and
//! data scoping.

pub mod cache;
pub mod config;
pub mod errors;
pub mod extract;
pub mod metrics_defs;
pub mod resolver;
pub mod slug;
pub mod store;
pub mod types;

pub use errors::{StoreError, TenantError};
pub use extract::slug_from_location;
pub use resolver::TenantResolver;
pub use slug::{TenantSlug, normalize_slug, parse_tenant_slug};
pub use store::OrganizationStore;
pub use types::{Organization, TenantContext};
