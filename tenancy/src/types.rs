use crate::slug::TenantSlug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An organization (tenant) record as held by the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub slug: String,
    pub name: String,
}

impl Organization {
    pub fn new<I, S, N>(id: I, slug: S, name: N) -> Self
    where
        I: Into<String>,
        S: Into<String>,
        N: Into<String>,
    {
        Organization {
            id: id.into(),
            slug: slug.into(),
            name: name.into(),
        }
    }
}

/// Tenant scope of a single request. Inserted into the request extensions
/// once resolution finishes. `slug` is set whenever the hostname yielded
/// one, `tenant` and `tenant_id` only when an organization matched it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TenantContext {
    pub slug: Option<TenantSlug>,
    pub tenant_id: Option<String>,
    pub tenant: Option<Arc<Organization>>,
}

impl TenantContext {
    pub fn new(slug: Option<TenantSlug>, tenant: Option<Arc<Organization>>) -> Self {
        TenantContext {
            slug,
            tenant_id: tenant.as_ref().map(|org| org.id.clone()),
            tenant,
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.tenant.is_some()
    }
}
