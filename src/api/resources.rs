//! Static table of forwarded resources.
//!
//! Each entry binds an inbound `/api/v1/<slug>` path to its upstream path.
//! The dispatcher and the endpoint catalog are both driven by this table.

/// Prefix shared by every inbound API route.
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRoute {
    /// Inbound path segment after `/api/v1/`.
    pub slug: &'static str,
    /// Path appended to the upstream base URL.
    pub upstream_path: &'static str,
    /// Human-readable subject, e.g. "personal accounts".
    pub subject: &'static str,
}

impl ResourceRoute {
    pub fn inbound_path(&self) -> String {
        format!("{API_PREFIX}/{}", self.slug)
    }

    pub fn description(&self) -> String {
        format!("Get {} data", self.subject)
    }
}

const fn route(
    slug: &'static str,
    upstream_path: &'static str,
    subject: &'static str,
) -> ResourceRoute {
    ResourceRoute {
        slug,
        upstream_path,
        subject,
    }
}

pub static RESOURCE_ROUTES: [ResourceRoute; 12] = [
    route("personal-accounts", "/personal-accounts", "personal accounts"),
    route("business-accounts", "/business-accounts", "business accounts"),
    route("personal-loans", "/personal-loans", "personal loans"),
    route("business-loans", "/business-loans", "business loans"),
    route("personal-credit-cards", "/personal-credit-cards", "personal credit cards"),
    route("business-credit-cards", "/business-credit-cards", "business credit cards"),
    route("personal-financings", "/personal-financings", "personal financings"),
    route("business-financings", "/business-financings", "business financings"),
    route(
        "personal-invoice-financings",
        "/personal-invoice-financings",
        "personal invoice financings",
    ),
    route(
        "business-invoice-financings",
        "/business-invoice-financings",
        "business invoice financings",
    ),
    route(
        "personal-unarranged-account-overdraft",
        "/personal-unarranged-account-overdraft",
        "personal unarranged account overdraft",
    ),
    route(
        "business-unarranged-account-overdraft",
        "/business-unarranged-account-overdraft",
        "business unarranged account overdraft",
    ),
];

/// Looks up a resource by its inbound slug.
pub fn find_by_slug(slug: &str) -> Option<&'static ResourceRoute> {
    RESOURCE_ROUTES.iter().find(|r| r.slug == slug)
}

/// Looks up a resource by its full inbound path, e.g. `/api/v1/personal-loans`.
pub fn find_by_path(path: &str) -> Option<&'static ResourceRoute> {
    path.strip_prefix(API_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(find_by_slug)
}
