//! Endpoint catalog and health payloads.

use serde::Serialize;

use crate::api::pagination::{PAGE_PARAM, PAGE_SIZE_PARAM};
use crate::api::resources::RESOURCE_ROUTES;

pub const SERVICE_SLUG: &str = "openbanking-api-client";
pub const SERVICE_NAME: &str = "OpenBanking API Client";
pub const SERVICE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub fn health() -> HealthStatus {
    HealthStatus {
        status: "healthy",
        service: SERVICE_SLUG,
        version: SERVICE_VERSION,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointDescriptor {
    pub path: String,
    pub method: &'static str,
    pub description: String,
    pub parameters: [&'static str; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub service: &'static str,
    pub version: &'static str,
    pub base_url: String,
    pub endpoints: Vec<EndpointDescriptor>,
}

/// Builds the catalog of forwarding endpoints. Request-independent apart
/// from echoing the configured upstream base URL.
pub fn catalog(base_url: &str) -> Catalog {
    let endpoints = RESOURCE_ROUTES
        .iter()
        .map(|route| EndpointDescriptor {
            path: route.inbound_path(),
            method: "GET",
            description: route.description(),
            parameters: [PAGE_PARAM, PAGE_SIZE_PARAM],
        })
        .collect();

    Catalog {
        service: SERVICE_NAME,
        version: SERVICE_VERSION,
        base_url: base_url.to_string(),
        endpoints,
    }
}
