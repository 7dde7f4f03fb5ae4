//! Request dispatcher
//!
//! One parameterized handler serves every forwarded resource; the resource
//! table decides which upstream path a request maps to. `handle` is the
//! error-mapping stage: whatever fails below it becomes a JSON envelope here.

use crate::api::catalog;
use crate::api::cors;
use crate::api::pagination::{PAGE_PARAM, PAGE_SIZE_PARAM, PaginationParams};
use crate::api::resources::{self, API_PREFIX, ResourceRoute};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};

/// Inbound routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Catalog,
    Resource(&'static ResourceRoute),
}

impl Route {
    pub fn resolve(path: &str) -> Option<Self> {
        match path {
            "/health" => Some(Route::Health),
            p if p.strip_prefix(API_PREFIX) == Some("/endpoints") => Some(Route::Catalog),
            p => resources::find_by_path(p).map(Route::Resource),
        }
    }
}

/// Handles one request end to end. Never fails: every error is mapped to a
/// status code and JSON body.
pub async fn handle(ctx: &AppContext, request: &Request) -> Response {
    let mut response = match dispatch(ctx, request).await {
        Ok(response) => response,
        Err(e) => {
            log_failure(request, &e);
            e.into_response()
        }
    };
    cors::apply(&mut response, &ctx.config.cors_origins, request);
    if request.method == Method::HEAD {
        // Content-Length stays that of the GET answer.
        response.body.clear();
    }
    response
}

async fn dispatch(ctx: &AppContext, request: &Request) -> Result<Response, ApiError> {
    let path = request.route_path();
    let route = Route::resolve(path).ok_or_else(|| ApiError::NotFound(path.to_string()))?;

    match request.method {
        Method::GET | Method::HEAD => {}
        Method::OPTIONS => return Ok(cors::preflight()),
        ref other => {
            return Err(ApiError::MethodNotAllowed {
                method: other.as_str().to_string(),
                path: path.to_string(),
            });
        }
    }

    match route {
        Route::Health => Ok(Response::json(StatusCode::Ok, &catalog::health())),
        Route::Catalog => Ok(Response::json(
            StatusCode::Ok,
            &catalog::catalog(&ctx.config.upstream.base_url),
        )),
        Route::Resource(resource) => forward(ctx, resource, request).await,
    }
}

/// Validates pagination, calls the upstream, and relays its JSON body.
pub async fn forward(
    ctx: &AppContext,
    resource: &ResourceRoute,
    request: &Request,
) -> Result<Response, ApiError> {
    let params = PaginationParams::validate_with(
        request.query_param(PAGE_PARAM).as_deref(),
        request.query_param(PAGE_SIZE_PARAM).as_deref(),
        &ctx.config.pagination,
    )?;

    let body = ctx.upstream.fetch(resource.upstream_path, params).await?;
    Ok(Response::json(StatusCode::Ok, &body))
}

fn log_failure(request: &Request, error: &ApiError) {
    let status = error.status().as_u16();
    match error {
        ApiError::Upstream(e) => tracing::error!(
            method = request.method.as_str(),
            path = %request.path,
            status,
            error = %e,
            "Upstream request failed"
        ),
        ApiError::Validation(e) => tracing::warn!(
            path = %request.path,
            status,
            error = %e,
            "Invalid pagination parameters"
        ),
        other => tracing::debug!(
            method = request.method.as_str(),
            path = %request.path,
            status,
            error = %other,
            "Request rejected"
        ),
    }
}
