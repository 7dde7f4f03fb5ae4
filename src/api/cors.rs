use crate::http::request::Request;
use crate::http::response::Response;

pub const ALLOWED_METHODS: &str = "GET, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Accept";

/// Adds `Access-Control-Allow-Origin` according to `origins`, which is
/// either `*` or a comma-separated allow list.
pub fn apply(response: &mut Response, origins: &str, request: &Request) {
    let origins = origins.trim();
    if origins == "*" {
        response.set_header("Access-Control-Allow-Origin", "*");
        return;
    }

    let Some(origin) = request.header("Origin") else {
        return;
    };
    if origins.split(',').map(str::trim).any(|allowed| allowed == origin) {
        response.set_header("Access-Control-Allow-Origin", origin);
        response.set_header("Vary", "Origin");
    }
}

/// Answer to a CORS preflight on a known route.
pub fn preflight() -> Response {
    let mut response = Response::no_content();
    response.set_header("Access-Control-Allow-Methods", ALLOWED_METHODS);
    response.set_header("Access-Control-Allow-Headers", ALLOWED_HEADERS);
    response
}
