use openbanking_proxy::http::request::{Method, Request, RequestBuilder};

fn get(path: &str) -> Request {
    RequestBuilder::new()
        .method(Method::GET)
        .path(path)
        .build()
        .unwrap()
}

#[test]
fn test_request_header_lookup_ignores_case() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/health")
        .header("Origin", "http://app.local")
        .build()
        .unwrap();

    assert_eq!(req.header("Origin"), Some("http://app.local"));
    assert_eq!(req.header("origin"), Some("http://app.local"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_route_path_strips_query() {
    assert_eq!(get("/api/v1/personal-loans?page=2").route_path(), "/api/v1/personal-loans");
    assert_eq!(get("/health").route_path(), "/health");
    assert_eq!(get("/health").query_string(), None);
}

#[test]
fn test_query_param_lookup() {
    let req = get("/api/v1/business-loans?page=2&page-size=50&extra=1");

    assert_eq!(req.query_param("page").as_deref(), Some("2"));
    assert_eq!(req.query_param("page-size").as_deref(), Some("50"));
    assert_eq!(req.query_param("page_size"), None);
}

#[test]
fn test_query_param_first_occurrence_wins() {
    let req = get("/api/v1/business-loans?page=3&page=9");

    assert_eq!(req.query_param("page").as_deref(), Some("3"));
}

#[test]
fn test_query_param_is_percent_decoded() {
    let req = get("/api/v1/business-loans?page=%32&page-size=+7");

    assert_eq!(req.query_param("page").as_deref(), Some("2"));
    assert_eq!(req.query_param("page-size").as_deref(), Some(" 7"));
}

#[test]
fn test_query_param_present_but_empty() {
    let req = get("/api/v1/business-loans?page=");

    assert_eq!(req.query_param("page").as_deref(), Some(""));
}

#[test]
fn test_keep_alive_defaults() {
    let http11 = get("/health");
    assert!(http11.keep_alive());

    let http10 = RequestBuilder::new()
        .method(Method::GET)
        .path("/health")
        .version("HTTP/1.0")
        .build()
        .unwrap();
    assert!(!http10.keep_alive());
}

#[test]
fn test_connection_header_overrides_keep_alive() {
    let close = RequestBuilder::new()
        .method(Method::GET)
        .path("/health")
        .header("Connection", "Close")
        .build()
        .unwrap();
    assert!(!close.keep_alive());

    let keep = RequestBuilder::new()
        .method(Method::GET)
        .path("/health")
        .version("HTTP/1.0")
        .header("connection", "keep-alive")
        .build()
        .unwrap();
    assert!(keep.keep_alive());
}

#[test]
fn test_request_content_length() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .path("/api")
        .header("Content-Length", "42")
        .build()
        .unwrap();
    assert_eq!(req.content_length(), 42);
    assert_eq!(get("/").content_length(), 0);
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
    assert_eq!(get("/").version, "HTTP/1.1");
}
