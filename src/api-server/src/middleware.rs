//! Middleware layer for the API server
//!
//! This module provides middleware components for:
//! - Principal extraction and RBAC enforcement
//! - Request logging and tracing
//! - CORS configuration
//! - Request ID tracking

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bastion_authz::{AccessRequest, Principal};
use bastion_core::OrgId;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request ID header name
pub const X_REQUEST_ID: &str = "x-request-id";

/// Authenticated user name, set by the fronting proxy
pub const X_USER: &str = "x-user";

/// Comma-separated groups of the user
pub const X_GROUPS: &str = "x-groups";

/// Organization the request acts in; absent means the default organization
pub const X_ORG_ID: &str = "x-org-id";

/// Caller identity resolved by [`rbac_middleware`]
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    pub org_id: OrgId,
}

/// Configure CORS middleware
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static(X_REQUEST_ID),
            header::HeaderName::from_static(X_USER),
            header::HeaderName::from_static(X_GROUPS),
            header::HeaderName::from_static(X_ORG_ID),
        ])
        .expose_headers([header::HeaderName::from_static(X_REQUEST_ID)])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Request ID middleware
///
/// Reuses a valid incoming request ID or generates one, and echoes it in
/// the response headers.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    response
}

/// Request logging middleware
///
/// Logs method, URI, status and duration, at a level matching the status.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<Uuid>()
        .copied()
        .unwrap_or_else(Uuid::new_v4);

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let status = response.status().as_u16();
    let duration_ms = elapsed.as_millis() as u64;
    match status {
        500..=599 => error!(request_id = %request_id, method = %method, uri = %uri, status, duration_ms, "Request completed"),
        400..=499 => warn!(request_id = %request_id, method = %method, uri = %uri, status, duration_ms, "Request completed"),
        _ => info!(request_id = %request_id, method = %method, uri = %uri, status, duration_ms, "Request completed"),
    }

    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Reads the caller identity from the proxy headers
pub fn request_context(headers: &HeaderMap) -> Result<RequestContext, ApiError> {
    let user = header_str(headers, X_USER)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", X_USER)))?;

    let mut principal = Principal::new(user);
    if let Some(groups) = header_str(headers, X_GROUPS) {
        for group in groups.split(',').map(str::trim).filter(|g| !g.is_empty()) {
            principal = principal.with_group(group);
        }
    }

    let org_id = match header_str(headers, X_ORG_ID) {
        Some(org) if org.len() > OrgId::MAX_LEN => {
            return Err(ApiError::BadRequest(format!(
                "{} must be at most {} characters",
                X_ORG_ID,
                OrgId::MAX_LEN
            )));
        }
        Some(org) => OrgId::from(org),
        None => OrgId::default(),
    };

    Ok(RequestContext { principal, org_id })
}

/// RBAC middleware
///
/// Skips health and documentation endpoints. Everything else needs an
/// `x-user` header (401 otherwise) and a granting role (403 otherwise).
/// The resolved [`RequestContext`] is stored in the request extensions.
pub async fn rbac_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if path == "/health" || path.starts_with("/api-docs") {
        return next.run(request).await;
    }

    let request_id = request.extensions().get::<Uuid>().copied();

    let context = match request_context(request.headers()) {
        Ok(context) => context,
        Err(e) => {
            warn!(request_id = ?request_id, path = %path, error = %e, "Rejected caller headers");
            return e.into_response();
        }
    };

    let access = AccessRequest::from_http(
        context.principal.clone(),
        context.org_id.clone(),
        request.method().as_str(),
        &path,
    );
    let decision = match state.rbac.authorize(&access).await {
        Ok(decision) => decision,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if !decision.allowed {
        warn!(
            request_id = ?request_id,
            user = %context.principal.user,
            path = %path,
            reason = %decision.reason,
            "Request denied"
        );
        return ApiError::Forbidden(decision.reason).into_response();
    }

    info!(
        request_id = ?request_id,
        user = %context.principal.user,
        role = ?decision.matched_role,
        "Request authorized"
    );
    request.extensions_mut().insert(context);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_request_id_middleware() {
        let app = Router::new()
            .route("/", get(test_handler))
            .layer(middleware::from_fn(request_id_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let app = Router::new()
            .route("/", get(test_handler))
            .layer(middleware::from_fn(request_id_middleware));

        let id = Uuid::new_v4().to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(X_REQUEST_ID, &id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[X_REQUEST_ID], id.as_str());
    }

    #[tokio::test]
    async fn test_cors_layer() {
        let app = Router::new()
            .route("/", get(test_handler))
            .layer(cors_layer());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header(header::ORIGIN, "http://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_request_context() {
        let mut headers = HeaderMap::new();
        assert!(matches!(request_context(&headers), Err(ApiError::Unauthorized(_))));

        headers.insert(X_USER, HeaderValue::from_static("alice"));
        headers.insert(X_GROUPS, HeaderValue::from_static("ops, sre,,"));
        headers.insert(X_ORG_ID, HeaderValue::from_static("acme"));

        let context = request_context(&headers).unwrap();
        assert_eq!(context.principal.user, "alice");
        assert_eq!(context.principal.groups, vec!["ops", "sre"]);
        assert_eq!(context.org_id.as_str(), "acme");
    }

    #[test]
    fn test_org_id_length_is_bounded() {
        let mut headers = HeaderMap::new();
        headers.insert(X_USER, HeaderValue::from_static("alice"));

        let longest = "o".repeat(OrgId::MAX_LEN);
        headers.insert(X_ORG_ID, HeaderValue::from_str(&longest).unwrap());
        assert_eq!(request_context(&headers).unwrap().org_id.as_str(), longest);

        let too_long = "o".repeat(OrgId::MAX_LEN + 1);
        headers.insert(X_ORG_ID, HeaderValue::from_str(&too_long).unwrap());
        assert!(matches!(request_context(&headers), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_blank_user_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(X_USER, HeaderValue::from_static("  "));
        assert!(request_context(&headers).is_err());
    }
}
