//! Route definitions for the API server
//!
//! Asset endpoints live under `/api/assets/v1`. Health and documentation
//! are served without authentication.

use crate::{handlers, middleware, state::AppState};
use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Base path of the asset API
pub const ASSETS_BASE_PATH: &str = "/api/assets/v1";

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bastion Assets API",
        version = "1.0.0",
        description = "Asset inventory with node filtering, gateway selection and background tasks"
    ),
    paths(
        handlers::health_check,
        handlers::list_assets,
        handlers::create_assets,
        handlers::bulk_update,
        handlers::bulk_partial_update,
        handlers::bulk_delete,
        handlers::get_asset,
        handlers::update_asset,
        handlers::partial_update_asset,
        handlers::delete_asset,
        handlers::refresh_asset,
        handlers::asset_alive,
        handlers::asset_gateway,
        handlers::sync_assets,
    ),
    components(
        schemas(
            crate::models::HealthResponse,
            crate::models::ErrorResponse,
            crate::models::LabelDto,
            crate::models::AssetResponse,
            crate::models::AssetRequest,
            crate::models::PaginatedAssets,
            crate::models::TaskResponse,
            crate::models::GatewayResponse,
            crate::models::MessageResponse,
            crate::models::SyncResponse,
        )
    ),
    tags(
        (name = "health", description = "Health endpoints"),
        (name = "assets", description = "Asset inventory"),
        (name = "tasks", description = "Background tasks and inventory sync"),
    )
)]
pub struct ApiDoc;

fn asset_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/assets/",
            get(handlers::list_assets)
                .post(handlers::create_assets)
                .put(handlers::bulk_update)
                .patch(handlers::bulk_partial_update)
                .delete(handlers::bulk_delete),
        )
        .route("/assets/sync/", get(handlers::sync_assets))
        .route(
            "/assets/:id/",
            get(handlers::get_asset)
                .put(handlers::update_asset)
                .patch(handlers::partial_update_asset)
                .delete(handlers::delete_asset),
        )
        .route("/assets/:id/refresh/", get(handlers::refresh_asset))
        .route("/assets/:id/alive/", get(handlers::asset_alive))
        .route("/assets/:id/gateway/", get(handlers::asset_gateway))
        .route(
            "/assets-bulk/",
            get(handlers::list_assets)
                .put(handlers::bulk_update)
                .patch(handlers::bulk_partial_update)
                .delete(handlers::bulk_delete),
        )
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest(ASSETS_BASE_PATH, asset_routes())
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Executed bottom to top
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rbac_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
