use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bastion_assets::{
    select_gateway, Asset, AssetError, AssetJob, AssetListParams, AssetQuery, NO_GATEWAY_MSG,
};
use bastion_core::AssetId;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::{
    error::{ApiError, Result},
    middleware::RequestContext,
    models::*,
    state::AppState,
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Largest page a listing returns
pub const MAX_PAGE_SIZE: usize = 1000;

fn parse_asset_id(raw: &str) -> Result<AssetId> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("asset id must be an integer, got '{}'", raw)))
}

/// Loads an asset of the caller's organization; other organizations' assets
/// are reported as missing
async fn scoped_asset(state: &AppState, ctx: &RequestContext, id: AssetId) -> Result<Asset> {
    state
        .assets
        .get_asset(id)
        .await?
        .filter(|asset| asset.org_id == ctx.org_id)
        .ok_or_else(|| AssetError::not_found("asset", id).into())
}

async fn resolve_query(
    state: &AppState,
    ctx: &RequestContext,
    params: &AssetListParams,
) -> Result<AssetQuery> {
    Ok(params.resolve(state.assets.as_ref(), &ctx.org_id).await?)
}

async fn filtered_assets(state: &AppState, ctx: &RequestContext, query: &AssetQuery) -> Result<Vec<Asset>> {
    let assets = state.assets.list_assets(&ctx.org_id).await?;
    Ok(query.apply(assets))
}

/// Rewrites `limit` and `offset` in the request URI, keeping other parameters
fn page_link(uri: &Uri, limit: usize, offset: usize) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !pair.is_empty() && key != "limit" && key != "offset"
        })
        .map(str::to_string)
        .collect();
    pairs.push(format!("limit={}", limit));
    if offset > 0 {
        pairs.push(format!("offset={}", offset));
    }
    format!("{}?{}", uri.path(), pairs.join("&"))
}

fn paginate(assets: Vec<Asset>, uri: &Uri, limit: usize, offset: usize) -> PaginatedAssets {
    let count = assets.len();
    let end = offset.saturating_add(limit);
    let next = (end < count).then(|| page_link(uri, limit, end));
    let previous = (offset > 0).then(|| page_link(uri, limit, offset.saturating_sub(limit)));
    let results = assets
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(AssetResponse::from)
        .collect();

    PaginatedAssets {
        count,
        next,
        previous,
        results,
    }
}

/// List assets
///
/// Paginated with `limit`/`offset` when `limit` is given, a plain array
/// otherwise. Pages hold at most [`MAX_PAGE_SIZE`] assets.
#[utoipa::path(
    get,
    path = "/api/assets/v1/assets/",
    params(
        ("node_id" = Option<String>, Query, description = "Node whose subtree to list"),
        ("show_current_asset" = Option<String>, Query, description = "`1` or `true` lists direct members only"),
        ("admin_user_id" = Option<String>, Query, description = "Admin user id"),
        ("hostname" = Option<String>, Query, description = "Exact hostname"),
        ("ip" = Option<String>, Query, description = "Exact IP"),
        ("search" = Option<String>, Query, description = "Substring of hostname or IP"),
        ("ids" = Option<String>, Query, description = "Comma-separated asset ids"),
        ("label" = Option<String>, Query, description = "`name:value`"),
        ("ordering" = Option<String>, Query, description = "hostname, ip, port or cpu_cores; `-` for descending"),
        ("limit" = Option<usize>, Query, description = "Page size"),
        ("offset" = Option<usize>, Query, description = "Page start"),
    ),
    responses(
        (status = 200, description = "Matching assets", body = PaginatedAssets),
        (status = 400, description = "Malformed filter", body = ErrorResponse),
        (status = 404, description = "Node or admin user not found", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn list_assets(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<AssetListParams>,
) -> Result<Response> {
    let query = resolve_query(&state, &ctx, &params).await?;
    let assets = filtered_assets(&state, &ctx, &query).await?;
    debug!(count = assets.len(), org = %ctx.org_id, "Listed assets");

    match params.limit.filter(|limit| *limit > 0) {
        Some(limit) => {
            let limit = limit.min(MAX_PAGE_SIZE);
            let page = paginate(assets, &uri, limit, params.offset.unwrap_or(0));
            Ok(Json(page).into_response())
        }
        None => {
            let results: Vec<AssetResponse> = assets.into_iter().map(AssetResponse::from).collect();
            Ok(Json(results).into_response())
        }
    }
}

/// Create one asset or many
#[utoipa::path(
    post,
    path = "/api/assets/v1/assets/",
    request_body(content = AssetRequest, description = "An asset or an array of assets"),
    responses(
        (status = 201, description = "Created asset, or array of created assets", body = AssetResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 409, description = "Hostname already taken", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn create_assets(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<OneOrMany<AssetRequest>>,
) -> Result<Response> {
    let created_by = ctx.principal.user.clone();

    let response = match body {
        OneOrMany::One(req) => {
            let asset = req.into_asset(&ctx.org_id, &created_by)?;
            let created = state.assets.create_asset(asset).await?;
            info!(id = created.id, hostname = %created.hostname, "Asset created");
            Json(AssetResponse::from(created)).into_response()
        }
        OneOrMany::Many(reqs) => {
            let assets = reqs
                .into_iter()
                .map(|req| req.into_asset(&ctx.org_id, &created_by))
                .collect::<Result<Vec<_>>>()?;

            let created: Vec<AssetResponse> = state
                .assets
                .create_assets(assets)
                .await?
                .into_iter()
                .map(AssetResponse::from)
                .collect();
            info!(count = created.len(), "Assets created");
            Json(created).into_response()
        }
    };

    Ok((StatusCode::CREATED, response).into_response())
}

async fn bulk_apply(
    state: &AppState,
    ctx: &RequestContext,
    params: &AssetListParams,
    reqs: Vec<AssetRequest>,
    partial: bool,
) -> Result<Vec<AssetResponse>> {
    let query = resolve_query(state, ctx, params).await?;
    let mut targets: HashMap<AssetId, Asset> = filtered_assets(state, ctx, &query)
        .await?
        .into_iter()
        .map(|asset| (asset.id, asset))
        .collect();

    let mut staged = Vec::with_capacity(reqs.len());
    for req in reqs {
        let id = req
            .id
            .ok_or_else(|| ApiError::BadRequest("every item of a bulk update needs an id".to_string()))?;
        let mut asset = targets
            .remove(&id)
            .ok_or_else(|| ApiError::BadRequest(format!("asset {} is not in the selected set", id)))?;
        req.apply(&mut asset, partial)?;
        staged.push(asset);
    }

    let updated: Vec<AssetResponse> = state
        .assets
        .update_assets(staged)
        .await?
        .into_iter()
        .map(AssetResponse::from)
        .collect();
    info!(count = updated.len(), partial, "Bulk update applied");
    Ok(updated)
}

/// Replace several assets
///
/// Every item needs an `id` within the set selected by the query filters.
#[utoipa::path(
    put,
    path = "/api/assets/v1/assets/",
    request_body = Vec<AssetRequest>,
    responses(
        (status = 200, description = "Updated assets", body = Vec<AssetResponse>),
        (status = 400, description = "Missing id or id outside the selected set", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn bulk_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<AssetListParams>,
    Json(reqs): Json<Vec<AssetRequest>>,
) -> Result<Json<Vec<AssetResponse>>> {
    Ok(Json(bulk_apply(&state, &ctx, &params, reqs, false).await?))
}

/// Partially update several assets
#[utoipa::path(
    patch,
    path = "/api/assets/v1/assets/",
    request_body = Vec<AssetRequest>,
    responses(
        (status = 200, description = "Updated assets", body = Vec<AssetResponse>),
        (status = 400, description = "Missing id or id outside the selected set", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn bulk_partial_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<AssetListParams>,
    Json(reqs): Json<Vec<AssetRequest>>,
) -> Result<Json<Vec<AssetResponse>>> {
    Ok(Json(bulk_apply(&state, &ctx, &params, reqs, true).await?))
}

/// Delete the filtered set of assets
///
/// Refuses to run without at least one filter.
#[utoipa::path(
    delete,
    path = "/api/assets/v1/assets/",
    responses(
        (status = 204, description = "Assets deleted"),
        (status = 400, description = "No filter given", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn bulk_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<AssetListParams>,
) -> Result<StatusCode> {
    let query = resolve_query(&state, &ctx, &params).await?;
    if !query.is_filtered() {
        return Err(ApiError::BadRequest(
            "bulk delete needs at least one filter".to_string(),
        ));
    }

    let ids: BTreeSet<AssetId> = filtered_assets(&state, &ctx, &query)
        .await?
        .into_iter()
        .map(|asset| asset.id)
        .collect();
    for id in &ids {
        state.assets.delete_asset(*id).await?;
    }

    info!(count = ids.len(), user = %ctx.principal.user, "Bulk delete");
    Ok(StatusCode::NO_CONTENT)
}

/// Get an asset
#[utoipa::path(
    get,
    path = "/api/assets/v1/assets/{id}/",
    params(("id" = u64, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset details", body = AssetResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn get_asset(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<AssetResponse>> {
    let asset = scoped_asset(&state, &ctx, parse_asset_id(&id)?).await?;
    Ok(Json(asset.into()))
}

async fn write_asset(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
    req: AssetRequest,
    partial: bool,
) -> Result<Json<AssetResponse>> {
    let mut asset = scoped_asset(state, ctx, parse_asset_id(id)?).await?;
    req.apply(&mut asset, partial)?;
    let updated = state.assets.update_asset(asset).await?;
    Ok(Json(updated.into()))
}

/// Replace an asset
#[utoipa::path(
    put,
    path = "/api/assets/v1/assets/{id}/",
    params(("id" = u64, Path, description = "Asset ID")),
    request_body = AssetRequest,
    responses(
        (status = 200, description = "Updated asset", body = AssetResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn update_asset(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(req): Json<AssetRequest>,
) -> Result<Json<AssetResponse>> {
    write_asset(&state, &ctx, &id, req, false).await
}

/// Partially update an asset
#[utoipa::path(
    patch,
    path = "/api/assets/v1/assets/{id}/",
    params(("id" = u64, Path, description = "Asset ID")),
    request_body = AssetRequest,
    responses(
        (status = 200, description = "Updated asset", body = AssetResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn partial_update_asset(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(req): Json<AssetRequest>,
) -> Result<Json<AssetResponse>> {
    write_asset(&state, &ctx, &id, req, true).await
}

/// Delete an asset
#[utoipa::path(
    delete,
    path = "/api/assets/v1/assets/{id}/",
    params(("id" = u64, Path, description = "Asset ID")),
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    tag = "assets"
)]
pub async fn delete_asset(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let asset = scoped_asset(&state, &ctx, parse_asset_id(&id)?).await?;
    state.assets.delete_asset(asset.id).await?;
    info!(id = asset.id, user = %ctx.principal.user, "Asset deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn dispatch(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
    job: fn(AssetId) -> AssetJob,
) -> Result<Json<TaskResponse>> {
    let asset = scoped_asset(state, ctx, parse_asset_id(id)?).await?;
    let handle = state.dispatcher.dispatch(job(asset.id))?;
    Ok(Json(TaskResponse {
        task: handle.id().to_string(),
    }))
}

/// Refresh hardware facts of an asset in the background
#[utoipa::path(
    get,
    path = "/api/assets/v1/assets/{id}/refresh/",
    params(("id" = u64, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Task dispatched", body = TaskResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn refresh_asset(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>> {
    dispatch(&state, &ctx, &id, |asset_id| AssetJob::RefreshHardware { asset_id }).await
}

/// Test connectivity of an asset in the background
#[utoipa::path(
    get,
    path = "/api/assets/v1/assets/{id}/alive/",
    params(("id" = u64, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Task dispatched", body = TaskResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn asset_alive(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>> {
    dispatch(&state, &ctx, &id, |asset_id| AssetJob::TestConnectivity { asset_id }).await
}

/// Pick a gateway for an asset
#[utoipa::path(
    get,
    path = "/api/assets/v1/assets/{id}/gateway/",
    params(("id" = u64, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Gateway with credentials", body = GatewayResponse),
        (status = 404, description = "Asset unknown or no gateway", body = MessageResponse)
    ),
    tag = "assets"
)]
pub async fn asset_gateway(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    let asset = scoped_asset(&state, &ctx, parse_asset_id(&id)?).await?;
    let domain = match asset.domain {
        Some(domain_id) => state
            .assets
            .get_domain(domain_id)
            .await?
            .filter(|domain| domain.org_id == asset.org_id),
        None => None,
    };

    let gateway = {
        let mut rng = state.rng.lock().await;
        select_gateway(&asset, domain.as_ref(), &mut *rng)
    };

    Ok(match gateway {
        Some(gateway) => Json(GatewayResponse::from(gateway)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse {
                msg: NO_GATEWAY_MSG.to_string(),
            }),
        )
            .into_response(),
    })
}

/// Trigger the inventory sync on the remote task API
///
/// Always answers 200; failures are reported in the body.
#[utoipa::path(
    get,
    path = "/api/assets/v1/assets/sync/",
    responses(
        (status = 200, description = "Sync outcome", body = SyncResponse)
    ),
    tag = "tasks"
)]
pub async fn sync_assets(State(state): State<AppState>) -> Json<Value> {
    Json(state.task_api.sync().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(n: u64) -> Vec<Asset> {
        (1..=n)
            .map(|id| Asset::new(id, format!("host-{}", id), format!("10.0.0.{}", id)))
            .collect()
    }

    #[test]
    fn test_page_link_keeps_filters() {
        let uri: Uri = "/api/assets/v1/assets/?search=web&limit=2&offset=4".parse().unwrap();
        assert_eq!(
            page_link(&uri, 2, 6),
            "/api/assets/v1/assets/?search=web&limit=2&offset=6"
        );
        assert_eq!(page_link(&uri, 2, 0), "/api/assets/v1/assets/?search=web&limit=2");
    }

    #[test]
    fn test_paginate() {
        let uri: Uri = "/a/?limit=2".parse().unwrap();

        let first = paginate(assets(5), &uri, 2, 0);
        assert_eq!(first.count, 5);
        assert_eq!(first.results.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(first.next.as_deref(), Some("/a/?limit=2&offset=2"));
        assert!(first.previous.is_none());

        let last = paginate(assets(5), &uri, 2, 4);
        assert_eq!(last.results.len(), 1);
        assert!(last.next.is_none());
        assert_eq!(last.previous.as_deref(), Some("/a/?limit=2&offset=2"));
    }

    #[test]
    fn test_paginate_huge_offset_and_limit() {
        let uri: Uri = "/a/".parse().unwrap();

        let page = paginate(assets(3), &uri, usize::MAX, 1);
        assert_eq!(page.count, 3);
        assert_eq!(page.results.len(), 2);
        assert!(page.next.is_none());

        let page = paginate(assets(3), &uri, 2, usize::MAX);
        assert!(page.results.is_empty());
        assert!(page.next.is_none());
        assert!(page.previous.is_some());
    }

    #[test]
    fn test_parse_asset_id() {
        assert_eq!(parse_asset_id("42").unwrap(), 42);
        assert!(matches!(parse_asset_id("abc"), Err(ApiError::BadRequest(_))));
    }
}
