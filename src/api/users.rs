/// users.* endpoints: authentication and claims resolution
use crate::{
    api::with_deadline,
    context::AppContext,
    error::StoreResult,
    store::{AuthRequest, AuthResponse, ClaimsRequest, ClaimsResponse, SearchRequest, SearchResponse},
};
use axum::{extract::State, routing::post, Json, Router};

/// users.authenticate
pub async fn authenticate(
    State(ctx): State<AppContext>,
    Json(req): Json<AuthRequest>,
) -> StoreResult<Json<AuthResponse>> {
    let resp = with_deadline(
        ctx.config.service.request_timeout,
        ctx.provider.authenticate(req),
    )
    .await?;
    Ok(Json(resp))
}

/// users.findClaims
pub async fn find_claims(
    State(ctx): State<AppContext>,
    Json(req): Json<ClaimsRequest>,
) -> StoreResult<Json<ClaimsResponse>> {
    let resp = with_deadline(
        ctx.config.service.request_timeout,
        ctx.provider.find_claims(req),
    )
    .await?;
    Ok(Json(resp))
}

/// users.searchClaims
pub async fn search_claims(
    State(ctx): State<AppContext>,
    Json(req): Json<SearchRequest>,
) -> StoreResult<Json<SearchResponse>> {
    let resp = with_deadline(
        ctx.config.service.request_timeout,
        ctx.provider.search_claims(req),
    )
    .await?;
    Ok(Json(resp))
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/xrpc/users.authenticate", post(authenticate))
        .route("/xrpc/users.findClaims", post(find_claims))
        .route("/xrpc/users.searchClaims", post(search_claims))
}
