//! # Routes
//!
//! Coordinates the flow between HTTP requests and the services.

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use domains::DomainError;
use services::CommentListResponse;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::cors::dynamic_cors;
use crate::error::{ApiError, ApiResponse};
use crate::extract::Caller;
use crate::params::{CacheFlushParams, CommentGetParams, SiteDeleteParams};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = dynamic_cors(state.origins.clone(), state.metrics.clone());
    Router::new()
        .route("/api/get", post(comment_get))
        .route("/api/admin/cache-warm", post(cache_warm))
        .route("/api/admin/cache-flush", post(cache_flush))
        .route("/api/admin/site-del", post(site_delete))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn form<T>(form: Result<Form<T>, FormRejection>) -> Result<T, ApiError> {
    form.map(|Form(params)| params)
        .map_err(|rejection| DomainError::Validation(rejection.body_text()).into())
}

/// Lists the comments of a page, or a user's message center.
async fn comment_get(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Form<CommentGetParams>, FormRejection>,
) -> Result<Json<ApiResponse<CommentListResponse>>, ApiError> {
    // 1. Decode and validate
    let request = form(params)?.into_request(caller.is_admin)?;

    // 2. Assemble
    let response = state.comments.list(&request).await?;

    state.metrics.comment_listed(response.mode);
    Ok(ApiResponse::ok(response))
}

#[derive(serde::Serialize)]
struct Message {
    msg: &'static str,
}

async fn cache_warm(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ApiResponse<Message>>, ApiError> {
    let msg = state.admin.cache_warm(caller.is_admin)?;
    Ok(ApiResponse::ok(Message { msg }))
}

async fn cache_flush(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Form<CacheFlushParams>, FormRejection>,
) -> Result<Json<ApiResponse<Message>>, ApiError> {
    let params = form(params)?;
    let msg = state.admin.cache_flush(caller.is_admin, params.flush_all)?;
    Ok(ApiResponse::ok(Message { msg }))
}

async fn site_delete(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Form<SiteDeleteParams>, FormRejection>,
) -> Result<Json<ApiResponse<Option<()>>>, ApiError> {
    if !caller.is_admin {
        return Err(DomainError::AccessDenied("administrator required".into()).into());
    }
    let params = form(params)?;
    state.admin.delete_site(caller.is_admin, params.id).await?;
    Ok(ApiResponse::ok(None))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(%err, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
