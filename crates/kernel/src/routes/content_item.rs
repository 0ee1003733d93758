//! Content item route handlers.
//!
//! The write path (`PUT`) drives the full reserve → persist → publish
//! sequence through the coordinator. The read path (`GET`) serves the
//! public representation with freshness headers.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::paths;
use crate::presenter::{PrivateItemPresenter, PublicItemPresenter};
use crate::state::AppState;
use crate::update::UpdateOutcome;

/// Create the content item router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/content/{*base_path}",
        get(show_content_item).put(update_content_item),
    )
}

/// Read a content item.
async fn show_content_item(
    State(state): State<AppState>,
    Path(base_path): Path<String>,
) -> AppResult<Response> {
    let encoded = paths::normalize_captured(&base_path);

    let started = Instant::now();
    let item = state.store().find(&encoded).await?;
    state
        .metrics()
        .observe_store_op("show.find_by", started.elapsed().as_secs_f64());

    let Some(item) = item else {
        return Err(AppError::NotFound);
    };

    let ttl = state.default_ttl_secs();
    let expires = (Utc::now() + chrono::Duration::seconds(ttl as i64))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    Ok((
        [
            (header::CACHE_CONTROL, format!("max-age={ttl}, public")),
            (header::EXPIRES, expires),
        ],
        Json(PublicItemPresenter::new(&item, state.urls()).to_json()),
    )
        .into_response())
}

/// Create or replace a content item.
///
/// A body that cannot be decoded fails with 400 before the path registry
/// or the store is touched. The `base_path` in the URL is authoritative;
/// any `base_path` key in the body is discarded.
async fn update_content_item(
    State(state): State<AppState>,
    Path(base_path): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> AppResult<Response> {
    let Ok(Json(mut payload)) = body else {
        return Err(AppError::BadRequest(
            "request body must be valid JSON".to_string(),
        ));
    };

    if let Some(object) = payload.as_object_mut() {
        object.remove("base_path");
    }

    let encoded = paths::normalize_captured(&base_path);
    let outcome = state.coordinator().update(&encoded, &payload).await?;

    let (status, body) = match outcome {
        UpdateOutcome::Created(item) => (
            StatusCode::CREATED,
            PrivateItemPresenter::new(&item).to_json(),
        ),
        UpdateOutcome::Replaced(item) => {
            (StatusCode::OK, PrivateItemPresenter::new(&item).to_json())
        }
        UpdateOutcome::PathConflict { item, errors } => (
            StatusCode::CONFLICT,
            PrivateItemPresenter::with_errors(&item, &errors).to_json(),
        ),
        UpdateOutcome::PathInvalid { item, errors }
        | UpdateOutcome::AttributesInvalid { item, errors } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            PrivateItemPresenter::with_errors(&item, &errors).to_json(),
        ),
        UpdateOutcome::RegistryUnavailable(message) => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({ "message": message }),
        ),
    };

    Ok((status, Json(body)).into_response())
}
