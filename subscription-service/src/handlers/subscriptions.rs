//! Subscription CRUD, list and sum endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{ListParams, ListResponse, SumParams, SumResponse},
    models::{Subscription, SubscriptionInput},
    startup::AppState,
    utils::parse_identifier,
};

/// Path identifiers that are not valid v4 UUIDs cannot name a record.
fn path_id(raw: &str) -> Result<Uuid, AppError> {
    parse_identifier(raw)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("subscription {} not found", raw)))
}

fn json_body(
    payload: Result<Json<SubscriptionInput>, JsonRejection>,
) -> Result<SubscriptionInput, AppError> {
    payload
        .map(|Json(input)| input)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.body_text())))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let list = state
        .store
        .list(&params.filters(), params.pagination())
        .await?;
    Ok(Json(ListResponse { list }))
}

pub async fn sum_subscriptions(
    State(state): State<AppState>,
    Query(params): Query<SumParams>,
) -> Result<Json<SumResponse>, AppError> {
    let sum = state.store.sum(&params.filters()).await?;
    Ok(Json(SumResponse { sum }))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    payload: Result<Json<SubscriptionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let input = json_body(payload)?;
    let subscription = state.store.create(input).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Subscription>, AppError> {
    let id = path_id(&raw_id)?;
    Ok(Json(state.store.find_one(id).await?))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<SubscriptionInput>, JsonRejection>,
) -> Result<Json<Subscription>, AppError> {
    let id = path_id(&raw_id)?;
    let input = json_body(payload)?;
    Ok(Json(state.store.update(id, input).await?))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = path_id(&raw_id)?;
    state.store.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
