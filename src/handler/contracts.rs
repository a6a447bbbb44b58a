use std::sync::Arc;

use axum::{extract::Path, response::IntoResponse, routing::get, Extension, Json, Router};
use uuid::Uuid;

use crate::{dtos::ApiResponse, error::HttpError, middleware::JWTAuthMiddeware, AppState};

pub fn contracts_handler() -> Router {
    Router::new()
        .route("/", get(list_contracts))
        .route("/:contract_id", get(get_contract))
}

pub async fn list_contracts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let contracts = app_state.proposal_service.contracts(&auth.user).await?;
    Ok(Json(ApiResponse::success(contracts)))
}

pub async fn get_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(contract_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let contract = app_state
        .proposal_service
        .contract(&auth.user, contract_id)
        .await?;

    Ok(Json(ApiResponse::success(contract)))
}
