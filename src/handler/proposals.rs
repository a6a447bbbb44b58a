use std::sync::Arc;

use axum::{
    extract::Path,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::{proposaldtos::DecisionDto, ApiResponse},
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn proposals_handler() -> Router {
    Router::new()
        .route(
            "/mine",
            get(list_my_proposals).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Employee])
            })),
        )
        .route("/:proposal_id", get(get_proposal))
        .route(
            "/:proposal_id/decision",
            post(decide_proposal).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Client])
            })),
        )
}

pub async fn list_my_proposals(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let proposals = app_state.proposal_service.list_mine(&auth.user).await?;
    Ok(Json(ApiResponse::success(proposals)))
}

pub async fn get_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proposal_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let proposal = app_state
        .proposal_service
        .get(&auth.user, proposal_id)
        .await?;

    Ok(Json(ApiResponse::success(proposal)))
}

/// Accept or reject. Accepting again after success returns the same contract.
pub async fn decide_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proposal_id): Path<Uuid>,
    Json(body): Json<DecisionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .proposal_service
        .decide(&auth.user, proposal_id, body.decision)
        .await?;

    Ok(Json(ApiResponse::success(outcome)))
}
