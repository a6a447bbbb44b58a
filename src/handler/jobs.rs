use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        jobdtos::{CreateJobDto, JobQueryDto, UpdateJobDto},
        proposaldtos::SubmitProposalDto,
        userdtos::Response,
        ApiResponse,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_job).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Client])
            })),
        )
        .route("/", get(list_open_jobs))
        .route(
            "/mine",
            get(list_my_jobs).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Client])
            })),
        )
        .route(
            "/:job_id",
            get(get_job).put(update_job).delete(delete_job),
        )
        .route(
            "/:job_id/proposals",
            post(submit_proposal).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Employee])
            })),
        )
        .route("/:job_id/proposals", get(list_job_proposals))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .create(&auth.user, body.into_new_job(auth.user.id))
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(job))))
}

pub async fn list_open_jobs(
    Query(query_params): Query<JobQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let jobs = app_state
        .job_service
        .list_open(query_params.category.as_deref(), page, limit)
        .await?;

    Ok(Json(ApiResponse::success(jobs)))
}

pub async fn list_my_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state.job_service.list_mine(&auth.user).await?;
    Ok(Json(ApiResponse::success(jobs)))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.get(job_id).await?;
    Ok(Json(ApiResponse::success(job)))
}

pub async fn update_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<UpdateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .update(&auth.user, job_id, body.into())
        .await?;

    Ok(Json(ApiResponse::success(job)))
}

pub async fn delete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.job_service.delete(&auth.user, job_id).await?;

    Ok(Json(Response {
        status: "success",
        message: "Job deleted".to_string(),
    }))
}

pub async fn submit_proposal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<SubmitProposalDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let proposal = app_state
        .proposal_service
        .submit(&auth.user, body.into_submission(job_id))
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(proposal))))
}

/// Proposals on a job, for the job's owner.
pub async fn list_job_proposals(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let proposals = app_state
        .proposal_service
        .list_for_job(&auth.user, job_id)
        .await?;

    Ok(Json(ApiResponse::success(proposals)))
}
