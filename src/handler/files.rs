use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{filedtos::UploadFileDto, userdtos::Response, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::file_service::MAX_UPLOAD_BYTES,
    AppState,
};

pub fn files_handler() -> Router {
    Router::new()
        .route(
            "/",
            get(list_my_files)
                .post(upload_file)
                // base64 inflates by a third, plus the JSON envelope
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES / 3 * 4 + 64 * 1024)),
        )
        .route("/:file_id", delete(delete_file))
}

pub async fn upload_file(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UploadFileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let upload = app_state
        .file_service
        .upload(auth.user.id, body.into())
        .await?;

    // resume and avatar uploads rewrite the profile
    auth.session.refresh_profile().await;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(upload))))
}

pub async fn list_my_files(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let files = app_state.file_service.list_mine(auth.user.id).await?;
    Ok(Json(ApiResponse::success(files)))
}

pub async fn delete_file(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.file_service.delete(auth.user.id, file_id).await?;

    Ok(Json(Response {
        status: "success",
        message: "File deleted".to_string(),
    }))
}
