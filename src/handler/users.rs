use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::userdtos::{FilterUserDto, UpdateProfileDto, UserData, UserResponseDto},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::usermodel::User,
    service::error::ServiceError,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/:user_id", get(get_user))
}

fn user_response(user: &User) -> Json<UserResponseDto> {
    Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(user),
        },
    })
}

pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(user_response(&user.user))
}

pub async fn update_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let updated = app_state
        .db_client
        .update_user_profile(user.user.id, body.into())
        .await
        .map_err(ServiceError::from)?;

    // keep the request's session in step with the write
    let profile = match user.session.refresh_profile().await {
        Some(profile) => profile,
        None => {
            warn!("Profile refresh for {} came back empty", user.user.id);
            updated
        }
    };

    Ok(user_response(&profile))
}

/// Public profile of another user, visible to any signed-in caller.
pub async fn get_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(user_id), None)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::UserNotFound(user_id))?;

    Ok(user_response(&user))
}
