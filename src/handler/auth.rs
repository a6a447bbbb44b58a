use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::json;
use validator::Validate;

use crate::{
    dtos::userdtos::{FilterUserDto, LoginUserDto, SignUpDto, UserData, UserLoginResponseDto, UserResponseDto},
    error::{ErrorMessage, HttpError},
    middleware::{extract_token, new_session, TOKEN_COOKIE},
    session::LANDING_ROUTE,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/session", get(current_session))
}

fn token_cookie(token: String, max_age_minutes: i64) -> Result<HeaderValue, HttpError> {
    let cookie = Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .max_age(time::Duration::minutes(max_age_minutes))
        .http_only(true)
        .build();

    cookie
        .to_string()
        .parse()
        .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<SignUpDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .auth_service
        .sign_up(&body.email, &body.password, &body.full_name, body.role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            data: UserData {
                user: FilterUserDto::filter_user(&user),
            },
        }),
    ))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let session = new_session(&app_state);
    let signed_in = session.sign_in(&body.email, &body.password).await?;
    let user = session
        .current_profile()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    let cookie = token_cookie(signed_in.token.clone(), app_state.env.jwt_maxage)?;

    let mut response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token: signed_in.token,
        expires_at: signed_in.expires_at,
        redirect_to: user.role.home_route().to_string(),
        user: FilterUserDto::filter_user(&user),
    })
    .into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

pub async fn logout(
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let token = extract_token(&cookie_jar, &headers);

    let session = new_session(&app_state);
    session.initialize(token.as_deref()).await;
    let redirect_to = session.sign_out().await?;

    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    Ok((
        cookie_jar.add(cookie),
        Json(json!({
            "status": "success",
            "redirect_to": redirect_to,
        })),
    ))
}

pub async fn refresh(
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let token = extract_token(&cookie_jar, &headers)
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let session = app_state.auth_service.refresh(&token).await?;

    let mut response = Json(json!({
        "status": "success",
        "token": session.token,
        "expires_at": session.expires_at,
    }))
    .into_response();
    response
        .headers_mut()
        .append(header::SET_COOKIE, token_cookie(session.token, app_state.env.jwt_maxage)?);
    Ok(response)
}

/// Current session state; anonymous callers get `{"state": "anonymous"}`.
pub async fn current_session(
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Extension(app_state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    let token = extract_token(&cookie_jar, &headers);
    let session = new_session(&app_state);
    let state = session.initialize(token.as_deref()).await;

    Json(json!({
        "status": "success",
        "session": state,
        "landing": LANDING_ROUTE,
    }))
}

