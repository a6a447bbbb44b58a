use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::{
    error::{ErrorMessage, HttpError},
    guard::{decide, GuardDecision},
    models::usermodel::{User, UserRole},
    service::auth_service::Identity,
    session::{SessionHolder, SessionState},
    AppState,
};

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone)]
pub struct JWTAuthMiddeware {
    pub user: User,
    pub identity: Identity,
    pub session: Arc<SessionHolder>,
}

/// Session resolved for a guarded page request.
#[derive(Debug, Clone)]
pub struct PageSession(pub Arc<SessionHolder>);

/// Token from the `token` cookie, falling back to a bearer header.
pub fn extract_token(cookie_jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    cookie_jar
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer ").map(str::to_owned))
        })
}

pub fn new_session(app_state: &AppState) -> Arc<SessionHolder> {
    Arc::new(SessionHolder::new(
        app_state.auth_service.clone(),
        app_state.db_client.clone(),
    ))
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = extract_token(&cookie_jar, req.headers())
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let session = new_session(&app_state);
    let (identity, user) = match session.initialize(Some(&token)).await {
        SessionState::Authenticated {
            identity,
            profile: Some(user),
        } => (identity, user),
        SessionState::Authenticated { profile: None, .. } => {
            return Err(HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()));
        }
        _ => return Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())),
    };

    req.extensions_mut().insert(JWTAuthMiddeware {
        user,
        identity,
        session,
    });

    Ok(next.run(req).await)
}

pub async fn role_check(
    Extension(_app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddeware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&user.user.role) {
        return Err(HttpError::new(ErrorMessage::PermissionDenied.to_string(), StatusCode::FORBIDDEN));
    }

    Ok(next.run(req).await)
}

/// Resolves the visitor's session and either lets the page render or
/// answers with a `303 See Other` to where they belong.
pub async fn page_guard(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = extract_token(&cookie_jar, req.headers());
    let session = new_session(&app_state);
    let state = session.initialize(token.as_deref()).await;

    let path = req.uri().path().to_string();
    match decide(&state.guard_input(&path)) {
        GuardDecision::Redirect(to) => {
            debug!("Guard redirect {} -> {}", path, to);
            Redirect::to(&to).into_response()
        }
        // initialize always settles, so pending never reaches here
        GuardDecision::Render | GuardDecision::Pending => {
            req.extensions_mut().insert(PageSession(session));
            next.run(req).await
        }
    }
}
