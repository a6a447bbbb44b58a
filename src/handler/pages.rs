use axum::{http::Uri, response::IntoResponse, routing::get, Extension, Json, Router};
use serde_json::json;

use crate::{guard::normalize_path, middleware::PageSession};

/// Routes rendered behind the page guard. Each answers with the page name
/// and the session it was rendered for.
pub fn pages_handler() -> Router {
    Router::new()
        .route("/", get(page_view))
        .route("/auth/login", get(page_view))
        .route("/auth/signup", get(page_view))
        .route("/client", get(page_view))
        .route("/client/*rest", get(page_view))
        .route("/employee", get(page_view))
        .route("/employee/*rest", get(page_view))
        .route("/messages", get(page_view))
        .route("/messages/*rest", get(page_view))
        .route("/profile", get(page_view))
}

pub async fn page_view(Extension(PageSession(session)): Extension<PageSession>, uri: Uri) -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "page": normalize_path(uri.path()),
        "session": session.snapshot(),
    }))
}
