// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    handler::{
        auth::auth_handler, contracts::contracts_handler, conversations::conversations_handler,
        files::files_handler, jobs::jobs_handler, navigation::navigation_handler,
        pages::pages_handler, proposals::proposals_handler, users::users_handler,
    },
    middleware::{auth, page_guard},
    AppState,
};

async fn health_check(Extension(app_state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running",
        "realtime_subscribers": app_state.realtime.subscriber_count(),
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let storage_dir = app_state.env.storage_dir.clone();

    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/navigation", navigation_handler())
        .nest("/users", users_handler().layer(middleware::from_fn(auth)))
        .nest("/jobs", jobs_handler().layer(middleware::from_fn(auth)))
        .nest("/proposals", proposals_handler().layer(middleware::from_fn(auth)))
        .nest("/contracts", contracts_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/conversations",
            conversations_handler().layer(middleware::from_fn(auth)),
        )
        .nest("/files", files_handler().layer(middleware::from_fn(auth)));

    let page_routes = pages_handler().layer(middleware::from_fn(page_guard));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .merge(page_routes)
        .nest_service("/storage", ServeDir::new(storage_dir))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}
