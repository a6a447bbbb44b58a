use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::Query,
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    guard::{decide, normalize_path, route_access, GuardDecision},
    middleware::{extract_token, new_session},
    session::{SessionHolder, SessionState},
    AppState,
};

pub fn navigation_handler() -> Router {
    Router::new()
        .route("/decide", get(decide_route))
        .route("/stream", get(stream_decisions))
}

#[derive(Debug, Deserialize)]
pub struct NavigationQuery {
    pub path: String,
}

pub async fn decide_route(
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<NavigationQuery>,
) -> impl IntoResponse {
    let token = extract_token(&cookie_jar, &headers);
    let session = new_session(&app_state);
    let state = session.initialize(token.as_deref()).await;

    Json(json!({
        "status": "success",
        "path": normalize_path(&query.path),
        "access": route_access(&query.path),
        "decision": decide(&state.guard_input(&query.path)),
    }))
}

// Stops the auth watcher once the stream is dropped.
struct WatchGuard(JoinHandle<()>);

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct DecisionStream {
    changes: watch::Receiver<SessionState>,
    path: String,
    last: Option<GuardDecision>,
    _session: Arc<SessionHolder>,
    _watch: WatchGuard,
}

fn decision_event(decision: &GuardDecision) -> Event {
    Event::default()
        .event("decision")
        .json_data(decision)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// Re-evaluates the guard for `path` whenever the caller's session changes
/// (sign-out elsewhere, token refresh) and pushes each new decision.
pub async fn stream_decisions(
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<NavigationQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let token = extract_token(&cookie_jar, &headers);
    let session = new_session(&app_state);
    let events = session.auth_events();
    session.initialize(token.as_deref()).await;

    let watcher = session.watch_auth_events(events);
    let mut changes = session.subscribe();
    let initial = decide(&changes.borrow_and_update().guard_input(&query.path));

    let state = DecisionStream {
        changes,
        path: query.path,
        last: Some(initial.clone()),
        _session: session,
        _watch: WatchGuard(watcher),
    };

    let updates = stream::unfold(state, |mut state| async move {
        loop {
            state.changes.changed().await.ok()?;
            let decision = decide(&state.changes.borrow_and_update().guard_input(&state.path));
            if state.last.as_ref() != Some(&decision) {
                state.last = Some(decision.clone());
                return Some((decision_event(&decision), state));
            }
        }
    });

    let events = stream::once(async move { decision_event(&initial) })
        .chain(updates)
        .map(Ok::<_, Infallible>);

    Sse::new(events).keep_alive(KeepAlive::default())
}
