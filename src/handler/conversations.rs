use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::Path,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Extension, Json, Router,
};
use futures::{stream, Stream, StreamExt};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{messagedtos::SendMessageDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::messagemodel::{ConversationKey, ConversationKind, Message},
    AppState,
};

pub fn conversations_handler() -> Router {
    Router::new()
        .route("/:kind/:id/messages", get(get_messages).post(send_message))
        .route("/:kind/:id/stream", get(stream_messages))
}

fn conversation_key(kind: &str, id: Uuid) -> Result<ConversationKey, HttpError> {
    let kind = kind
        .parse::<ConversationKind>()
        .map_err(HttpError::bad_request)?;
    Ok(ConversationKey::new(kind, id))
}

fn snapshot_event(messages: &[Message]) -> Event {
    Event::default()
        .event("snapshot")
        .json_data(messages)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, HttpError> {
    let key = conversation_key(&kind, id)?;
    let messages = app_state
        .conversation_service
        .history(&auth.user, key)
        .await?;

    Ok(Json(ApiResponse::success(messages)))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let key = conversation_key(&kind, id)?;
    let message = app_state
        .conversation_service
        .send(&auth.user, key, &body.content)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(message))))
}

/// Server-sent events: one `snapshot` with the current history, then a
/// fresh `snapshot` after every insert into the conversation. The feed
/// unsubscribes when the client goes away.
pub async fn stream_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpError> {
    let key = conversation_key(&kind, id)?;
    let feed = app_state
        .conversation_service
        .open_feed(&auth.user, key)
        .await?;

    let initial = snapshot_event(feed.messages());
    let updates = stream::unfold(feed, |mut feed| async move {
        let event = match feed.next_update().await {
            Ok(Some(messages)) => snapshot_event(messages),
            Ok(None) => return None,
            Err(e) => {
                warn!("Feed refetch failed: {}", e);
                Event::default().event("error").data(e.to_string())
            }
        };
        Some((event, feed))
    });

    let events = stream::once(async move { initial })
        .chain(updates)
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
