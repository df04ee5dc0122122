use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use diffhub_notify::{HeartbeatAck, NotificationFanout};
use diffhub_processor::{ComparisonView, SubmitRequest, SubmitResponse};
use diffhub_types::{ComparisonRequest, ConnectionId, PushMessage, RequestId, Subscription};

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Health check handler.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let processor = state.service.processor();
    Json(json!({
        "status": if processor.is_running() { "ok" } else { "stopping" },
        "version": env!("CARGO_PKG_VERSION"),
        "queueLength": processor.queue_len(),
        "connections": state.fanout.connection_count(),
    }))
}

pub async fn submit_handler(
    State(state): State<AppState>,
    Json(body): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let response = state.service.submit(body).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn result_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ComparisonView>> {
    let id: RequestId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid request id: {id}")))?;
    Ok(Json(state.service.get_result(&id)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub requester_id: Option<String>,
}

pub async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<ComparisonRequest>>> {
    Ok(Json(state.service.list_requests(params.requester_id.as_deref())?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchParams {
    pub repository_path: PathBuf,
}

pub async fn branches_handler(
    State(state): State<AppState>,
    Query(params): Query<BranchParams>,
) -> ApiResult<Json<Value>> {
    let branches = state.service.list_branches(&params.repository_path).await?;
    Ok(Json(json!({ "branches": branches })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParams {
    pub user_id: String,
}

/// Removes the connection when the event stream is dropped.
struct ConnectionGuard {
    fanout: Arc<NotificationFanout>,
    connection_id: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        debug!(connection_id = %self.connection_id, "event stream closed");
        self.fanout.remove_connection(&self.connection_id);
    }
}

/// Open a server-sent event stream for a new connection. The first event is
/// `connected`, carrying the `connectionId` to subscribe with.
pub async fn events_handler(
    State(state): State<AppState>,
    Query(params): Query<EventParams>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if params.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("userId must not be empty".to_string()));
    }
    let (connection, messages) = state.fanout.connect(params.user_id)?;
    let guard = ConnectionGuard {
        fanout: Arc::clone(&state.fanout),
        connection_id: connection.connection_id,
    };

    let stream = ReceiverStream::new(messages).map(move |message| {
        let _guard = &guard;
        Ok(to_event(&message))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_event(message: &PushMessage) -> Event {
    let event = Event::default()
        .id(message.message_id.to_string())
        .event(message.message_type.to_string());
    match event.clone().json_data(message) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "cannot encode push message");
            event.data("{}")
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    pub user_id: String,
    pub channels: Vec<String>,
}

pub async fn subscribe_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubscribeBody>,
) -> ApiResult<Json<Subscription>> {
    let connection_id = parse_connection_id(&id)?;
    let subscription = state
        .fanout
        .subscribe(&body.user_id, connection_id, body.channels)?;
    Ok(Json(subscription))
}

pub async fn unsubscribe_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let connection_id = parse_connection_id(&id)?;
    let removed = state.fanout.unsubscribe(&connection_id);
    Ok(Json(json!({ "removed": removed })))
}

pub async fn heartbeat_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<HeartbeatAck>> {
    let connection_id = parse_connection_id(&id)?;
    Ok(Json(state.fanout.heartbeat(&connection_id)?))
}

fn parse_connection_id(id: &str) -> ApiResult<ConnectionId> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid connection id: {id}")))
}
