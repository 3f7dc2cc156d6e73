use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use domain::{ChatRoom, RoomId, SenderRole};

use crate::{error::ApiError, state::AppState, ws_connection::WebSocketConnection};

/// 绑定客户与聊天室的 cookie 名
pub const ROOM_COOKIE: &str = "chat_room_id";

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    rooms: usize,
    dashboards: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .route("/chat/{room_id}", get(customer_websocket))
        .route("/agent/chat/{room_id}", get(agent_websocket))
        .route("/agent/notifications", get(notifications_websocket))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(customer_session))
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{room_id}", get(get_room))
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        rooms: state.broker.room_count().await,
        dashboards: state.broker.notification_subscriber_count().await,
    })
}

/// 客户入口：cookie 指向的聊天室仍然存在则复用，否则新建
async fn customer_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let existing = match room_cookie(&headers) {
        Some(room_id) => state.broker.get_room(room_id).await.ok(),
        None => None,
    };
    let room = match existing {
        Some(room) => room,
        None => state.broker.create_room().await,
    };

    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", ROOM_COOKIE, room.id);
    ([(header::SET_COOKIE, cookie)], Json(room)).into_response()
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<ChatRoom>> {
    Json(state.broker.list_rooms().await)
}

async fn create_room(State(state): State<AppState>) -> (StatusCode, Json<ChatRoom>) {
    let room = state.broker.create_room().await;
    (StatusCode::CREATED, Json(room))
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ChatRoom>, ApiError> {
    let room_id = room_id
        .parse::<RoomId>()
        .map_err(|_| ApiError::room_not_found())?;
    let room = state.broker.get_room(room_id).await?;
    Ok(Json(room))
}

async fn customer_websocket(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        WebSocketConnection::serve_room(socket, state, room_id, SenderRole::Customer)
    })
}

async fn agent_websocket(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        WebSocketConnection::serve_room(socket, state, room_id, SenderRole::Agent)
    })
}

async fn notifications_websocket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| WebSocketConnection::serve_notifications(socket, state))
}

fn room_cookie(headers: &HeaderMap) -> Option<RoomId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(ROOM_COOKIE)?.strip_prefix('='))
        .find_map(|value| value.parse().ok())
}
