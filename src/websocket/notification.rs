use crate::error::AppError;
use crate::handlers::notification::NotificationResponse;
use crate::store::NotificationStore;
use crate::utils::jwt::decode_jwt;
use crate::websocket::hub::NotificationHub;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// `GET /ws?token=…` — authenticated notification stream. The token is
/// checked before the upgrade, so a bad credential is rejected with 401
/// instead of a half-open socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
) -> Result<impl IntoResponse, AppError> {
    let claims = decode_jwt(&query.token).map_err(|_| AppError::Unauthorized)?;
    let user_id: i32 = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, db, hub)))
}

async fn handle_socket(
    socket: WebSocket,
    user_id: i32,
    db: DatabaseConnection,
    hub: NotificationHub,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (conn_id, mut rx) = hub.subscribe(user_id);

    tracing::info!("WebSocket connected for user {} (conn {})", user_id, conn_id);

    // Replay the durable unread set before any live frames, type-tagged so
    // clients can tell the snapshot from real-time pushes. A store failure
    // here degrades to an empty snapshot; the REST surface still has the data.
    let store = NotificationStore::new(db);
    let unread = match store.unread_for_user(user_id).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("Failed to load unread snapshot for user {}: {}", user_id, e);
            Vec::new()
        }
    };
    let snapshot: Vec<NotificationResponse> =
        unread.into_iter().map(NotificationResponse::from).collect();
    let initial = serde_json::json!({
        "type": "initial_batch",
        "data": snapshot,
    });
    if ws_sender
        .send(Message::Text(initial.to_string().into()))
        .await
        .is_err()
    {
        hub.unsubscribe(user_id, conn_id);
        return;
    }

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    // Unconditional: runs whether the socket closed cleanly or died mid-write.
    hub.unsubscribe(user_id, conn_id);
    tracing::info!(
        "WebSocket disconnected for user {} (conn {})",
        user_id,
        conn_id
    );
}
