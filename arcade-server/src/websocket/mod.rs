use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::auth::AuthService;
use crate::play::PlayManager;
use crate::session_cookie::SessionKeys;
use arcade_types::{ClientMessage, GameError, ServerMessage, User};

pub mod connection;
pub mod handlers;
pub mod rate_limiter;

use connection::ConnectionId;
pub use connection::ConnectionManager;
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

/// Services a websocket needs besides the socket itself.
#[derive(Clone)]
pub struct PlayContext {
    pub connection_manager: Arc<ConnectionManager>,
    pub play_manager: Arc<PlayManager>,
    pub auth_service: Arc<AuthService>,
    pub session_keys: Arc<SessionKeys>,
}

/// `user` comes from the session cookie on the upgrade request, if any.
pub async fn handle_connection(websocket: WebSocket, user: Option<User>, context: PlayContext) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let PlayContext {
        connection_manager,
        play_manager,
        auth_service,
        session_keys,
    } = context;

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let message_receiver = connection_manager.create_connection(connection_id).await;

    if let Some(user) = user {
        connection_manager
            .set_connection_user(connection_id, Some(user.clone()))
            .await;
        let _ = connection_manager
            .send_to_connection(connection_id, ServerMessage::AuthenticationSuccess { user })
            .await;
    }

    let message_handler = MessageHandler::new(
        connection_id,
        connection_manager.clone(),
        play_manager,
        auth_service,
        session_keys,
    );

    let incoming_handler = {
        let message_handler = message_handler.clone();
        let mut rate_limiter = RateLimiter::new();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if msg.is_close() {
                            break;
                        }
                        if let Err(e) =
                            handle_message(msg, &mut rate_limiter, &message_handler, connection_id)
                                .await
                        {
                            error!("Error handling message for {}: {}", connection_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    let outgoing_handler = async move {
        let mut receiver = message_receiver;

        while let Some(message) = receiver.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", connection_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
    message_handler.handle_disconnect().await;
    connection_manager.remove_connection(connection_id).await;
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    connection_id: ConnectionId,
) -> Result<(), String> {
    if !msg.is_text() {
        return Ok(());
    }

    if !rate_limiter.check_rate_limit() {
        warn!("Rate limit exceeded for connection {}", connection_id);
        return message_handler
            .send_error(&GameError::RateLimitExceeded.to_string())
            .await;
    }

    let text = msg.to_str().map_err(|_| "Invalid text message".to_string())?;

    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return message_handler
                .send_error(&format!("Invalid message: {}", e))
                .await;
        }
    };

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))
}
