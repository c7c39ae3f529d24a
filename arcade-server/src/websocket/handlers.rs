use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AuthService;
use crate::play::PlayManager;
use crate::session_cookie::SessionKeys;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use arcade_types::{ClientMessage, GameAction, GameError, GameKind, ServerMessage, User};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    play_manager: Arc<PlayManager>,
    auth_service: Arc<AuthService>,
    session_keys: Arc<SessionKeys>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        play_manager: Arc<PlayManager>,
        auth_service: Arc<AuthService>,
        session_keys: Arc<SessionKeys>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            play_manager,
            auth_service,
            session_keys,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        match message {
            ClientMessage::Authenticate { token } => self.handle_authenticate(token).await,
            ClientMessage::StartGame { game } => self.handle_start_game(game).await,
            ClientMessage::Action { action } => self.handle_action(action).await,
            ClientMessage::EndGame => {
                let result = self.play_manager.end_game(self.connection_id).await;
                self.report(result).await
            }
            ClientMessage::ResetGame => {
                let result = self.play_manager.reset_game(self.connection_id).await;
                self.report(result).await
            }
            ClientMessage::Heartbeat => Ok(()),
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);
        self.play_manager.disconnect(self.connection_id).await;
    }

    /// Accepts either a session token issued by this server or a raw
    /// identity-provider ID token.
    async fn handle_authenticate(&self, token: String) -> Result<(), String> {
        info!("Authenticating connection {}", self.connection_id);

        let user = match self.session_keys.verify(&token) {
            Ok(user) => Ok(user),
            Err(_) => self.auth_service.validate_token(&token).await,
        };

        match user {
            Ok(user) => {
                self.connection_manager
                    .set_connection_user(self.connection_id, Some(user.clone()))
                    .await;
                self.send_message(ServerMessage::AuthenticationSuccess { user })
                    .await
            }
            Err(e) => {
                warn!(
                    "Authentication failed for connection {}: {}",
                    self.connection_id, e
                );
                self.send_message(ServerMessage::AuthenticationFailed {
                    reason: e.to_string(),
                })
                .await
            }
        }
    }

    async fn handle_start_game(&self, game: GameKind) -> Result<(), String> {
        let connection = self
            .connection_manager
            .get_connection(self.connection_id)
            .await
            .ok_or_else(|| "Connection not found".to_string())?;
        let user: Option<User> = connection.user.clone();

        let result = self
            .play_manager
            .start_game(self.connection_id, user.as_ref(), game, connection.sender.clone())
            .await;
        self.report(result).await
    }

    async fn handle_action(&self, action: GameAction) -> Result<(), String> {
        let result = self
            .play_manager
            .apply_action(self.connection_id, action)
            .await;
        self.report(result).await
    }

    /// Game errors go back to the client; only a dead connection is fatal.
    async fn report(&self, result: Result<(), GameError>) -> Result<(), String> {
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.send_error(&e.to_string()).await,
        }
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }

    pub async fn send_error(&self, error_message: &str) -> Result<(), String> {
        self.send_message(ServerMessage::Error {
            message: error_message.to_string(),
        })
        .await
    }
}
