use arcade_core::{SessionCleanup, Vocabulary};
use arcade_persistence::{AdviceRepository, ScoreRepository, connect_to_memory_database};
use arcade_server::AppState;
use arcade_server::advice::AdvicePipeline;
use arcade_server::auth::AuthService;
use arcade_server::play::PlayManager;
use arcade_server::session_cookie::SessionKeys;
use arcade_server::websocket::ConnectionManager;
use arcade_types::User;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use std::time::Duration;
use warp::test::WsClient;

/// App state over a fresh in-memory database with dev-mode auth and no
/// advice providers.
pub async fn create_test_state() -> AppState {
    let db = connect_to_memory_database()
        .await
        .expect("Failed to create test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let scores = Arc::new(ScoreRepository::new(db.clone()));
    let advice_repository = Arc::new(AdviceRepository::new(db));

    AppState {
        connection_manager: Arc::new(ConnectionManager::new()),
        play_manager: Arc::new(
            PlayManager::new(
                scores.clone(),
                Arc::new(Vocabulary::default()),
                SessionCleanup::default(),
            )
            .with_tick_interval(Duration::from_millis(10)),
        ),
        auth_service: Arc::new(AuthService::new_dev_mode()),
        session_keys: Arc::new(SessionKeys::new("test-secret", false)),
        scores,
        advice: Arc::new(AdvicePipeline::new(Some(advice_repository.clone()))),
        advice_repository,
        dev_session: false,
        static_dir: "./does-not-exist".to_string(),
    }
}

pub fn create_test_user(name: &str) -> User {
    User {
        id: name.to_lowercase(),
        email: Some(format!("{}@test.com", name.to_lowercase())),
        display_name: name.to_string(),
    }
}

pub fn session_cookie(state: &AppState, user: &User) -> String {
    let token = state.session_keys.issue(user).expect("sign session");
    format!("session={}", token)
}

pub async fn send_json(ws: &mut WsClient, message: serde_json::Value) {
    ws.send_text(message.to_string()).await;
}

pub async fn recv_json(ws: &mut WsClient) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(3), ws.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("socket closed");
    serde_json::from_str(msg.to_str().expect("text frame")).expect("valid JSON")
}

/// Skips messages until one tagged `kind` arrives and returns its body.
pub async fn recv_kind(ws: &mut WsClient, kind: &str) -> serde_json::Value {
    loop {
        let message = recv_json(ws).await;
        if let Some(body) = message.get(kind) {
            return body.clone();
        }
        if message == serde_json::Value::String(kind.to_string()) {
            return message;
        }
    }
}
