use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use arcade_core::{SessionCleanup, Vocabulary};
use arcade_persistence::{AdviceRepository, ScoreRepository, connect_and_migrate};
use arcade_server::{
    AppState, advice::AdvicePipeline, auth::AuthService, config::Config, create_routes,
    play::PlayManager, session_cookie::SessionKeys, websocket::ConnectionManager,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Pickle Arcade server...");

    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let vocabulary = match &config.words_file {
        Some(path) => match Vocabulary::from_file(path) {
            Ok(vocabulary) => {
                info!("Loaded {} words from {}", vocabulary.len(), path);
                vocabulary
            }
            Err(e) => {
                tracing::error!("Failed to load words from '{}': {}", path, e);
                tracing::error!("Unset WORDS_FILE to use the built-in word list.");
                std::process::exit(1);
            }
        },
        None => Vocabulary::default(),
    };

    // Initialize database connection and run migrations
    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };
    let scores = Arc::new(ScoreRepository::new(db.clone()));
    let advice_repository = Arc::new(AdviceRepository::new(db));

    let auth_service = if config.dev_auth_enabled() {
        info!("Starting in development authentication mode - JWT validation disabled");
        Arc::new(AuthService::new_dev_mode())
    } else {
        Arc::new(AuthService::new(config.identity_project_id.clone()))
    };

    let session_keys = Arc::new(SessionKeys::new(&config.session_secret, config.production));
    let advice = Arc::new(AdvicePipeline::from_keys(
        &config.api_keys,
        Some(advice_repository.clone()),
    ));

    let connection_manager = Arc::new(ConnectionManager::new());
    let play_manager = Arc::new(PlayManager::new(
        scores.clone(),
        Arc::new(vocabulary),
        SessionCleanup {
            max_duration: Duration::from_secs(config.session_timeout_minutes * 60),
            ..SessionCleanup::default()
        },
    ));

    let state = AppState {
        connection_manager: connection_manager.clone(),
        play_manager: play_manager.clone(),
        auth_service,
        session_keys,
        scores,
        advice,
        advice_repository,
        dev_session: config.dev_session_enabled(),
        static_dir: config.static_dir.clone(),
    };
    let routes = create_routes(state);

    // Start cleanup task
    let connection_timeout = Duration::from_secs(config.connection_timeout_seconds);
    let cleanup_connection_manager = connection_manager.clone();
    let cleanup_play_manager = play_manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;

            let dropped = cleanup_connection_manager
                .cleanup_inactive_connections(connection_timeout)
                .await;
            for connection_id in dropped {
                cleanup_play_manager.disconnect(connection_id).await;
            }

            let expired = cleanup_play_manager.cleanup_expired().await;
            if expired > 0 {
                info!("Closed {} expired game sessions", expired);
            }
        }
    });

    let ip = match config.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            tracing::error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((ip, config.port), async {
        shutdown_signal().await;
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C elsewhere).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal};

        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
                return;
            }
            _ => tracing::warn!("Failed to install signal handlers, falling back to Ctrl+C"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
        Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
    }
}
