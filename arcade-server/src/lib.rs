use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Reply};

use crate::advice::{AdviceError, AdvicePipeline, STREAM_ERROR_TEXT};
use crate::auth::AuthService;
use crate::play::PlayManager;
use crate::session_cookie::{SessionKeys, with_optional_user};
use crate::websocket::{ConnectionManager, PlayContext};
use arcade_core::ScoreStore;
use arcade_persistence::{AdviceRepository, ScoreRepository};
use arcade_types::{AdviceMessage, AdviceRequest, AdviceThread, ErrorBody, GameKind, User};

pub mod advice;
pub mod auth;
pub mod config;
pub mod play;
pub mod route_gate;
pub mod session_cookie;
pub mod websocket;

const DEFAULT_LEADERBOARD_LIMIT: u64 = 10;
const MAX_LEADERBOARD_LIMIT: u64 = 100;

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<u64>,
}

#[derive(Deserialize)]
struct SessionRequest {
    id_token: Option<String>,
}

#[derive(Serialize)]
struct SessionResponse {
    user: User,
    dev: bool,
}

#[derive(Serialize)]
struct ThreadResponse {
    thread: AdviceThread,
    messages: Vec<AdviceMessage>,
}

/// Everything the routes share.
#[derive(Clone)]
pub struct AppState {
    pub connection_manager: Arc<ConnectionManager>,
    pub play_manager: Arc<PlayManager>,
    pub auth_service: Arc<AuthService>,
    pub session_keys: Arc<SessionKeys>,
    pub scores: Arc<ScoreRepository>,
    pub advice: Arc<AdvicePipeline>,
    pub advice_repository: Arc<AdviceRepository>,
    /// Issue a fallback dev session when ID token verification fails.
    pub dev_session: bool,
    pub static_dir: String,
}

pub fn create_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let keys = state.session_keys.clone();

    let state_filter = warp::any().map({
        let state = state.clone();
        move || state.clone()
    });

    let play_context = PlayContext {
        connection_manager: state.connection_manager.clone(),
        play_manager: state.play_manager.clone(),
        auth_service: state.auth_service.clone(),
        session_keys: state.session_keys.clone(),
    };
    let play_context_filter = warp::any().map(move || play_context.clone());

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(with_optional_user(keys.clone()))
        .and(play_context_filter)
        .map(|ws: warp::ws::Ws, user: Option<User>, context: PlayContext| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, user, context))
        });

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let create_session = warp::path!("api" / "session")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_create_session);

    let delete_session = warp::path!("api" / "session")
        .and(warp::delete())
        .and(state_filter.clone())
        .map(|state: AppState| {
            warp::reply::with_header(
                warp::reply::json(&serde_json::json!({ "ok": true })),
                "set-cookie",
                state.session_keys.clear_cookie(),
            )
        });

    let leaderboard = warp::path!("api" / "scores" / String / "leaderboard")
        .and(warp::get())
        .and(warp::query::<LeaderboardQuery>())
        .and(state_filter.clone())
        .and_then(handle_leaderboard_request);

    let my_scores = warp::path!("api" / "scores" / "me")
        .and(warp::get())
        .and(route_gate::require_user(keys.clone()))
        .and(state_filter.clone())
        .and_then(handle_my_scores_request);

    let best_score = warp::path!("api" / "scores" / String / "best")
        .and(warp::get())
        .and(route_gate::require_user(keys.clone()))
        .and(state_filter.clone())
        .and_then(handle_best_score_request);

    let advice = warp::path!("api" / "advice")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_optional_user(keys.clone()))
        .and(state_filter.clone())
        .and_then(handle_advice_request);

    let threads = warp::path!("api" / "advice" / "threads")
        .and(warp::get())
        .and(route_gate::require_user(keys.clone()))
        .and(state_filter.clone())
        .and_then(handle_threads_request);

    let thread = warp::path!("api" / "advice" / "threads" / String)
        .and(warp::get())
        .and(route_gate::require_user(keys.clone()))
        .and(state_filter.clone())
        .and_then(handle_thread_request);

    // Gated pages share the app shell
    let index = format!("{}/index.html", state.static_dir.trim_end_matches('/'));
    let pages = warp::get()
        .and(warp::path("play").or(warp::path("profile")).unify())
        .and(route_gate::require_user(keys))
        .map(|_user: User| ())
        .untuple_one()
        .and(warp::fs::file(index));

    let static_files = warp::get()
        .and(route_gate::unprotected_path())
        .and(warp::fs::dir(state.static_dir.clone()));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "DELETE"]);

    websocket
        .or(health)
        .or(create_session)
        .or(delete_session)
        .or(leaderboard)
        .or(my_scores)
        .or(best_score)
        .or(advice)
        .or(threads)
        .or(thread)
        .or(pages)
        .or(static_files)
        .recover(route_gate::recover_gate)
        .with(cors)
        .with(warp::log("pickle_arcade"))
}

fn error_reply(status: StatusCode, message: &str) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody::new(message)), status).into_response()
}

fn parse_game(game_id: &str) -> Result<GameKind, warp::reply::Response> {
    game_id
        .parse::<GameKind>()
        .map_err(|e| error_reply(StatusCode::BAD_REQUEST, &e.to_string()))
}

async fn handle_create_session(
    request: SessionRequest,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    let verified = match request.id_token.as_deref() {
        Some(token) if !token.is_empty() => state.auth_service.validate_token(token).await,
        _ => Err(auth::AuthError::InvalidToken),
    };

    let issued = match verified {
        Ok(user) => state
            .session_keys
            .issue(&user)
            .map(|token| (user, token, false)),
        Err(e) if state.dev_session => {
            tracing::warn!("ID token rejected ({}), issuing dev session", e);
            state
                .session_keys
                .issue_dev()
                .map(|(user, token)| (user, token, true))
        }
        Err(e) => {
            tracing::warn!("ID token rejected: {}", e);
            return Ok(error_reply(StatusCode::UNAUTHORIZED, "Invalid ID token"));
        }
    };

    match issued {
        Ok((user, token, dev)) => {
            tracing::info!("Session created for {}", user.id);
            Ok(warp::reply::with_header(
                warp::reply::json(&SessionResponse { user, dev }),
                "set-cookie",
                state.session_keys.set_cookie(&token),
            )
            .into_response())
        }
        Err(e) => {
            tracing::error!("Failed to sign session: {}", e);
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session",
            ))
        }
    }
}

async fn handle_leaderboard_request(
    game_id: String,
    query: LeaderboardQuery,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    let game = match parse_game(&game_id) {
        Ok(game) => game,
        Err(reply) => return Ok(reply),
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    match state.scores.get_leaderboard(game, limit).await {
        Ok(leaderboard) => Ok(warp::reply::json(&leaderboard).into_response()),
        Err(err) => {
            tracing::error!("Failed to fetch leaderboard for {}: {}", game, err);
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch leaderboard",
            ))
        }
    }
}

async fn handle_my_scores_request(
    user: User,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.scores.scores_for_user(&user.id).await {
        Ok(scores) => Ok(warp::reply::json(&scores).into_response()),
        Err(err) => {
            tracing::error!("Failed to fetch scores for {}: {}", user.id, err);
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch scores",
            ))
        }
    }
}

async fn handle_best_score_request(
    game_id: String,
    user: User,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    let game = match parse_game(&game_id) {
        Ok(game) => game,
        Err(reply) => return Ok(reply),
    };

    match state.scores.best_for(&user.id, game).await {
        Ok(Some(record)) => Ok(warp::reply::json(&record).into_response()),
        Ok(None) => Ok(error_reply(StatusCode::NOT_FOUND, "No best score yet")),
        Err(err) => {
            tracing::error!("Failed to fetch best score for {}: {}", user.id, err);
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch best score",
            ))
        }
    }
}

fn advice_error_status(error: &AdviceError) -> StatusCode {
    match error {
        AdviceError::UnsupportedModel(_) | AdviceError::EmptyDilemma => StatusCode::BAD_REQUEST,
        AdviceError::MissingApiKey(_) => StatusCode::SERVICE_UNAVAILABLE,
        AdviceError::Provider(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn handle_advice_request(
    request: AdviceRequest,
    user: Option<User>,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    let user_id = user.as_ref().map(|u| u.id.as_str());
    let stream = match state
        .advice
        .advise(&request.dilemma, user_id, &request.model)
        .await
    {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Advice request failed: {}", e);
            let message = match &e {
                AdviceError::Provider(_) => STREAM_ERROR_TEXT.to_string(),
                other => other.to_string(),
            };
            return Ok(error_reply(advice_error_status(&e), &message));
        }
    };

    // a failure mid-answer becomes a closing note; the stream ends after it
    let body = stream.map(|item| match item {
        Ok(chunk) => Ok::<String, Infallible>(chunk),
        Err(_) => Ok(STREAM_ERROR_TEXT.to_string()),
    });

    let mut response = warp::reply::Response::new(warp::hyper::Body::wrap_stream(body));
    response.headers_mut().insert(
        warp::http::header::CONTENT_TYPE,
        warp::http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response.headers_mut().insert(
        warp::http::header::CACHE_CONTROL,
        warp::http::HeaderValue::from_static("no-cache"),
    );
    Ok(response)
}

async fn handle_threads_request(
    user: User,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    match state.advice_repository.list_threads(&user.id).await {
        Ok(threads) => Ok(warp::reply::json(&threads).into_response()),
        Err(err) => {
            tracing::error!("Failed to list threads for {}: {}", user.id, err);
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list threads",
            ))
        }
    }
}

async fn handle_thread_request(
    thread_id: String,
    user: User,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    let thread_id = match Uuid::parse_str(&thread_id) {
        Ok(id) => id,
        Err(_) => return Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid thread ID format")),
    };

    let thread = match state.advice_repository.find_thread(&user.id, thread_id).await {
        Ok(Some(thread)) => thread,
        Ok(None) => return Ok(error_reply(StatusCode::NOT_FOUND, "Thread not found")),
        Err(err) => {
            tracing::error!("Failed to load thread {}: {}", thread_id, err);
            return Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load thread",
            ));
        }
    };

    match state.advice_repository.list_messages(thread.id).await {
        Ok(messages) => Ok(warp::reply::json(&ThreadResponse { thread, messages }).into_response()),
        Err(err) => {
            tracing::error!("Failed to load messages for {}: {}", thread_id, err);
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load thread",
            ))
        }
    }
}
