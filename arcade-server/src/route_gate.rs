use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use warp::Filter;
use warp::path::FullPath;
use warp::http::StatusCode;

use arcade_types::{ErrorBody, User};

use crate::session_cookie::{SessionKeys, with_optional_user};

/// Path prefixes that require a signed-in user.
pub const PROTECTED_PREFIXES: [&str; 4] = [
    "/api/scores/me",
    "/api/advice/threads",
    "/play",
    "/profile",
];

/// Everything but RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// API callers get a 401 body.
    Unauthorized,
    /// Page callers are sent home with the original path to come back to.
    Redirect(String),
}

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

pub fn check(path: &str, query: Option<&str>, user: Option<&User>) -> GateDecision {
    if user.is_some() || !is_protected(path) {
        return GateDecision::Allow;
    }

    if path.starts_with("/api/") {
        return GateDecision::Unauthorized;
    }

    let original = match query.filter(|q| !q.is_empty()) {
        Some(q) => format!("{}?{}", path, q),
        None => path.to_string(),
    };
    GateDecision::Redirect(format!("/?redirect={}", encode_component(&original)))
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// The path as the file server resolves it: decoded, without empty or `.`
/// segments, lowercased for case-insensitive filesystems.
pub fn normalize_path(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let segments: Vec<&str> = decoded
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    format!("/{}", segments.join("/")).to_lowercase()
}

/// Rejects with 404 when a request would reach protected content under
/// another spelling, so static files cannot bypass [`require_user`].
pub fn unprotected_path() -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::path::full()
        .and_then(|path: FullPath| async move {
            if is_protected(&normalize_path(path.as_str())) {
                tracing::debug!("Refused static file for protected path {}", path.as_str());
                Err(warp::reject::not_found())
            } else {
                Ok(())
            }
        })
        .untuple_one()
}

#[derive(Debug)]
pub struct GateRejection(pub GateDecision);

impl warp::reject::Reject for GateRejection {}

/// Requires a session for protected paths and yields the caller.
pub fn require_user(
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (User,), Error = warp::Rejection> + Clone {
    warp::path::full()
        .and(warp::query::raw().or(warp::any().map(String::new)).unify())
        .and(with_optional_user(keys))
        .and_then(
            |path: FullPath, query: String, user: Option<User>| async move {
                match (check(path.as_str(), Some(&query), user.as_ref()), user) {
                    (GateDecision::Allow, Some(user)) => Ok(user),
                    (GateDecision::Allow, None) => Err(warp::reject::custom(GateRejection(
                        GateDecision::Unauthorized,
                    ))),
                    (decision, _) => {
                        tracing::debug!("Route gate blocked {}", path.as_str());
                        Err(warp::reject::custom(GateRejection(decision)))
                    }
                }
            },
        )
}

/// Turns gate rejections into their replies; anything else passes through.
pub async fn recover_gate(
    rejection: warp::Rejection,
) -> Result<Box<dyn warp::Reply>, warp::Rejection> {
    let Some(GateRejection(decision)) = rejection.find::<GateRejection>() else {
        return Err(rejection);
    };

    match decision {
        GateDecision::Redirect(location) => Ok(Box::new(warp::reply::with_header(
            StatusCode::SEE_OTHER,
            "location",
            location.as_str(),
        ))),
        _ => Ok(Box::new(warp::reply::with_status(
            warp::reply::json(&ErrorBody::new("Authentication required")),
            StatusCode::UNAUTHORIZED,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "uid".to_string(),
            email: None,
            display_name: "Dill".to_string(),
        }
    }

    #[test]
    fn test_protected_prefixes() {
        assert!(is_protected("/play"));
        assert!(is_protected("/play/pickle-pop"));
        assert!(is_protected("/api/advice/threads/123"));
        assert!(!is_protected("/playground"));
        assert!(!is_protected("/api/scores/pickle-pop/leaderboard"));
        assert!(!is_protected("/"));
    }

    #[test]
    fn test_signed_in_user_passes() {
        assert_eq!(check("/profile", None, Some(&user())), GateDecision::Allow);
    }

    #[test]
    fn test_api_paths_get_unauthorized() {
        assert_eq!(
            check("/api/scores/me", None, None),
            GateDecision::Unauthorized
        );
    }

    #[test]
    fn test_pages_redirect_with_original_path() {
        assert_eq!(
            check("/play/word-scramble", None, None),
            GateDecision::Redirect("/?redirect=%2Fplay%2Fword-scramble".to_string())
        );
        assert_eq!(
            check("/profile", Some("tab=scores"), None),
            GateDecision::Redirect("/?redirect=%2Fprofile%3Ftab%3Dscores".to_string())
        );
    }

    #[test]
    fn test_redirect_encodes_non_ascii_as_utf8() {
        assert_eq!(
            check("/play/gürkchen", None, None),
            GateDecision::Redirect("/?redirect=%2Fplay%2Fg%C3%BCrkchen".to_string())
        );
    }

    #[test]
    fn test_normalize_path_matches_file_server_resolution() {
        assert_eq!(normalize_path("/play%2Findex.html"), "/play/index.html");
        assert_eq!(normalize_path("/./play//index.html"), "/play/index.html");
        assert_eq!(normalize_path("/PLAY/"), "/play");
        assert_eq!(normalize_path("/"), "/");
        assert!(is_protected(&normalize_path("/%70rofile")));
        assert!(!is_protected(&normalize_path("/logo.txt")));
    }

    #[test]
    fn test_open_paths_allowed_without_user() {
        assert_eq!(check("/health", None, None), GateDecision::Allow);
    }
}
