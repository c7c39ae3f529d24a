use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub type UserId = String;

/// Identity resolved from a verified ID token or session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: String,
}
