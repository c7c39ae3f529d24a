pub mod advice;
pub mod errors;
pub mod game;
pub mod messages;
pub mod score;
pub mod snapshots;
pub mod user;

// Re-export all types
pub use advice::*;
pub use errors::*;
pub use game::*;
pub use messages::*;
pub use score::*;
pub use snapshots::*;
pub use user::*;
