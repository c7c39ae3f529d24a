pub mod cleanup;
pub mod game_events;
pub mod games;
pub mod score_store;
pub mod session;
pub mod timer;
pub mod vocabulary;

// Re-export main components
pub use cleanup::*;
pub use game_events::*;
pub use games::{ActionError, ArcadeGame};
pub use score_store::*;
pub use session::*;
pub use timer::{GameTimer, TickSchedule, TimerTick};
pub use vocabulary::*;
