use arcade_types::{GameKind, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    GameStarted {
        game: GameKind,
        user_id: Option<UserId>,
    },
    LevelChanged {
        game: GameKind,
        level: u32,
    },
    GameEnded {
        game: GameKind,
        user_id: Option<UserId>,
        score: u32,
    },
    GameReset {
        game: GameKind,
    },
}

impl SessionEvent {
    pub fn game(&self) -> GameKind {
        match self {
            SessionEvent::GameStarted { game, .. } => *game,
            SessionEvent::LevelChanged { game, .. } => *game,
            SessionEvent::GameEnded { game, .. } => *game,
            SessionEvent::GameReset { game } => *game,
        }
    }
}

/// Event handler trait for processing session events
pub trait SessionEventHandler: Send {
    fn handle_event(&mut self, event: SessionEvent);
}

/// Simple event bus for distributing session events
pub struct SessionEventBus {
    handlers: Vec<Box<dyn SessionEventHandler>>,
}

impl SessionEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn SessionEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: SessionEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(event.clone());
        }
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every session event through `tracing`.
pub struct TracingEventHandler;

impl SessionEventHandler for TracingEventHandler {
    fn handle_event(&mut self, event: SessionEvent) {
        match &event {
            SessionEvent::GameEnded { game, score, .. } => {
                tracing::info!("Session for {} ended with score {}", game, score)
            }
            other => tracing::debug!("Session event: {:?}", other),
        }
    }
}
