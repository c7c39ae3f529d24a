use std::time::Duration;

use arcade_types::{ReactionPhase, ReactionSnapshot};
use rand::Rng;

use super::ActionError;

pub const TOTAL_ROUNDS: usize = 5;
pub const MIN_WAIT_MS: u64 = 1500;
pub const MAX_WAIT_MS: u64 = 5000;
pub const TOO_EARLY_PENALTY_MS: u32 = 500;

/// (average latency ms, score) breakpoints; linear in between.
const SCORE_CURVE: [(u32, u32); 5] = [(200, 1000), (250, 800), (300, 600), (400, 300), (500, 100)];

/// Maps an average latency to a score. Never increases with latency and
/// bottoms out at 100 from 500 ms on.
pub fn score_for_average(average_ms: u32) -> u32 {
    let (first_ms, first_score) = SCORE_CURVE[0];
    if average_ms <= first_ms {
        return first_score;
    }

    for pair in SCORE_CURVE.windows(2) {
        let (lo_ms, lo_score) = pair[0];
        let (hi_ms, hi_score) = pair[1];
        if average_ms <= hi_ms {
            let span = hi_ms - lo_ms;
            let drop = (lo_score - hi_score) * (average_ms - lo_ms) / span;
            return lo_score - drop;
        }
    }

    SCORE_CURVE[SCORE_CURVE.len() - 1].1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactResult {
    Waiting,
    TooEarly { penalty_ms: u32 },
    Recorded { latency_ms: u32 },
    Finished { average_ms: u32, score: u32 },
}

/// Five rounds of wait-for-green.
#[derive(Debug, Clone)]
pub struct ReactionTime {
    phase: ReactionPhase,
    go_at: Option<Duration>,
    results: Vec<u32>,
    score: u32,
}

impl ReactionTime {
    pub fn new() -> Self {
        Self {
            phase: ReactionPhase::Ready,
            go_at: None,
            results: Vec::with_capacity(TOTAL_ROUNDS),
            score: 0,
        }
    }

    /// A single click. What it means depends on the phase: it arms the next
    /// round, records a reaction, or records a false start.
    pub fn react<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) -> Result<ReactResult, ActionError> {
        self.advance(now);

        match self.phase {
            ReactionPhase::Finished => Err(ActionError::GameOver),
            ReactionPhase::Ready | ReactionPhase::TooEarly | ReactionPhase::RoundResult => {
                let wait = rng.gen_range(MIN_WAIT_MS..=MAX_WAIT_MS);
                self.go_at = Some(now + Duration::from_millis(wait));
                self.phase = ReactionPhase::Waiting;
                Ok(ReactResult::Waiting)
            }
            ReactionPhase::Waiting => {
                self.go_at = None;
                self.phase = ReactionPhase::TooEarly;
                if let Some(finished) = self.record(TOO_EARLY_PENALTY_MS) {
                    return Ok(finished);
                }
                Ok(ReactResult::TooEarly {
                    penalty_ms: TOO_EARLY_PENALTY_MS,
                })
            }
            ReactionPhase::Go => {
                let go_at = self.go_at.take().unwrap_or(now);
                let latency_ms = now.saturating_sub(go_at).as_millis().min(u32::MAX as u128) as u32;
                self.phase = ReactionPhase::RoundResult;
                if let Some(finished) = self.record(latency_ms) {
                    return Ok(finished);
                }
                Ok(ReactResult::Recorded { latency_ms })
            }
        }
    }

    /// Flips a waiting round to "go" once its delay has passed.
    pub fn advance(&mut self, now: Duration) -> bool {
        match (self.phase, self.go_at) {
            (ReactionPhase::Waiting, Some(go_at)) if now >= go_at => {
                self.phase = ReactionPhase::Go;
                true
            }
            _ => false,
        }
    }

    fn record(&mut self, latency_ms: u32) -> Option<ReactResult> {
        self.results.push(latency_ms);
        if self.results.len() < TOTAL_ROUNDS {
            return None;
        }

        let average_ms = self.average_ms().unwrap_or(0);
        self.score = score_for_average(average_ms);
        self.phase = ReactionPhase::Finished;
        Some(ReactResult::Finished {
            average_ms,
            score: self.score,
        })
    }

    pub fn average_ms(&self) -> Option<u32> {
        if self.results.is_empty() {
            return None;
        }
        let total: u64 = self.results.iter().map(|ms| *ms as u64).sum();
        Some((total / self.results.len() as u64) as u32)
    }

    pub fn phase(&self) -> ReactionPhase {
        self.phase
    }

    pub fn results(&self) -> &[u32] {
        &self.results
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        (self.results.len() + 1).min(TOTAL_ROUNDS) as u32
    }

    pub fn is_over(&self) -> bool {
        self.phase == ReactionPhase::Finished
    }

    pub fn snapshot(&self) -> ReactionSnapshot {
        ReactionSnapshot {
            phase: self.phase,
            round: self.level(),
            total_rounds: TOTAL_ROUNDS as u32,
            results_ms: self.results.clone(),
            average_ms: self.average_ms(),
        }
    }
}

impl Default for ReactionTime {
    fn default() -> Self {
        Self::new()
    }
}
