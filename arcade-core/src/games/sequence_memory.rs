use arcade_types::SequenceMemorySnapshot;
use rand::Rng;

use super::ActionError;

pub const PAD_COUNT: u8 = 4;
pub const ROUND_POINTS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressResult {
    Correct,
    RoundComplete { points: u32 },
    Wrong,
}

/// Simon-style memory game: repeat a sequence that grows by one pad per round.
#[derive(Debug, Clone)]
pub struct SequenceMemory {
    sequence: Vec<u8>,
    input_position: usize,
    level: u32,
    score: u32,
    is_over: bool,
}

impl SequenceMemory {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::with_sequence(vec![rng.gen_range(0..PAD_COUNT)])
    }

    pub fn with_sequence(sequence: Vec<u8>) -> Self {
        Self {
            sequence,
            input_position: 0,
            level: 1,
            score: 0,
            is_over: false,
        }
    }

    pub fn press<R: Rng + ?Sized>(&mut self, pad: u8, rng: &mut R) -> Result<PressResult, ActionError> {
        if self.is_over {
            return Err(ActionError::GameOver);
        }
        if pad >= PAD_COUNT {
            return Err(ActionError::OutOfRange {
                index: pad as usize,
                len: PAD_COUNT as usize,
            });
        }

        if self.sequence[self.input_position] != pad {
            self.is_over = true;
            return Ok(PressResult::Wrong);
        }

        self.input_position += 1;
        if self.input_position < self.sequence.len() {
            return Ok(PressResult::Correct);
        }

        let points = self.level * ROUND_POINTS;
        self.score += points;
        self.level += 1;
        self.input_position = 0;
        self.sequence.push(rng.gen_range(0..PAD_COUNT));

        Ok(PressResult::RoundComplete { points })
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_over(&self) -> bool {
        self.is_over
    }

    pub fn snapshot(&self) -> SequenceMemorySnapshot {
        SequenceMemorySnapshot {
            sequence: self.sequence.clone(),
            input_position: self.input_position,
            is_over: self.is_over,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn replay(game: &mut SequenceMemory, rng: &mut StdRng) -> Vec<PressResult> {
        let sequence = game.sequence().to_vec();
        sequence
            .into_iter()
            .map(|pad| game.press(pad, rng).unwrap())
            .collect()
    }

    #[test]
    fn test_rounds_score_level_times_hundred() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut game = SequenceMemory::new(&mut rng);

        let first = replay(&mut game, &mut rng);
        assert_eq!(first.last(), Some(&PressResult::RoundComplete { points: 100 }));
        assert_eq!(game.sequence().len(), 2);

        let second = replay(&mut game, &mut rng);
        assert_eq!(second[0], PressResult::Correct);
        assert_eq!(second[1], PressResult::RoundComplete { points: 200 });

        replay(&mut game, &mut rng);
        assert_eq!(game.score(), 100 + 200 + 300);
        assert_eq!(game.level(), 4);
    }

    #[test]
    fn test_single_wrong_press_ends_game() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut game = SequenceMemory::with_sequence(vec![2]);

        assert_eq!(game.press(1, &mut rng).unwrap(), PressResult::Wrong);
        assert!(game.is_over());
        assert!(matches!(game.press(2, &mut rng), Err(ActionError::GameOver)));
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_pad_out_of_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut game = SequenceMemory::with_sequence(vec![0]);
        assert!(matches!(
            game.press(PAD_COUNT, &mut rng),
            Err(ActionError::OutOfRange { .. })
        ));
        assert!(!game.is_over());
    }
}
