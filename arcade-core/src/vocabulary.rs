use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rand::Rng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Tier a word by length: up to 5 letters easy, 6-7 medium, 8+ hard.
    pub fn for_word(word: &str) -> Self {
        match word.chars().count() {
            0..=5 => Difficulty::Easy,
            6..=7 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    /// Tiers a level may draw from; the pool broadens as level rises.
    pub fn tiers_for_level(level: u32) -> &'static [Difficulty] {
        match level {
            0..=2 => &[Difficulty::Easy],
            3..=4 => &[Difficulty::Easy, Difficulty::Medium],
            _ => &[Difficulty::Easy, Difficulty::Medium, Difficulty::Hard],
        }
    }
}

const MIN_WORD_LENGTH: usize = 3;
const MAX_WORD_LENGTH: usize = 10;

const DEFAULT_WORDS: &str = "\
# easy
brine\ndill\njar\nsour\ncrisp\nsalt\nsnack\ntangy\nspice\ncrunch
# medium
pickle\ngherkin\nvinegar\ncucumber\nmustard\nrelish\nferment\nsavory
# hard
cornichon\nfermented\ncondiment\nsandwich\nsauerkraut\ncoriander
";

/// Word pool for the unscramble game, split into difficulty tiers.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    easy: Vec<String>,
    medium: Vec<String>,
    hard: Vec<String>,
}

impl Vocabulary {
    /// Build a vocabulary from a newline separated word list.
    /// Blank lines and `#` comments are skipped; words are uppercased.
    pub fn from_word_list(word_list: &str) -> Self {
        let mut seen = HashSet::new();
        let mut vocabulary = Self {
            easy: Vec::new(),
            medium: Vec::new(),
            hard: Vec::new(),
        };

        for word in word_list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_uppercase)
            .filter(|word| Self::is_alphabetic(word))
            .filter(|word| (MIN_WORD_LENGTH..=MAX_WORD_LENGTH).contains(&word.chars().count()))
        {
            if !seen.insert(word.clone()) {
                continue;
            }
            match Difficulty::for_word(&word) {
                Difficulty::Easy => vocabulary.easy.push(word),
                Difficulty::Medium => vocabulary.medium.push(word),
                Difficulty::Hard => vocabulary.hard.push(word),
            }
        }

        vocabulary
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading word list {}", path.display()))?;
        let vocabulary = Self::from_word_list(&contents);

        if vocabulary.len() == 0 {
            return Err(anyhow!("word list {} contains no usable words", path.display()));
        }

        tracing::info!(
            "Loaded {} words ({} easy, {} medium, {} hard) from {}",
            vocabulary.len(),
            vocabulary.easy.len(),
            vocabulary.medium.len(),
            vocabulary.hard.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    pub fn words(&self, difficulty: Difficulty) -> &[String] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    pub fn len(&self) -> usize {
        self.easy.len() + self.medium.len() + self.hard.len()
    }

    pub fn contains(&self, word: &str) -> bool {
        let word = word.trim().to_uppercase();
        self.words(Difficulty::for_word(&word)).contains(&word)
    }

    /// Pick a word from the tiers unlocked at `level`. A word list with
    /// nothing in those tiers falls back to every word it has.
    pub fn random_word<R: Rng + ?Sized>(&self, level: u32, rng: &mut R) -> Result<String> {
        let mut pool: Vec<&String> = Difficulty::tiers_for_level(level)
            .iter()
            .flat_map(|tier| self.words(*tier))
            .collect();
        if pool.is_empty() {
            pool = self.easy.iter().chain(&self.medium).chain(&self.hard).collect();
        }

        pool.choose(rng)
            .map(|word| (*word).clone())
            .ok_or_else(|| anyhow!("No words available for level {}", level))
    }

    fn is_alphabetic(word: &str) -> bool {
        word.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::from_word_list(DEFAULT_WORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_word_list_parsing() {
        let vocabulary = Vocabulary::from_word_list("jar\n# comment\n\n  brine \npickle\nPICKLE\ncornichon\nno-dash\nab");

        assert!(vocabulary.contains("jar"));
        assert!(vocabulary.contains("BRINE"));
        assert!(vocabulary.contains("pickle"));
        assert!(!vocabulary.contains("no-dash"));
        assert!(!vocabulary.contains("ab")); // too short
        assert_eq!(vocabulary.len(), 4); // duplicate PICKLE dropped
        assert_eq!(vocabulary.words(Difficulty::Medium), &["PICKLE".to_string()]);
        assert_eq!(vocabulary.words(Difficulty::Hard), &["CORNICHON".to_string()]);
    }

    #[test]
    fn test_tiers_broaden_with_level() {
        assert_eq!(Difficulty::tiers_for_level(1), &[Difficulty::Easy]);
        assert_eq!(
            Difficulty::tiers_for_level(3),
            &[Difficulty::Easy, Difficulty::Medium]
        );
        assert_eq!(Difficulty::tiers_for_level(9).len(), 3);
    }

    #[test]
    fn test_low_levels_only_draw_easy_words() {
        let vocabulary = Vocabulary::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let word = vocabulary.random_word(1, &mut rng).unwrap();
            assert_eq!(Difficulty::for_word(&word), Difficulty::Easy);
        }
    }

    #[test]
    fn test_missing_tier_falls_back() {
        let vocabulary = Vocabulary::from_word_list("cornichon");
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(vocabulary.random_word(1, &mut rng).unwrap(), "CORNICHON");
    }

    #[test]
    fn test_empty_vocabulary() {
        let vocabulary = Vocabulary::from_word_list("");
        let mut rng = StdRng::seed_from_u64(1);
        let result = vocabulary.random_word(1, &mut rng);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("No words available"));
    }
}
