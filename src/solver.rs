use crate::bonus::BonusAlphabet;
use crate::dictionary::Dictionary;
use crate::logging::Logger;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::str::FromStr;

/// How many candidates the random strategy draws from.
pub const DEFAULT_RANDOM_POOL: usize = 50;

/// Word selection policy. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    Random,
    Longest,
    Shortest,
    /// Prefer words covering letters still needed in the bonus alphabet.
    Alphabet,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::Longest => "longest",
            Strategy::Shortest => "shortest",
            Strategy::Alphabet => "alphabet",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Strategy::Random),
            "longest" => Ok(Strategy::Longest),
            "shortest" => Ok(Strategy::Shortest),
            "alphabet" => Ok(Strategy::Alphabet),
            other => Err(format!(
                "unknown strategy '{other}' (expected random, longest, shortest or alphabet)"
            )),
        }
    }
}

/// Picks words for a syllable and remembers which ones were already played.
pub struct Solver {
    strategy: Strategy,
    used: HashSet<String>,
    random_pool: usize,
    rng: StdRng,
    log: Logger,
}

impl Solver {
    pub fn new(log: Logger) -> Self {
        Self::from_rng(StdRng::from_entropy(), log)
    }

    /// Deterministic random strategy, for tests.
    pub fn with_seed(seed: u64, log: Logger) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), log)
    }

    fn from_rng(rng: StdRng, log: Logger) -> Self {
        Self {
            strategy: Strategy::default(),
            used: HashSet::new(),
            random_pool: DEFAULT_RANDOM_POOL,
            rng,
            log,
        }
    }

    /// Caps the random strategy to the first `pool` candidates in list order.
    /// Smaller pools are cheaper on big dictionaries but less varied.
    pub fn with_random_pool(mut self, pool: usize) -> Self {
        self.random_pool = pool.max(1);
        self
    }

    pub fn random_pool(&self) -> usize {
        self.random_pool
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Takes effect on the next `solve`; words already used stay used.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    pub fn is_used(&self, word: &str) -> bool {
        self.used.contains(word)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    pub fn mark_used(&mut self, word: impl Into<String>) {
        let word = word.into();
        if !word.is_empty() {
            self.used.insert(word);
        }
    }

    pub fn reset_used(&mut self) {
        self.used.clear();
    }

    /// Returns a word containing `syllable`.
    ///
    /// Unused words are scored by the active strategy and the winner is
    /// marked used. When every containing word was already played, the first
    /// one in list order is returned as-is and may be rejected by the game.
    pub fn solve(
        &mut self,
        dictionary: &Dictionary,
        bonus: &BonusAlphabet,
        syllable: &str,
    ) -> Option<String> {
        let syllable = syllable.trim().to_lowercase();
        let containing = dictionary.words().containing(&syllable);
        let mut candidates: Vec<&str> = containing
            .iter()
            .copied()
            .filter(|word| !self.used.contains(*word))
            .collect();

        if candidates.is_empty() {
            let fallback = containing.first().map(|word| word.to_string());
            if let Some(word) = &fallback {
                self.log.warn(&format!(
                    "[SOLVE] Every word with '{syllable}' was used, repeating '{word}'"
                ));
            }
            return fallback;
        }

        let choice = match self.strategy {
            Strategy::Random => {
                candidates.truncate(self.random_pool);
                candidates.choose(&mut self.rng).copied()
            }
            Strategy::Longest => first_best(&candidates, |word| word.chars().count()),
            Strategy::Shortest => first_best(&candidates, |word| Reverse(word.chars().count())),
            Strategy::Alphabet => first_best(&candidates, |word| {
                (bonus.needed_letters(word).len(), word.chars().count())
            }),
        }?
        .to_string();

        if self.strategy == Strategy::Alphabet {
            let letters = bonus.needed_letters(&choice);
            if !letters.is_empty() {
                let letters: Vec<String> = letters.iter().map(char::to_string).collect();
                self.log.info(&format!(
                    "[LIVES] '{choice}' (+{}) covers {}",
                    letters.len(),
                    letters.join(", ")
                ));
            }
        }

        self.used.insert(choice.clone());
        Some(choice)
    }
}

/// Highest-keyed word; ties go to the earliest one.
fn first_best<'a, K, F>(words: &[&'a str], key: F) -> Option<&'a str>
where
    K: Ord,
    F: Fn(&str) -> K,
{
    let mut best: Option<(&'a str, K)> = None;
    for &word in words {
        let score = key(word);
        if best.as_ref().is_none_or(|(_, top)| score > *top) {
            best = Some((word, score));
        }
    }
    best.map(|(word, _)| word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Language;
    use crate::logging::RecordingLog;
    use log::Level;

    fn dict(words: &[&str]) -> Dictionary {
        Dictionary::with_words(Language::English, words.iter().copied(), RecordingLog::new())
    }

    fn solver(strategy: Strategy) -> Solver {
        let mut solver = Solver::with_seed(7, RecordingLog::new());
        solver.set_strategy(strategy);
        solver
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Longest".parse::<Strategy>(), Ok(Strategy::Longest));
        assert_eq!("alphabet".parse::<Strategy>(), Ok(Strategy::Alphabet));
        assert!("fastest".parse::<Strategy>().is_err());
        assert_eq!(Strategy::default(), Strategy::Random);
    }

    #[test]
    fn test_longest_then_next_longest() {
        let dict = dict(&["cat", "cats", "dog"]);
        let bonus = BonusAlphabet::new();
        let mut solver = solver(Strategy::Longest);

        assert_eq!(solver.solve(&dict, &bonus, "at").as_deref(), Some("cats"));
        assert!(solver.is_used("cats"));
        assert_eq!(solver.solve(&dict, &bonus, "at").as_deref(), Some("cat"));
    }

    #[test]
    fn test_shortest_ties_go_to_first() {
        let dict = dict(&["bat", "cat", "scat"]);
        let mut solver = solver(Strategy::Shortest);
        assert_eq!(
            solver.solve(&dict, &BonusAlphabet::new(), "at").as_deref(),
            Some("bat")
        );
    }

    #[test]
    fn test_longest_ties_go_to_first() {
        let dict = dict(&["bats", "cats", "at"]);
        let mut solver = solver(Strategy::Longest);
        assert_eq!(
            solver.solve(&dict, &BonusAlphabet::new(), "at").as_deref(),
            Some("bats")
        );
    }

    #[test]
    fn test_alphabet_prefers_needed_letters() {
        let dict = dict(&["cc", "ab", "ba"]);
        let mut bonus = BonusAlphabet::new();
        bonus.set([('a', 1), ('b', 0)]);
        let mut solver = solver(Strategy::Alphabet);

        assert_eq!(solver.solve(&dict, &bonus, "").as_deref(), Some("ab"));
        assert_eq!(solver.solve(&dict, &bonus, "").as_deref(), Some("ba"));
        assert_eq!(solver.solve(&dict, &bonus, "").as_deref(), Some("cc"));
    }

    #[test]
    fn test_alphabet_uses_length_as_second_key() {
        let dict = dict(&["axe", "taxes", "xx"]);
        let mut bonus = BonusAlphabet::new();
        bonus.set([('a', 1), ('e', 1)]);
        let mut solver = solver(Strategy::Alphabet);
        assert_eq!(solver.solve(&dict, &bonus, "x").as_deref(), Some("taxes"));
    }

    #[test]
    fn test_random_picks_unused_containing_word() {
        let dict = dict(&["cat", "cats", "scatter", "dog"]);
        let bonus = BonusAlphabet::new();
        let mut solver = solver(Strategy::Random);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let word = solver.solve(&dict, &bonus, "AT").unwrap();
            assert!(word.contains("at"));
            assert!(!seen.contains(&word));
            seen.push(word);
        }
        assert_eq!(solver.used_count(), 3);
    }

    #[test]
    fn test_random_pool_limits_candidates() {
        let dict = dict(&["ab", "abc", "abcd", "abcde"]);
        let bonus = BonusAlphabet::new();
        let mut solver = solver(Strategy::Random).with_random_pool(1);

        assert_eq!(solver.solve(&dict, &bonus, "ab").as_deref(), Some("ab"));
        assert_eq!(solver.solve(&dict, &bonus, "ab").as_deref(), Some("abc"));
    }

    #[test]
    fn test_fallback_repeats_first_used_word() {
        let dict = dict(&["cat", "dog"]);
        let bonus = BonusAlphabet::new();
        let log = RecordingLog::new();
        let mut solver = Solver::with_seed(1, log.clone());

        assert_eq!(solver.solve(&dict, &bonus, "at").as_deref(), Some("cat"));
        assert_eq!(solver.solve(&dict, &bonus, "at").as_deref(), Some("cat"));
        assert!(log.contains(Level::Warn, "repeating 'cat'"));
    }

    #[test]
    fn test_no_word_anywhere() {
        let dict = dict(&["cat", "dog"]);
        let mut solver = solver(Strategy::Longest);
        assert_eq!(solver.solve(&dict, &BonusAlphabet::new(), "zz"), None);
        assert_eq!(solver.used_count(), 0);
    }

    #[test]
    fn test_reset_used_makes_words_selectable_again() {
        let dict = dict(&["cat", "cats"]);
        let bonus = BonusAlphabet::new();
        let mut solver = solver(Strategy::Longest);

        solver.solve(&dict, &bonus, "at");
        solver.reset_used();
        assert_eq!(solver.solve(&dict, &bonus, "at").as_deref(), Some("cats"));
    }

    #[test]
    fn test_banned_word_never_selected() {
        let mut dict = dict(&["cat", "cats"]);
        let bonus = BonusAlphabet::new();
        let mut solver = solver(Strategy::Longest);

        dict.ban("cats");
        assert_eq!(solver.solve(&dict, &bonus, "at").as_deref(), Some("cat"));
        solver.reset_used();
        assert_eq!(solver.solve(&dict, &bonus, "at").as_deref(), Some("cat"));
    }

    #[test]
    fn test_switching_strategy_keeps_used_words() {
        let dict = dict(&["cat", "cats"]);
        let bonus = BonusAlphabet::new();
        let mut solver = solver(Strategy::Longest);

        solver.solve(&dict, &bonus, "at");
        solver.set_strategy(Strategy::Shortest);
        assert!(solver.is_used("cats"));
        assert_eq!(solver.solve(&dict, &bonus, "at").as_deref(), Some("cat"));
    }
}
