// Bonus alphabet: how many more times each letter is still needed this round

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BonusAlphabet {
    needed: BTreeMap<char, u32>,
}

impl BonusAlphabet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole map.
    pub fn set<I>(&mut self, counts: I)
    where
        I: IntoIterator<Item = (char, u32)>,
    {
        self.needed = counts.into_iter().collect();
    }

    /// Overwrites the counts of the given letters, leaving the rest alone.
    pub fn update<I>(&mut self, counts: I)
    where
        I: IntoIterator<Item = (char, u32)>,
    {
        self.needed.extend(counts);
    }

    pub fn remaining(&self, letter: char) -> u32 {
        self.needed.get(&letter).copied().unwrap_or(0)
    }

    pub fn is_needed(&self, letter: char) -> bool {
        self.remaining(letter) > 0
    }

    /// Distinct letters of `word` that still have a positive count.
    pub fn needed_letters(&self, word: &str) -> Vec<char> {
        let mut letters: Vec<char> = word.chars().filter(|&c| self.is_needed(c)).collect();
        letters.sort_unstable();
        letters.dedup();
        letters
    }

    pub fn is_empty(&self) -> bool {
        self.needed.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.needed.values().all(|&count| count == 0)
    }

    /// Letters still needed, in alphabetical order.
    pub fn pending(&self) -> Vec<(char, u32)> {
        self.needed
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(&c, &count)| (c, count))
            .collect()
    }

    /// One-line progress report for the log.
    pub fn progress(&self) -> String {
        if self.is_complete() {
            return "alphabet complete".to_string();
        }
        let pending = self.pending();
        let total: u32 = pending.iter().map(|(_, count)| count).sum();
        let letters = pending
            .iter()
            .map(|(c, count)| format!("{c}:{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{total} letters pending [{letters}]")
    }
}

/// Reads a `{"a": 1, "b": 0, ...}` object. Keys must be single letters and
/// counts non-negative integers; anything else is skipped.
pub fn parse_letter_counts(value: &Value) -> Option<Vec<(char, u32)>> {
    let object = value.as_object()?;
    let counts = object
        .iter()
        .filter_map(|(key, count)| {
            let mut chars = key.chars();
            let letter = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            let count = u32::try_from(count.as_u64()?).ok()?;
            Some((letter.to_lowercase().next().unwrap_or(letter), count))
        })
        .collect();
    Some(counts)
}
