//! Dictionary store: the mutable word list plus the learn/ban buffers that are
//! merged into the on-disk word file on save.

use crate::error::DictionaryError;
use crate::logging::Logger;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Game languages with a backing word file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Spanish,
    English,
    German,
    French,
    Italian,
    BrazilianPortuguese,
}

impl Language {
    pub const DEFAULT: Language = Language::Spanish;

    pub const ALL: [Language; 6] = [
        Language::Spanish,
        Language::English,
        Language::German,
        Language::French,
        Language::Italian,
        Language::BrazilianPortuguese,
    ];

    /// Resolves the name the game puts in `dictionaryManifest.name`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.name().eq_ignore_ascii_case(name) || lang.code() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Spanish => "Spanish",
            Language::English => "English",
            Language::German => "German",
            Language::French => "French",
            Language::Italian => "Italian",
            Language::BrazilianPortuguese => "Brazilian Portuguese",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
            Language::German => "de",
            Language::French => "fr",
            Language::Italian => "it",
            Language::BrazilianPortuguese => "pt",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.txt", self.code())
    }

    /// Letters beyond a-z that words in this language may contain.
    fn extra_letters(self) -> &'static str {
        match self {
            Language::Spanish => "áéíóúüñ",
            Language::English => "",
            Language::German => "äöüß",
            Language::French => "àâæçéèêëîïôœùûüÿ",
            Language::Italian => "àèéìíîòóùú",
            Language::BrazilianPortuguese => "áâãàçéêíóôõúü",
        }
    }

    pub fn is_letter(self, c: char) -> bool {
        c.is_ascii_lowercase() || self.extra_letters().contains(c)
    }

    /// Lowercases and drops everything that is not a letter of this language.
    pub fn normalize(self, word: &str) -> String {
        word.trim()
            .to_lowercase()
            .chars()
            .filter(|&c| self.is_letter(c))
            .collect()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Default location of the per-language word files.
pub fn default_dictionary_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("syllable-bot").join("dictionaries"))
        .unwrap_or_else(|| PathBuf::from("data").join("dictionaries"))
}

pub fn load_words_from_str(data: &str) -> Vec<String> {
    data.lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

pub fn load_words_from_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut words = Vec::new();
    for line in reader.lines() {
        let word = line?.trim().to_lowercase();
        if !word.is_empty() {
            words.push(word);
        }
    }
    Ok(words)
}

/// Ordered, duplicate-free word collection.
///
/// Removal leaves a hole so positions (and therefore tie-break order) stay
/// stable. Each letter keeps the ascending list of slots whose word contains
/// it, so a substring lookup only walks the words holding the fragment's
/// rarest letter.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    slots: Vec<Option<String>>,
    positions: HashMap<String, usize>,
    by_letter: HashMap<char, Vec<usize>>,
}

impl WordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut list = Self::new();
        for word in words {
            list.push(word);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.positions.contains_key(word)
    }

    /// Appends `word`. Returns false for empty words and duplicates.
    pub fn push(&mut self, word: String) -> bool {
        if word.is_empty() || self.positions.contains_key(&word) {
            return false;
        }
        let slot = self.slots.len();
        for c in word.chars() {
            let postings = self.by_letter.entry(c).or_default();
            if postings.last() != Some(&slot) {
                postings.push(slot);
            }
        }
        self.positions.insert(word.clone(), slot);
        self.slots.push(Some(word));
        true
    }

    pub fn remove(&mut self, word: &str) -> bool {
        let Some(slot) = self.positions.remove(word) else {
            return false;
        };
        self.slots[slot] = None;
        true
    }

    /// Words in list order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|slot| slot.as_deref())
    }

    /// Every word containing `fragment`, in list order.
    pub fn containing(&self, fragment: &str) -> Vec<&str> {
        if fragment.is_empty() {
            return self.iter().collect();
        }

        let mut rarest: Option<&Vec<usize>> = None;
        for c in fragment.chars() {
            let Some(postings) = self.by_letter.get(&c) else {
                return Vec::new();
            };
            if rarest.is_none_or(|best| postings.len() < best.len()) {
                rarest = Some(postings);
            }
        }

        rarest
            .into_iter()
            .flatten()
            .filter_map(|&slot| self.slots[slot].as_deref())
            .filter(|word| word.contains(fragment))
            .collect()
    }
}

/// Counts reported by a successful save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub added: usize,
    pub removed: usize,
    pub total: usize,
}

/// The word list for the current language plus pending disk changes.
pub struct Dictionary {
    dir: PathBuf,
    language: Option<Language>,
    path: Option<PathBuf>,
    words: WordList,
    /// Bans waiting for the next save.
    banned: HashSet<String>,
    learned: HashSet<String>,
    /// Every word banned since the language was loaded. Saves keep it.
    rejected: HashSet<String>,
    log: Logger,
}

impl Dictionary {
    pub fn new(dir: impl Into<PathBuf>, log: Logger) -> Self {
        Self {
            dir: dir.into(),
            language: None,
            path: None,
            words: WordList::new(),
            banned: HashSet::new(),
            learned: HashSet::new(),
            rejected: HashSet::new(),
            log,
        }
    }

    /// In-memory dictionary with no backing file.
    pub fn with_words<I, S>(language: Language, words: I, log: Logger) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::new(PathBuf::new(), log);
        dict.language = Some(language);
        dict.words = WordList::from_words(words.into_iter().map(|w| w.as_ref().to_lowercase()));
        dict
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn words(&self) -> &WordList {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn is_banned(&self, word: &str) -> bool {
        self.rejected.contains(word)
    }

    /// Normalizes with the loaded language's alphabet, or just lowercases
    /// before any language is set.
    pub fn normalize(&self, word: &str) -> String {
        match self.language {
            Some(language) => language.normalize(word),
            None => word.trim().to_lowercase(),
        }
    }

    /// (learned, banned) words waiting for the next save.
    pub fn pending_changes(&self) -> (usize, usize) {
        (self.learned.len(), self.banned.len())
    }

    /// Switches to `name`, reloading the word file. Unknown names fall back
    /// to Spanish. Returns the language now in effect.
    pub fn set_language(&mut self, name: &str) -> Language {
        let language = Language::from_name(name).unwrap_or_else(|| {
            self.log.warn(&format!(
                "[LANG] Language '{name}' is not supported, using {}",
                Language::DEFAULT
            ));
            Language::DEFAULT
        });

        if self.language == Some(language) {
            return language;
        }

        let path = self.dir.join(language.file_name());
        self.language = Some(language);
        self.path = Some(path);
        self.banned.clear();
        self.learned.clear();
        self.rejected.clear();
        self.reload();
        self.log.info(&format!(
            "[LANG] Language set to {language} ({})",
            language.file_name()
        ));
        language
    }

    fn reload(&mut self) {
        let Some(path) = self.path.as_deref() else {
            self.log.warn("[LOAD] No dictionary selected yet, waiting for setup");
            return;
        };
        match load_words_from_file(path) {
            Ok(words) => {
                self.words = WordList::from_words(words);
                self.log
                    .info(&format!("[LOAD] Dictionary loaded: {} words", self.words.len()));
            }
            Err(e) => {
                self.log.error(&format!(
                    "[LOAD] Could not read dictionary {}: {e}",
                    path.display()
                ));
                self.words = WordList::new();
            }
        }
    }

    /// Adds a word seen in play. Returns true if the word was new.
    pub fn learn(&mut self, word: &str) -> bool {
        let Some(language) = self.language else {
            return false;
        };
        let word = language.normalize(word);
        if word.is_empty() || self.rejected.contains(&word) || self.words.contains(&word) {
            return false;
        }
        self.words.push(word.clone());
        self.log.info(&format!("[LEARN] Learned word: {word}"));
        self.learned.insert(word);
        true
    }

    /// Removes a word the game rejected. Returns true if it was present.
    pub fn ban(&mut self, word: &str) -> bool {
        if !self.words.remove(word) {
            return false;
        }
        self.learned.remove(word);
        self.banned.insert(word.to_string());
        self.rejected.insert(word.to_string());
        self.log.warn(&format!("[BAN] Banned word: {word}"));
        true
    }

    /// Merges pending changes into the word file: `(disk ∪ learned) \ banned`,
    /// written sorted. Buffers are only cleared once the write succeeded.
    pub fn save(&mut self) -> Result<SaveSummary, DictionaryError> {
        if self.banned.is_empty() && self.learned.is_empty() {
            return Ok(SaveSummary::default());
        }
        let Some(path) = self.path.clone() else {
            return Err(DictionaryError::NotLoaded);
        };

        self.log.info(&format!(
            "[SAVE] Saving dictionary (+{}, -{})",
            self.learned.len(),
            self.banned.len()
        ));

        let mut merged: BTreeSet<String> = match fs::read_to_string(&path) {
            Ok(data) => load_words_from_str(&data).into_iter().collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(source) => return Err(DictionaryError::Read { path, source }),
        };
        merged.extend(self.learned.iter().cloned());
        for word in &self.banned {
            merged.remove(word);
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| DictionaryError::Write {
                path: path.clone(),
                source,
            })?;
        }
        let mut body = merged.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        fs::write(&path, body).map_err(|source| DictionaryError::Write {
            path: path.clone(),
            source,
        })?;

        let summary = SaveSummary {
            added: self.learned.len(),
            removed: self.banned.len(),
            total: merged.len(),
        };
        self.learned.clear();
        self.banned.clear();
        self.log.info("[SAVE] Dictionary saved");
        Ok(summary)
    }
}
