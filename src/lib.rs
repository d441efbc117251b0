// Library interface for syllable-bot
// This allows integration tests to access internal modules

pub mod bonus;
pub mod cli;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod session;
pub mod solver;
pub mod typing;

// Re-export commonly used types for easier testing
pub use bonus::BonusAlphabet;
pub use config::{BotConfig, DelayRange};
pub use dictionary::{Dictionary, Language, WordList, load_words_from_file, load_words_from_str};
pub use error::{DictionaryError, ProtocolError};
pub use protocol::{GameEvent, Outbound, parse_event};
pub use session::{Phase, Session};
pub use solver::{Solver, Strategy};
