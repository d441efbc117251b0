use crate::dictionary::default_dictionary_dir;
use crate::solver::{DEFAULT_RANDOM_POOL, Strategy};
use clap::Parser;
use std::path::PathBuf;

/// Plays syllable word games through a companion browser extension
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address the extension connects to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// WebSocket port
    #[arg(short, long, default_value_t = 8765)]
    pub port: u16,

    /// Directory holding one word file per language (es.txt, en.txt, ...)
    #[arg(short = 'd', long = "dictionary-dir")]
    pub dictionary_dir: Option<PathBuf>,

    /// Language used when the game does not announce one
    #[arg(short, long, default_value = "Spanish")]
    pub language: String,

    /// Starting strategy: random, longest, shortest or alphabet
    #[arg(short, long, default_value = "random")]
    pub strategy: Strategy,

    /// How many candidates the random strategy draws from
    #[arg(long = "random-pool", default_value_t = DEFAULT_RANDOM_POOL)]
    pub random_pool: usize,

    /// Also append log lines to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Log at debug level (includes packet traces in debug builds)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn dictionary_dir(&self) -> PathBuf {
        self.dictionary_dir
            .clone()
            .unwrap_or_else(default_dictionary_dir)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[must_use]
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_no_args() {
        let cli = Cli::try_parse_from(["syllable-bot"]).unwrap();
        assert_eq!(cli.address(), "127.0.0.1:8765");
        assert_eq!(cli.language, "Spanish");
        assert_eq!(cli.strategy, Strategy::Random);
        assert_eq!(cli.random_pool, 50);
        assert_eq!(cli.dictionary_dir, None);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_cli_with_options() {
        let cli = Cli::try_parse_from([
            "syllable-bot",
            "--port",
            "9000",
            "-d",
            "/tmp/words",
            "--strategy",
            "longest",
            "--random-pool",
            "10",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.dictionary_dir(), PathBuf::from("/tmp/words"));
        assert_eq!(cli.strategy, Strategy::Longest);
        assert_eq!(cli.random_pool, 10);
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_cli_rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["syllable-bot", "--strategy", "fastest"]).is_err());
    }

    #[test]
    fn test_default_dictionary_dir_is_used() {
        let cli = Cli::try_parse_from(["syllable-bot"]).unwrap();
        assert_eq!(cli.dictionary_dir(), default_dictionary_dir());
    }
}
