// Runtime options pushed by the browser panel and echoed back on setup

use crate::error::ProtocolError;
use crate::solver::Strategy;
use rand::Rng;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const MAX_DELAY_SECS: f64 = 60.0;

/// Uniform delay range in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    pub min: f64,
    pub max: f64,
}

impl DelayRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draws a delay. Negative or non-finite bounds count as zero, bounds
    /// are capped at `MAX_DELAY_SECS` and swapped bounds are reordered.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let clean = |v: f64| {
            if v.is_finite() && v > 0.0 {
                v.min(MAX_DELAY_SECS)
            } else {
                0.0
            }
        };
        let (lo, hi) = {
            let (a, b) = (clean(self.min), clean(self.max));
            if a <= b { (a, b) } else { (b, a) }
        };
        if hi <= lo {
            return Duration::from_secs_f64(lo);
        }
        Duration::from_secs_f64(rng.gen_range(lo..=hi))
    }
}

/// Seconds between typed characters.
pub const DEFAULT_TYPING_DELAY: DelayRange = DelayRange::new(0.05, 0.15);
/// Seconds of "thinking" before the first character.
pub const DEFAULT_START_DELAY: DelayRange = DelayRange::new(0.5, 1.5);

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// Play on our turns at all.
    pub active: bool,
    /// Join the next round automatically when back in the lobby.
    pub autojoin: bool,
    /// Submit the escape phrase instead of a word.
    pub suicide: bool,
    pub typing_delay: DelayRange,
    pub start_delay: DelayRange,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            active: true,
            autojoin: false,
            suicide: false,
            typing_delay: DEFAULT_TYPING_DELAY,
            start_delay: DEFAULT_START_DELAY,
        }
    }
}

impl BotConfig {
    pub fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(active) = update.active {
            self.active = active;
        }
        if let Some(autojoin) = update.autojoin {
            self.autojoin = autojoin;
        }
        if let Some(suicide) = update.suicide {
            self.suicide = suicide;
        }
        if let Some(v) = update.min_typing_delay {
            self.typing_delay.min = v;
        }
        if let Some(v) = update.max_typing_delay {
            self.typing_delay.max = v;
        }
        if let Some(v) = update.start_delay_min {
            self.start_delay.min = v;
        }
        if let Some(v) = update.start_delay_max {
            self.start_delay.max = v;
        }
    }

    pub fn snapshot(&self) -> InitialConfig {
        InitialConfig {
            min_typing_delay: self.typing_delay.min,
            max_typing_delay: self.typing_delay.max,
            start_delay_min: self.start_delay.min,
            start_delay_max: self.start_delay.max,
            active: self.active,
            autojoin: self.autojoin,
            suicide: self.suicide,
        }
    }
}

/// Payload of the `initialConfig` notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialConfig {
    pub min_typing_delay: f64,
    pub max_typing_delay: f64,
    pub start_delay_min: f64,
    pub start_delay_max: f64,
    pub active: bool,
    pub autojoin: bool,
    pub suicide: bool,
}

/// Recognized options of a `configUpdate`; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    pub active: Option<bool>,
    pub autojoin: Option<bool>,
    pub suicide: Option<bool>,
    pub strategy: Option<Strategy>,
    pub min_typing_delay: Option<f64>,
    pub max_typing_delay: Option<f64>,
    pub start_delay_min: Option<f64>,
    pub start_delay_max: Option<f64>,
}

impl ConfigUpdate {
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        if !value.is_object() {
            return Err(ProtocolError::malformed("configUpdate", "expected an object"));
        }
        RawConfigUpdate::deserialize(value)
            .map(Self::from)
            .map_err(|e| ProtocolError::malformed("configUpdate", e.to_string()))
    }
}

/// `configUpdate` as the panel sends it.
#[derive(Debug, Deserialize)]
struct RawConfigUpdate {
    active: Option<bool>,
    autojoin: Option<bool>,
    suicide: Option<bool>,
    strategy_alphabet: Option<bool>,
    strategy_longest: Option<bool>,
    strategy_shortest: Option<bool>,
    #[serde(rename = "minTypingDelay")]
    min_typing_delay: Option<Seconds>,
    #[serde(rename = "maxTypingDelay")]
    max_typing_delay: Option<Seconds>,
    #[serde(rename = "startDelayMin")]
    start_delay_min: Option<Seconds>,
    #[serde(rename = "startDelayMax")]
    start_delay_max: Option<Seconds>,
}

/// Delays come as numbers or as the raw text of a form input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl Seconds {
    fn value(self) -> Option<f64> {
        let secs = match self {
            Seconds::Number(v) => Some(v),
            Seconds::Text(text) => text.trim().parse().ok(),
            Seconds::Other(_) => None,
        };
        secs.filter(|v| v.is_finite())
    }
}

impl From<RawConfigUpdate> for ConfigUpdate {
    fn from(raw: RawConfigUpdate) -> Self {
        let strategy = match (raw.strategy_alphabet, raw.strategy_longest, raw.strategy_shortest) {
            (Some(true), _, _) => Some(Strategy::Alphabet),
            (_, Some(true), _) => Some(Strategy::Longest),
            (_, _, Some(true)) => Some(Strategy::Shortest),
            (None, None, None) => None,
            // Every strategy box unticked.
            _ => Some(Strategy::Random),
        };

        Self {
            active: raw.active,
            autojoin: raw.autojoin,
            suicide: raw.suicide,
            strategy,
            min_typing_delay: raw.min_typing_delay.and_then(Seconds::value),
            max_typing_delay: raw.max_typing_delay.and_then(Seconds::value),
            start_delay_min: raw.start_delay_min.and_then(Seconds::value),
            start_delay_max: raw.start_delay_max.and_then(Seconds::value),
        }
    }
}
