//! Wire format shared with the browser extension.
//!
//! Inbound frames look like `{"event": <kind>, "data": <payload>}` where the
//! payload is either an object or the game's positional argument list. Both
//! shapes are folded into one `GameEvent` variant per kind here so the
//! session never looks at raw JSON.

use crate::bonus::parse_letter_counts;
use crate::config::{ConfigUpdate, InitialConfig};
use crate::error::ProtocolError;
use serde::Serialize;
use serde_json::Value;

pub type PeerId = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct Setup {
    pub self_peer_id: PeerId,
    /// `milestone.dictionaryManifest.name`
    pub language: Option<String>,
    pub bonus_alphabet: Option<Vec<(char, u32)>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    NotInDictionary,
    AlreadyUsed,
    Other(String),
}

impl FailReason {
    fn from_wire(reason: &str) -> Self {
        match reason {
            "notInDictionary" => FailReason::NotInDictionary,
            "alreadyUsed" => FailReason::AlreadyUsed,
            other => FailReason::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailReason::NotInDictionary => write!(f, "notInDictionary"),
            FailReason::AlreadyUsed => write!(f, "alreadyUsed"),
            FailReason::Other(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Milestone {
    /// Back in the lobby; per-round state resets here.
    Seating {
        bonus_alphabet: Option<Vec<(char, u32)>>,
    },
    /// A round started.
    Round {
        current_player: Option<PeerId>,
        syllable: Option<String>,
    },
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    LivesLost,
    BonusAlphabetCompleted,
    AddPlayer,
    RemovePlayer,
    SetRules,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Setup(Setup),
    NextTurn {
        player: PeerId,
        syllable: String,
    },
    FailWord {
        player: PeerId,
        reason: FailReason,
    },
    CorrectWord {
        player: PeerId,
        bonus_letters: Option<Vec<(char, u32)>>,
    },
    SetPlayerWord {
        player: PeerId,
        word: String,
    },
    Milestone(Milestone),
    ConfigUpdate(ConfigUpdate),
    CustomMessage(String),
    Info(InfoKind),
}

impl GameEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::Setup(_) => "setup",
            GameEvent::NextTurn { .. } => "nextTurn",
            GameEvent::FailWord { .. } => "failWord",
            GameEvent::CorrectWord { .. } => "correctWord",
            GameEvent::SetPlayerWord { .. } => "setPlayerWord",
            GameEvent::Milestone(_) => "setMilestone",
            GameEvent::ConfigUpdate(_) => "configUpdate",
            GameEvent::CustomMessage(_) => "customMessage",
            GameEvent::Info(InfoKind::LivesLost) => "livesLost",
            GameEvent::Info(InfoKind::BonusAlphabetCompleted) => "bonusAlphabetCompleted",
            GameEvent::Info(InfoKind::AddPlayer) => "addPlayer",
            GameEvent::Info(InfoKind::RemovePlayer) => "removePlayer",
            GameEvent::Info(InfoKind::SetRules) => "setRules",
        }
    }

    pub fn from_parts(event: &str, data: &Value) -> Result<Self, ProtocolError> {
        let args = Args(data);
        match event {
            "setup" => parse_setup(data),
            "nextTurn" => Ok(GameEvent::NextTurn {
                player: args.peer(0, "playerPeerId", "nextTurn")?,
                syllable: args.string(1, "syllable", "nextTurn")?,
            }),
            "failWord" => Ok(GameEvent::FailWord {
                player: args.peer(0, "playerPeerId", "failWord")?,
                reason: FailReason::from_wire(&args.string(1, "reason", "failWord")?),
            }),
            "correctWord" => Ok(GameEvent::CorrectWord {
                player: args.peer(0, "playerPeerId", "correctWord")?,
                bonus_letters: args.get(1, "bonusLetters").and_then(parse_letter_counts),
            }),
            "setPlayerWord" => Ok(GameEvent::SetPlayerWord {
                player: args.peer(0, "playerPeerId", "setPlayerWord")?,
                word: args.string(1, "word", "setPlayerWord")?,
            }),
            "setMilestone" => parse_milestone(data).map(GameEvent::Milestone),
            "configUpdate" => ConfigUpdate::from_value(data).map(GameEvent::ConfigUpdate),
            "customMessage" => data
                .as_str()
                .map(|text| GameEvent::CustomMessage(text.to_string()))
                .ok_or_else(|| ProtocolError::malformed("customMessage", "expected a string")),
            "livesLost" => Ok(GameEvent::Info(InfoKind::LivesLost)),
            "bonusAlphabetCompleted" => Ok(GameEvent::Info(InfoKind::BonusAlphabetCompleted)),
            "addPlayer" => Ok(GameEvent::Info(InfoKind::AddPlayer)),
            "removePlayer" => Ok(GameEvent::Info(InfoKind::RemovePlayer)),
            "setRules" => Ok(GameEvent::Info(InfoKind::SetRules)),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

/// Parses one inbound text frame.
pub fn parse_event(text: &str) -> Result<GameEvent, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;
    let event = object
        .get("event")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingEvent)?;
    let data = object.get("data").unwrap_or(&Value::Null);
    GameEvent::from_parts(event, data)
}

/// Positional-or-named view of a payload.
struct Args<'a>(&'a Value);

impl<'a> Args<'a> {
    fn get(&self, index: usize, key: &str) -> Option<&'a Value> {
        match self.0 {
            Value::Array(items) => items.get(index),
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    fn peer(&self, index: usize, key: &str, event: &'static str) -> Result<PeerId, ProtocolError> {
        self.get(index, key)
            .and_then(peer_id)
            .ok_or_else(|| ProtocolError::malformed(event, format!("missing {key}")))
    }

    fn string(&self, index: usize, key: &str, event: &'static str) -> Result<String, ProtocolError> {
        self.get(index, key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProtocolError::malformed(event, format!("missing {key}")))
    }
}

/// Peer ids are integers; some relays stringify them.
fn peer_id(value: &Value) -> Option<PeerId> {
    value
        .as_i64()
        .or_else(|| value.as_str()?.trim().parse().ok())
}

/// Unwraps `[payload, ...]` into `payload`.
fn first_object(data: &Value) -> Option<&Value> {
    match data {
        Value::Array(items) => items.first().filter(|v| v.is_object()),
        Value::Object(_) => Some(data),
        _ => None,
    }
}

fn parse_setup(data: &Value) -> Result<GameEvent, ProtocolError> {
    let payload =
        first_object(data).ok_or_else(|| ProtocolError::malformed("setup", "expected an object"))?;
    let self_peer_id = payload
        .get("selfPeerId")
        .and_then(peer_id)
        .ok_or_else(|| ProtocolError::malformed("setup", "missing selfPeerId"))?;
    let manifest = payload
        .get("milestone")
        .and_then(|m| m.get("dictionaryManifest"));

    Ok(GameEvent::Setup(Setup {
        self_peer_id,
        language: manifest
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        bonus_alphabet: manifest
            .and_then(|m| m.get("bonusAlphabet"))
            .and_then(parse_letter_counts),
    }))
}

fn parse_milestone(data: &Value) -> Result<Milestone, ProtocolError> {
    let payload = first_object(data)
        .ok_or_else(|| ProtocolError::malformed("setMilestone", "expected an object"))?;
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::malformed("setMilestone", "missing name"))?;

    Ok(match name {
        "seating" => Milestone::Seating {
            bonus_alphabet: payload
                .get("dictionaryManifest")
                .and_then(|m| m.get("bonusAlphabet"))
                .and_then(parse_letter_counts),
        },
        "round" => Milestone::Round {
            current_player: payload.get("currentPlayerPeerId").and_then(peer_id),
            syllable: payload
                .get("syllable")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        other => Milestone::Other(other.to_string()),
    })
}

/// Commands for the extension to replay on the game socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action")]
pub enum Action {
    /// Partial word shown in the input box.
    #[serde(rename = "teclear_texto")]
    TypeText { text: String },
    /// Final submission.
    #[serde(rename = "escribir_palabra")]
    SubmitWord { word: String },
    #[serde(rename = "unirse_juego")]
    JoinRound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Notice {
    #[serde(rename = "initialConfig")]
    InitialConfig(InitialConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Action(Action),
    Notice(Notice),
}

impl Outbound {
    pub fn type_text(text: impl Into<String>) -> Self {
        Outbound::Action(Action::TypeText { text: text.into() })
    }

    pub fn submit(word: impl Into<String>) -> Self {
        Outbound::Action(Action::SubmitWord { word: word.into() })
    }

    pub fn join_round() -> Self {
        Outbound::Action(Action::JoinRound)
    }

    pub fn initial_config(config: InitialConfig) -> Self {
        Outbound::Notice(Notice::InitialConfig(config))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use serde_json::json;

    fn parse(value: Value) -> Result<GameEvent, ProtocolError> {
        parse_event(&value.to_string())
    }

    #[test]
    fn test_next_turn_both_shapes() {
        let positional = parse(json!({"event": "nextTurn", "data": [3, "ca", 1]})).unwrap();
        let named =
            parse(json!({"event": "nextTurn", "data": {"playerPeerId": 3, "syllable": "ca"}}))
                .unwrap();
        let expected = GameEvent::NextTurn {
            player: 3,
            syllable: "ca".to_string(),
        };
        assert_eq!(positional, expected);
        assert_eq!(named, expected);
    }

    #[test]
    fn test_peer_id_as_string() {
        let event = parse(json!({"event": "failWord", "data": ["12", "alreadyUsed"]})).unwrap();
        assert_eq!(
            event,
            GameEvent::FailWord {
                player: 12,
                reason: FailReason::AlreadyUsed
            }
        );
    }

    #[test]
    fn test_fail_reasons() {
        let event = parse(json!({"event": "failWord", "data": {"playerPeerId": 1, "reason": "notInDictionary"}})).unwrap();
        assert!(matches!(
            event,
            GameEvent::FailWord {
                reason: FailReason::NotInDictionary,
                ..
            }
        ));
        let event = parse(json!({"event": "failWord", "data": [1, "mustContainSyllable"]})).unwrap();
        assert!(matches!(
            event,
            GameEvent::FailWord {
                reason: FailReason::Other(ref r),
                ..
            } if r == "mustContainSyllable"
        ));
    }

    #[test]
    fn test_setup_reads_manifest() {
        let event = parse(json!({
            "event": "setup",
            "data": {
                "selfPeerId": 7,
                "milestone": {
                    "name": "seating",
                    "dictionaryManifest": {"name": "English", "bonusAlphabet": {"a": 1, "b": 2}}
                }
            }
        }))
        .unwrap();
        let GameEvent::Setup(setup) = event else {
            panic!("expected setup");
        };
        assert_eq!(setup.self_peer_id, 7);
        assert_eq!(setup.language.as_deref(), Some("English"));
        let mut bonus = setup.bonus_alphabet.unwrap();
        bonus.sort_unstable();
        assert_eq!(bonus, vec![('a', 1), ('b', 2)]);
    }

    #[test]
    fn test_setup_without_peer_is_malformed() {
        let err = parse(json!({"event": "setup", "data": {"milestone": {}}})).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPayload { event: "setup", .. }));
    }

    #[test]
    fn test_milestone_array_wrapper() {
        let event = parse(json!({
            "event": "setMilestone",
            "data": [{"name": "round", "currentPlayerPeerId": 4, "syllable": "ar"}, 123456]
        }))
        .unwrap();
        assert_eq!(
            event,
            GameEvent::Milestone(Milestone::Round {
                current_player: Some(4),
                syllable: Some("ar".to_string())
            })
        );
    }

    #[test]
    fn test_milestone_seating_and_other() {
        let seating = parse(json!({"event": "setMilestone", "data": {"name": "seating"}})).unwrap();
        assert_eq!(
            seating,
            GameEvent::Milestone(Milestone::Seating {
                bonus_alphabet: None
            })
        );
        let other = parse(json!({"event": "setMilestone", "data": {"name": "paused"}})).unwrap();
        assert_eq!(
            other,
            GameEvent::Milestone(Milestone::Other("paused".to_string()))
        );
    }

    #[test]
    fn test_correct_word_bonus_letters() {
        let event = parse(json!({
            "event": "correctWord",
            "data": {"playerPeerId": 2, "bonusLetters": {"z": 0}}
        }))
        .unwrap();
        assert_eq!(
            event,
            GameEvent::CorrectWord {
                player: 2,
                bonus_letters: Some(vec![('z', 0)])
            }
        );
    }

    #[test]
    fn test_set_player_word_positional() {
        let event = parse(json!({"event": "setPlayerWord", "data": [5, "hola", true]})).unwrap();
        assert_eq!(
            event,
            GameEvent::SetPlayerWord {
                player: 5,
                word: "hola".to_string()
            }
        );
    }

    #[test]
    fn test_info_events() {
        let event = parse(json!({"event": "livesLost", "data": [1, 2]})).unwrap();
        assert_eq!(event, GameEvent::Info(InfoKind::LivesLost));
        assert_eq!(event.kind(), "livesLost");
    }

    #[test]
    fn test_rejects_bad_frames() {
        assert!(matches!(
            parse_event("not json"),
            Err(ProtocolError::InvalidJson(_))
        ));
        assert!(matches!(parse(json!([1, 2])), Err(ProtocolError::NotAnObject)));
        assert!(matches!(
            parse(json!({"data": {}})),
            Err(ProtocolError::MissingEvent)
        ));
        assert!(matches!(
            parse(json!({"event": "chat", "data": {}})),
            Err(ProtocolError::UnknownEvent(_))
        ));
        assert!(matches!(
            parse(json!({"event": "nextTurn", "data": [1]})),
            Err(ProtocolError::MalformedPayload { .. })
        ));
        assert!(matches!(
            parse(json!({"event": "customMessage", "data": 3})),
            Err(ProtocolError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_outbound_json() {
        assert_eq!(
            serde_json::to_value(Outbound::type_text("ho")).unwrap(),
            json!({"action": "teclear_texto", "text": "ho"})
        );
        assert_eq!(
            serde_json::to_value(Outbound::submit("hola")).unwrap(),
            json!({"action": "escribir_palabra", "word": "hola"})
        );
        assert_eq!(
            serde_json::to_value(Outbound::join_round()).unwrap(),
            json!({"action": "unirse_juego"})
        );
        let notice = serde_json::to_value(Outbound::initial_config(BotConfig::default().snapshot()))
            .unwrap();
        assert_eq!(notice["event"], "initialConfig");
        assert_eq!(notice["data"]["active"], true);
        assert_eq!(notice["data"]["minTypingDelay"], 0.05);
    }
}
