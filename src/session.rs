//! Turn protocol state machine for one extension connection.
//!
//! Phases: `AwaitingIdentity` → `Ready` ↔ `PlayingTurn`.
//! - Until `setup` names our peer id every other event is queued, then
//!   replayed in arrival order right after setup.
//! - A turn is decided synchronously (custom phrase, escape phrase or a
//!   solved word) and then typed by a spawned task. Starting another turn,
//!   or any `nextTurn`, cancels the task still in flight.
//! - Handlers never fail: malformed frames are logged and dropped.

use crate::bonus::BonusAlphabet;
use crate::config::BotConfig;
use crate::debug_log;
use crate::dictionary::{Dictionary, Language};
use crate::error::ProtocolError;
use crate::logging::Logger;
use crate::protocol::{FailReason, GameEvent, Milestone, Outbound, PeerId, Setup, parse_event};
use crate::solver::{Solver, Strategy};
use crate::typing::{CancelHandle, Outbox, TurnScript, TypingError, cancel_pair};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::{HashMap, VecDeque};
use tokio::task::JoinHandle;

/// Submitted instead of a word when self-elimination is switched on.
pub const ESCAPE_PHRASE: &str = "/suicide";

/// Rejections retried within one turn before giving up on it.
pub const MAX_RETRIES_PER_TURN: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingIdentity,
    Ready,
    PlayingTurn,
}

struct ActiveTurn {
    cancel: CancelHandle,
    task: JoinHandle<()>,
}

impl ActiveTurn {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    fn stop(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

pub struct Session {
    dictionary: Dictionary,
    bonus: BonusAlphabet,
    solver: Solver,
    config: BotConfig,
    default_language: String,
    identity: Option<PeerId>,
    pending: VecDeque<GameEvent>,
    player_words: HashMap<PeerId, String>,
    custom_phrase: Option<String>,
    last_syllable: Option<String>,
    last_attempt: Option<String>,
    retries: u32,
    turn: Option<ActiveTurn>,
    outbox: Option<Outbox>,
    rng: StdRng,
    log: Logger,
}

impl Session {
    pub fn new(dictionary: Dictionary, solver: Solver, config: BotConfig, log: Logger) -> Self {
        Self {
            dictionary,
            bonus: BonusAlphabet::new(),
            solver,
            config,
            default_language: Language::DEFAULT.name().to_string(),
            identity: None,
            pending: VecDeque::new(),
            player_words: HashMap::new(),
            custom_phrase: None,
            last_syllable: None,
            last_attempt: None,
            retries: 0,
            turn: None,
            outbox: None,
            rng: StdRng::from_entropy(),
            log,
        }
    }

    /// Language used when `setup` does not name one.
    pub fn with_default_language(mut self, name: impl Into<String>) -> Self {
        self.default_language = name.into();
        self
    }

    /// Seeds think-delay and typing randomness.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn phase(&self) -> Phase {
        if self.identity.is_none() {
            Phase::AwaitingIdentity
        } else if self.turn.as_ref().is_some_and(ActiveTurn::is_running) {
            Phase::PlayingTurn
        } else {
            Phase::Ready
        }
    }

    pub fn identity(&self) -> Option<PeerId> {
        self.identity
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn bonus(&self) -> &BonusAlphabet {
        &self.bonus
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn custom_phrase(&self) -> Option<&str> {
        self.custom_phrase.as_deref()
    }

    /// Starts sending outbound actions to a new connection.
    pub fn attach(&mut self, outbox: Outbox) {
        self.outbox = Some(outbox);
    }

    /// Forgets the connection. Dictionary, used words, strategy and config
    /// are kept for the next one; the extension re-sends `setup` on
    /// reconnect.
    pub fn disconnect(&mut self) {
        self.cancel_turn();
        self.save_dictionary();
        self.outbox = None;
        self.identity = None;
        self.pending.clear();
        self.player_words.clear();
        self.custom_phrase = None;
        self.last_syllable = None;
        self.last_attempt = None;
        self.retries = 0;
    }

    /// Flushes learned and banned words to disk, logging failures.
    pub fn save_dictionary(&mut self) {
        if let Err(e) = self.dictionary.save() {
            self.log.error(&format!("[SAVE] {e}"));
        }
    }

    /// Parses and handles one inbound text frame.
    pub fn handle_text(&mut self, text: &str) {
        debug_log!(target: crate::logging::PACKET_TARGET, "[RECV] {text}");
        match parse_event(text) {
            Ok(event) => self.handle(event),
            Err(ProtocolError::UnknownEvent(kind)) => {
                self.log.debug(&format!("[RECV] Ignoring unknown event '{kind}'"));
            }
            Err(e) => self.log.warn(&format!("[RECV] Dropped message: {e}")),
        }
    }

    pub fn handle(&mut self, event: GameEvent) {
        if self.identity.is_some() {
            self.dispatch(event);
            return;
        }
        match event {
            GameEvent::Setup(setup) => self.on_setup(setup),
            other => {
                self.log.info(&format!(
                    "[CACHE] {} arrived before setup, holding it",
                    other.kind()
                ));
                self.pending.push_back(other);
            }
        }
    }

    fn dispatch(&mut self, event: GameEvent) {
        match event {
            GameEvent::Setup(setup) => self.on_setup(setup),
            GameEvent::NextTurn { player, syllable } => self.on_next_turn(player, syllable),
            GameEvent::FailWord { player, reason } => self.on_fail_word(player, reason),
            GameEvent::CorrectWord {
                player,
                bonus_letters,
            } => self.on_correct_word(player, bonus_letters),
            GameEvent::SetPlayerWord { player, word } => {
                self.player_words.insert(player, word);
            }
            GameEvent::Milestone(milestone) => self.on_milestone(milestone),
            GameEvent::ConfigUpdate(update) => {
                self.log.info(&format!("[CONFIG] Update received: {update:?}"));
                self.config.apply(&update);
                if let Some(strategy) = update.strategy {
                    self.solver.set_strategy(strategy);
                    self.log.info(&format!("[CONFIG] Strategy: {strategy}"));
                    self.log_alphabet_progress();
                }
                if update.autojoin == Some(true) {
                    self.log.info("[AUTOJOIN] Enabled, joining now");
                    self.send(Outbound::join_round());
                }
            }
            GameEvent::CustomMessage(text) => {
                if text.trim().is_empty() {
                    self.log.debug("[CHAT] Ignoring empty custom phrase");
                } else {
                    self.log.info(&format!("[CHAT] Custom phrase queued: {text}"));
                    self.custom_phrase = Some(text);
                }
            }
            GameEvent::Info(kind) => {
                self.log.debug(&format!("[INFO] {kind:?}"));
            }
        }
    }

    fn on_setup(&mut self, setup: Setup) {
        self.identity = Some(setup.self_peer_id);
        self.log
            .info(&format!("[SETUP] Setup complete, my id is {}", setup.self_peer_id));

        let language = setup
            .language
            .unwrap_or_else(|| self.default_language.clone());
        self.dictionary.set_language(&language);
        if let Some(counts) = setup.bonus_alphabet {
            self.set_bonus_alphabet(counts);
        }

        self.send(Outbound::initial_config(self.config.snapshot()));

        if !self.pending.is_empty() {
            self.log.info(&format!(
                "[SETUP] Replaying {} held events",
                self.pending.len()
            ));
            for event in std::mem::take(&mut self.pending) {
                self.dispatch(event);
            }
        }
    }

    fn on_next_turn(&mut self, player: PeerId, syllable: String) {
        // Whoever plays now, an older turn sequence is stale.
        self.cancel_turn();

        let mine = self.identity == Some(player);
        self.log.info(&format!(
            "[TURN] Turn of {player} (me: {}) | syllable '{syllable}'",
            self.identity.unwrap_or_default()
        ));
        if !mine {
            return;
        }
        self.begin_turn(syllable);
    }

    fn begin_turn(&mut self, syllable: String) {
        self.last_syllable = Some(syllable.clone());
        self.retries = 0;
        if !self.config.active {
            self.log.info("[PAUSE] My turn, but the bot is disabled");
            return;
        }
        self.play_turn(&syllable, true);
    }

    fn on_fail_word(&mut self, player: PeerId, reason: FailReason) {
        if self.identity != Some(player) {
            return;
        }
        self.log
            .warn(&format!("[FAIL] My word was rejected: {reason}"));

        match reason {
            FailReason::NotInDictionary => {
                if let Some(word) = self.last_attempt.take() {
                    self.dictionary.ban(&word);
                }
                self.retry();
            }
            FailReason::AlreadyUsed => {
                if let Some(word) = self.last_attempt.take() {
                    self.solver.mark_used(word);
                }
                self.retry();
            }
            FailReason::Other(_) => {}
        }
    }

    fn retry(&mut self) {
        let Some(syllable) = self.last_syllable.clone() else {
            return;
        };
        if !self.config.active || self.config.suicide {
            return;
        }
        if self.retries >= MAX_RETRIES_PER_TURN {
            self.log.warn(&format!(
                "[RETRY] Giving up on '{syllable}' after {} attempts",
                self.retries
            ));
            return;
        }
        self.retries += 1;
        self.log.info("[RETRY] Trying another word");
        self.play_turn(&syllable, false);
    }

    fn on_correct_word(&mut self, player: PeerId, bonus_letters: Option<Vec<(char, u32)>>) {
        if self.identity == Some(player)
            && let Some(counts) = bonus_letters
        {
            self.bonus.update(counts);
            self.log_alphabet_progress();
        }

        if let Some(word) = self.player_words.get(&player).cloned() {
            let normalized = self.dictionary.normalize(&word);
            self.solver.mark_used(normalized);
            self.dictionary.learn(&word);
        }
    }

    fn on_milestone(&mut self, milestone: Milestone) {
        match milestone {
            Milestone::Seating { bonus_alphabet } => {
                self.cancel_turn();
                if let Some(counts) = bonus_alphabet {
                    self.set_bonus_alphabet(counts);
                }
                self.solver.reset_used();
                self.player_words.clear();
                self.last_syllable = None;
                self.last_attempt = None;
                self.save_dictionary();
                self.log.info("[RESET] Back in the lobby, used words cleared");

                if self.config.autojoin {
                    self.log.info("[AUTOJOIN] Joining the next round");
                    self.send(Outbound::join_round());
                }
            }
            Milestone::Round {
                current_player,
                syllable,
            } => {
                self.cancel_turn();
                if current_player.is_none() || current_player != self.identity {
                    return;
                }
                let Some(syllable) = syllable else {
                    self.log.warn("[START] Round starts with me but has no syllable");
                    return;
                };
                self.log
                    .info(&format!("[START] I open the round | syllable '{syllable}'"));
                self.begin_turn(syllable);
            }
            Milestone::Other(name) => {
                self.log.debug(&format!("[MILESTONE] {name}"));
            }
        }
    }

    /// Picks what to send for `syllable` and starts typing it.
    fn play_turn(&mut self, syllable: &str, think: bool) {
        self.cancel_turn();

        let text = if let Some(phrase) = self.custom_phrase.take() {
            self.log
                .info(&format!("[CHAT] Sending custom phrase: {phrase}"));
            self.last_attempt = None;
            phrase
        } else if self.config.suicide {
            self.log
                .warn(&format!("[SUICIDE] Self-elimination on, sending {ESCAPE_PHRASE}"));
            self.last_attempt = None;
            ESCAPE_PHRASE.to_string()
        } else {
            match self
                .solver
                .solve(&self.dictionary, &self.bonus, syllable)
            {
                Some(word) => {
                    self.log.info(&format!("[SOLVE] Found: {word}"));
                    self.last_attempt = Some(word.clone());
                    word
                }
                None => {
                    self.log
                        .warn(&format!("[FAIL] No word contains '{syllable}'"));
                    self.last_attempt = None;
                    return;
                }
            }
        };

        let think = think.then(|| self.config.start_delay.sample(&mut self.rng));
        if let Some(delay) = think {
            self.log
                .info(&format!("[THINK] Thinking for {:.2}s", delay.as_secs_f64()));
        }
        let script = TurnScript {
            text,
            think,
            delays: self.config.typing_delay,
            rng: StdRng::seed_from_u64(self.rng.next_u64()),
        };
        self.spawn_turn(script);
    }

    fn spawn_turn(&mut self, script: TurnScript) {
        let Some(outbox) = self.outbox.clone() else {
            self.log.warn("[TURN] No connection to type into");
            return;
        };
        let (cancel, token) = cancel_pair();
        let log = self.log.clone();
        let task = tokio::spawn(async move {
            match script.play(outbox, token).await {
                Ok(()) => {}
                Err(TypingError::Cancelled) => log.debug("[TURN] Typing cancelled"),
                Err(TypingError::Closed) => log.warn("[TURN] Connection closed while typing"),
            }
        });
        self.turn = Some(ActiveTurn { cancel, task });
    }

    fn cancel_turn(&mut self) {
        if let Some(turn) = self.turn.take() {
            if turn.is_running() {
                self.log.debug("[TURN] Cancelling the turn in flight");
            }
            turn.stop();
        }
    }

    fn set_bonus_alphabet(&mut self, counts: Vec<(char, u32)>) {
        self.bonus.set(counts);
        self.log
            .info(&format!("[BONUS] Bonus alphabet set: {}", self.bonus.progress()));
    }

    fn log_alphabet_progress(&self) {
        if self.solver.strategy() == Strategy::Alphabet && !self.bonus.is_empty() {
            self.log
                .info(&format!("[ALPHABET] {}", self.bonus.progress()));
        }
    }

    fn send(&self, message: Outbound) {
        match &self.outbox {
            Some(outbox) => {
                if outbox.send(message).is_err() {
                    self.log.warn("[SEND] Connection already closed");
                }
            }
            None => self.log.debug("[SEND] No connection, dropping message"),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_turn();
    }
}
