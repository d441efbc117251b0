//! Human-like typing: the word goes out as growing prefixes with a random
//! pause after each character, then as a final submit.
//!
//! Every pause is a cancellation point. Once the turn's `CancelHandle` fires
//! (or is dropped) the task emits nothing further.

use crate::config::DelayRange;
use crate::protocol::Outbound;
use rand::rngs::StdRng;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

pub type Outbox = mpsc::UnboundedSender<Outbound>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypingError {
    #[error("typing cancelled")]
    Cancelled,
    #[error("connection closed while typing")]
    Closed,
}

/// Session side of a turn's cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Task side of a turn's cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once cancelled or once the handle is gone.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Sleeps for `duration` unless cancelled first.
pub async fn pause(duration: Duration, cancel: &mut CancelToken) -> Result<(), TypingError> {
    if cancel.is_cancelled() {
        return Err(TypingError::Cancelled);
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = cancel.cancelled() => Err(TypingError::Cancelled),
    }
}

/// Every prefix of `text`, shortest first, split on characters.
pub fn prefixes(text: &str) -> impl Iterator<Item = String> + '_ {
    text.char_indices()
        .map(move |(i, c)| text[..i + c.len_utf8()].to_string())
}

fn send(outbox: &Outbox, message: Outbound) -> Result<(), TypingError> {
    outbox.send(message).map_err(|_| TypingError::Closed)
}

/// Types `text` prefix by prefix and submits it.
pub async fn type_and_submit(
    text: &str,
    delays: DelayRange,
    rng: &mut StdRng,
    outbox: &Outbox,
    cancel: &mut CancelToken,
) -> Result<(), TypingError> {
    for prefix in prefixes(text) {
        if cancel.is_cancelled() {
            return Err(TypingError::Cancelled);
        }
        send(outbox, Outbound::type_text(prefix))?;
        pause(delays.sample(rng), cancel).await?;
    }
    if cancel.is_cancelled() {
        return Err(TypingError::Cancelled);
    }
    send(outbox, Outbound::submit(text))
}

/// Everything a turn task needs once the session has decided what to send.
#[derive(Debug)]
pub struct TurnScript {
    pub text: String,
    /// Pause before the first character; `None` on retries.
    pub think: Option<Duration>,
    pub delays: DelayRange,
    pub rng: StdRng,
}

impl TurnScript {
    pub async fn play(mut self, outbox: Outbox, mut cancel: CancelToken) -> Result<(), TypingError> {
        if let Some(think) = self.think {
            pause(think, &mut cancel).await?;
        }
        type_and_submit(&self.text, self.delays, &mut self.rng, &outbox, &mut cancel).await
    }
}
