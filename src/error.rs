// Error types for the dictionary store and the wire protocol

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing a dictionary file
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("no dictionary loaded yet")]
    NotLoaded,

    #[error("failed to read dictionary {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write dictionary {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Inbound frames that could not be turned into a `GameEvent`
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no string \"event\" field")]
    MissingEvent,

    #[error("unknown event kind: {0}")]
    UnknownEvent(String),

    #[error("malformed {event} payload: {reason}")]
    MalformedPayload { event: &'static str, reason: String },
}

impl ProtocolError {
    pub fn malformed(event: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            event,
            reason: reason.into(),
        }
    }
}
