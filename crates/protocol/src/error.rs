//! Errors raised while decoding broadcast payloads.
//!
//! Replicated *state* never errors (missing or garbled fields fall back to
//! safe defaults). Only the discrete broadcast events are strict.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown broadcast event `{0}`")]
    UnknownEvent(String),

    #[error("{event}: payload is not an object")]
    NotAnObject { event: &'static str },

    #[error("{event}: missing field `{field}`")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },

    #[error("{event}: field `{field}` has the wrong shape")]
    WrongShape {
        event: &'static str,
        field: &'static str,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
