//! Inbound event handling
//!
//! Payloads are JSON objects with the optional keys `state` (preferred) or
//! `mood`, `activity` and `message`. Unknown keys are ignored.

use core::time::Duration;

use serde_json::Value;

use crate::mood::Mood;
use crate::state::{DisplayState, NEW_MESSAGE_ACTIVITY};

/// Why a payload was rejected
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Fields extracted from one inbound payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundEvent {
    /// Mood token, `state` taking priority over `mood`
    pub mood: Option<String>,
    pub activity: Option<String>,
    pub message: Option<String>,
}

impl InboundEvent {
    /// Parse a payload
    ///
    /// Any valid JSON is accepted. Documents that are not objects, and keys
    /// whose values are not strings, simply contribute nothing.
    pub fn parse(payload: &[u8]) -> Result<Self, IngestError> {
        let doc: Value = serde_json::from_slice(payload)?;
        let text = |key: &str| doc.get(key).and_then(Value::as_str).map(str::to_owned);

        Ok(Self {
            mood: text("state").or_else(|| text("mood")),
            activity: text("activity"),
            message: text("message"),
        })
    }

    /// Apply this event to `state`
    ///
    /// A non-empty message sets the "new message" activity first, so an
    /// explicit activity in the same event wins.
    pub fn apply(&self, state: &mut DisplayState, now: Duration) {
        if let Some(mood) = self.mood.as_deref() {
            state.set_mood(Mood::from_name(Some(mood)));
        }

        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            state.set_message(message);
            state.set_activity(NEW_MESSAGE_ACTIVITY);
        }

        if let Some(activity) = &self.activity {
            state.set_activity(activity.as_str());
        }

        state.touch_event_time(now);
    }
}

/// Parse `payload` and fold it into `state`
///
/// Malformed payloads are logged and leave `state` untouched.
pub fn ingest(state: &mut DisplayState, payload: &[u8], now: Duration) -> Result<(), IngestError> {
    let event = match InboundEvent::parse(payload) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("Dropping payload: {}", e);
            return Err(e);
        }
    };

    event.apply(state, now);
    log::info!(
        "State updated: mood={}, msg={}",
        state.mood(),
        state.message()
    );
    Ok(())
}
