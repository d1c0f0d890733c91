//! Display state
//!
//! The one mutable record the whole firmware revolves around. Every mutator
//! marks the state dirty; only a completed render clears it.

use core::time::Duration;

use crate::layout::truncate_with_ellipsis;
use crate::mood::Mood;

/// Longest message kept, in characters
pub const MAX_MESSAGE_CHARS: usize = 288;

/// Activity shown before the first event arrives
pub const DEFAULT_ACTIVITY: &str = "Waiting for messages...";
/// Activity set when a message arrives without an explicit activity
pub const NEW_MESSAGE_ACTIVITY: &str = "New message received";
/// Activity set when the idle timeout puts the device to sleep
pub const SLEEPING_ACTIVITY: &str = "Zzz...";
/// Activity set after the broker connection comes up
pub const CONNECTED_ACTIVITY: &str = "Connected to MQTT";

/// What the panel should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    mood: Mood,
    activity: String,
    message: String,
    last_event: Duration,
    battery_percent: u8,
    dirty: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            mood: Mood::Idle,
            activity: DEFAULT_ACTIVITY.to_string(),
            message: String::new(),
            last_event: Duration::ZERO,
            battery_percent: 100,
            dirty: true,
        }
    }
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Time since boot of the last accepted event
    pub fn last_event(&self) -> Duration {
        self.last_event
    }

    pub fn battery_percent(&self) -> u8 {
        self.battery_percent
    }

    /// Whether something changed since the last render
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_mood(&mut self, mood: Mood) {
        self.mood = mood;
        self.dirty = true;
    }

    pub fn set_activity(&mut self, activity: impl Into<String>) {
        self.activity = activity.into();
        self.dirty = true;
    }

    /// Store a message, cutting it to [`MAX_MESSAGE_CHARS`] with an ellipsis
    pub fn set_message(&mut self, message: &str) {
        self.message = truncate_with_ellipsis(message, MAX_MESSAGE_CHARS).into_owned();
        self.dirty = true;
    }

    /// Store a battery reading, clamped to 0..=100
    ///
    /// Returns whether the stored value changed. An unchanged value leaves the
    /// dirty flag alone so a steady battery does not cause refreshes.
    pub fn set_battery(&mut self, percent: i32) -> bool {
        let clamped = percent.clamp(0, 100) as u8;
        if clamped == self.battery_percent {
            return false;
        }
        self.battery_percent = clamped;
        self.dirty = true;
        true
    }

    /// Record `now` as the time of the latest event
    pub fn touch_event_time(&mut self, now: Duration) {
        self.last_event = now;
        self.dirty = true;
    }

    /// Switch to the sleeping mood unless already there
    pub fn mark_sleeping(&mut self) -> bool {
        if self.mood == Mood::Sleeping {
            return false;
        }
        self.mood = Mood::Sleeping;
        self.activity = SLEEPING_ACTIVITY.to_string();
        self.dirty = true;
        true
    }

    /// Force a repaint without changing any field
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ELLIPSIS;

    fn clean_state() -> DisplayState {
        let mut state = DisplayState::new();
        state.mark_clean();
        state
    }

    #[test]
    fn defaults_force_the_first_render() {
        let state = DisplayState::new();
        assert_eq!(state.mood(), Mood::Idle);
        assert_eq!(state.activity(), DEFAULT_ACTIVITY);
        assert_eq!(state.message(), "");
        assert_eq!(state.battery_percent(), 100);
        assert!(state.is_dirty());
    }

    #[test]
    fn mutators_mark_dirty() {
        let mut state = clean_state();
        state.set_mood(Mood::Alert);
        assert!(state.is_dirty());

        let mut state = clean_state();
        state.set_activity("busy");
        assert!(state.is_dirty());

        let mut state = clean_state();
        state.set_message("hello");
        assert!(state.is_dirty());

        let mut state = clean_state();
        state.touch_event_time(Duration::from_secs(3));
        assert!(state.is_dirty());
        assert_eq!(state.last_event(), Duration::from_secs(3));
    }

    #[test]
    fn battery_is_clamped() {
        let mut state = clean_state();
        assert!(!state.set_battery(150), "150 clamps to the stored 100");
        assert!(state.set_battery(-7));
        assert_eq!(state.battery_percent(), 0);
        state.set_battery(250);
        assert_eq!(state.battery_percent(), 100);
    }

    #[test]
    fn repeated_battery_reading_does_not_redraw() {
        let mut state = clean_state();
        assert!(state.set_battery(55));
        state.mark_clean();
        assert!(!state.set_battery(55));
        assert!(!state.is_dirty());
        // 120 and 100 clamp to the same value
        state.set_battery(120);
        state.mark_clean();
        assert!(!state.set_battery(100));
        assert!(!state.is_dirty());
    }

    #[test]
    fn long_message_is_truncated_to_288() {
        let mut state = DisplayState::new();
        let input = "m".repeat(301);
        state.set_message(&input);
        assert_eq!(state.message().chars().count(), MAX_MESSAGE_CHARS);
        assert!(state.message().ends_with(ELLIPSIS));
        assert_eq!(&state.message()[..285], &input[..285]);
    }

    #[test]
    fn message_at_limit_is_kept_verbatim() {
        let mut state = DisplayState::new();
        let input = "k".repeat(MAX_MESSAGE_CHARS);
        state.set_message(&input);
        assert_eq!(state.message(), input);
    }

    #[test]
    fn sleeping_is_idempotent() {
        let mut state = clean_state();
        assert!(state.mark_sleeping());
        assert_eq!(state.mood(), Mood::Sleeping);
        assert_eq!(state.activity(), SLEEPING_ACTIVITY);
        state.mark_clean();
        assert!(!state.mark_sleeping());
        assert!(!state.is_dirty());
    }
}
