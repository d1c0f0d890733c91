//! Redraw scheduling
//!
//! E-paper refreshes are slow and flash the whole panel, so bursts of events
//! are coalesced: a dirty state is rendered at most once per `min_interval`
//! unless the caller forces it.

use core::time::Duration;

use crate::state::DisplayState;

/// Decides when the panel gets repainted
#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    min_interval: Duration,
    last_render: Option<Duration>,
}

impl RedrawScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_render: None,
        }
    }

    /// Time of the last render attempt, if any
    #[cfg(test)]
    pub fn last_render(&self) -> Option<Duration> {
        self.last_render
    }

    /// Render `state` if it is due
    ///
    /// Returns `Ok(true)` when `render` ran and succeeded. The dirty flag is
    /// only cleared on success; a failed render is retried after the next
    /// interval.
    pub fn maybe_render<E>(
        &mut self,
        state: &mut DisplayState,
        force: bool,
        now: Duration,
        render: impl FnOnce(&DisplayState) -> Result<(), E>,
    ) -> Result<bool, E> {
        if !state.is_dirty() && !force {
            return Ok(false);
        }

        if !force {
            if let Some(last) = self.last_render {
                if now.saturating_sub(last) < self.min_interval {
                    return Ok(false);
                }
            }
        }

        self.last_render = Some(now);
        log::info!("Updating display...");
        render(state)?;
        state.mark_clean();
        log::info!("Display updated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn count(renders: &mut u32) -> impl FnOnce(&DisplayState) -> Result<(), Infallible> + '_ {
        move |_: &DisplayState| {
            *renders += 1;
            Ok(())
        }
    }

    #[test]
    fn clean_state_is_not_rendered() {
        let mut scheduler = RedrawScheduler::new(ms(2000));
        let mut state = DisplayState::new();
        state.mark_clean();
        let mut renders = 0;
        assert_eq!(scheduler.maybe_render(&mut state, false, ms(10_000), count(&mut renders)), Ok(false));
        assert_eq!(renders, 0);
    }

    #[test]
    fn rapid_updates_are_rate_limited() {
        let mut scheduler = RedrawScheduler::new(ms(2000));
        let mut state = DisplayState::new();
        let mut renders = 0;

        assert_eq!(scheduler.maybe_render(&mut state, false, ms(10_000), count(&mut renders)), Ok(true));
        assert!(!state.is_dirty());

        state.mark_dirty();
        assert_eq!(scheduler.maybe_render(&mut state, false, ms(10_500), count(&mut renders)), Ok(false));
        assert!(state.is_dirty());

        assert_eq!(scheduler.maybe_render(&mut state, false, ms(12_100), count(&mut renders)), Ok(true));
        assert!(!state.is_dirty());
        assert_eq!(renders, 2);
    }

    #[test]
    fn force_bypasses_dirty_flag_and_rate_limit() {
        let mut scheduler = RedrawScheduler::new(ms(2000));
        let mut state = DisplayState::new();
        let mut renders = 0;
        scheduler.maybe_render(&mut state, false, ms(5000), count(&mut renders)).unwrap();
        assert_eq!(scheduler.maybe_render(&mut state, true, ms(5100), count(&mut renders)), Ok(true));
        assert_eq!(renders, 2);
        assert_eq!(scheduler.last_render(), Some(ms(5100)));
    }

    #[test]
    fn first_render_is_never_rate_limited() {
        let mut scheduler = RedrawScheduler::new(ms(2000));
        let mut state = DisplayState::new();
        let mut renders = 0;
        assert_eq!(scheduler.maybe_render(&mut state, false, ms(100), count(&mut renders)), Ok(true));
    }

    #[test]
    fn failed_render_keeps_state_dirty() {
        let mut scheduler = RedrawScheduler::new(ms(2000));
        let mut state = DisplayState::new();
        let result = scheduler.maybe_render(&mut state, false, ms(100), |_| Err("panel busy"));
        assert_eq!(result, Err("panel busy"));
        assert!(state.is_dirty());
        // still rate limited after the failed attempt
        let mut renders = 0;
        assert_eq!(scheduler.maybe_render(&mut state, false, ms(600), count(&mut renders)), Ok(false));
        assert_eq!(scheduler.maybe_render(&mut state, false, ms(2200), count(&mut renders)), Ok(true));
    }
}
