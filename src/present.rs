//! Frame presentation coalescing.
//!
//! libmpv may announce new frames faster than the host can swap buffers. At
//! most one render pass is in flight; notifications arriving meanwhile collapse
//! into a single follow-up pass that starts as soon as the swap completes.

/// Whether a render pass is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentState {
    /// No render pass in flight.
    #[default]
    Idle,
    /// A pass has been issued and its swap has not completed.
    Rendering,
}

/// Coalescing state for one instance, touched only on the dispatch thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presentation {
    state: PresentState,
    pending: bool,
}

impl Presentation {
    /// A presentation with nothing in flight.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: PresentState::Idle,
            pending: false,
        }
    }

    /// New content is available. Returns `true` when the caller must start a
    /// render pass now.
    pub const fn notify(&mut self) -> bool {
        match self.state {
            PresentState::Rendering => {
                self.pending = true;
                false
            }
            PresentState::Idle => {
                self.state = PresentState::Rendering;
                self.pending = false;
                true
            }
        }
    }

    /// The in-flight swap finished. Returns `true` when content arrived during
    /// the pass and the caller must start another one.
    pub const fn present_done(&mut self) -> bool {
        self.state = PresentState::Idle;
        if self.pending { self.notify() } else { false }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PresentState {
        self.state
    }

    /// A pass is in flight.
    #[must_use]
    pub const fn is_rendering(&self) -> bool {
        matches!(self.state, PresentState::Rendering)
    }

    /// Content arrived during the current pass.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_notification_starts_a_pass() {
        let mut presentation = Presentation::new();
        assert!(presentation.notify());
        assert!(presentation.is_rendering());
        assert!(!presentation.present_done());
        assert_eq!(presentation.state(), PresentState::Idle);
    }

    #[test]
    fn notifications_during_a_pass_coalesce_into_one() {
        let mut presentation = Presentation::new();
        assert!(presentation.notify());
        assert!(!presentation.notify());
        assert!(!presentation.notify());
        assert!(presentation.is_pending());

        // Exactly one follow-up pass, then quiet.
        assert!(presentation.present_done());
        assert!(presentation.is_rendering());
        assert!(!presentation.is_pending());
        assert!(!presentation.present_done());
        assert!(!presentation.is_rendering());
    }

    #[test]
    fn stray_completion_is_harmless() {
        let mut presentation = Presentation::new();
        assert!(!presentation.present_done());
        assert!(presentation.notify());
    }
}
