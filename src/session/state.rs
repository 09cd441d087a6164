//! Session protocol state machine.

/// Protocol state of one connected chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connected but no nickname claimed yet.
    #[default]
    Unidentified,
    /// A nickname has been claimed; chat messages are routed.
    Identified,
    /// The channel closed or failed. Terminal.
    Closed,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Unidentified -> Identified
    /// - Identified -> Identified (nickname change)
    /// - Unidentified -> Closed
    /// - Identified -> Closed
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Unidentified, Identified)
                | (Identified, Identified)
                | (Unidentified, Closed)
                | (Identified, Closed)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `true` if the transition was applied. The state is left
    /// unchanged otherwise.
    pub fn transition_to(&mut self, target: SessionState) -> bool {
        if self.can_transition_to(target) {
            *self = target;
            true
        } else {
            false
        }
    }

    /// Check if plain chat lines (and private messages) may be sent.
    pub fn can_chat(&self) -> bool {
        matches!(self, SessionState::Identified)
    }
}
