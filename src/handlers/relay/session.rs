//! Per-session relay context.
//!
//! Each client connection owns exactly one of these; sessions share no
//! mutable state. The close flags make symmetric teardown idempotent:
//! closing either side closes the other exactly once, regardless of close
//! order or duplicate close events.

use uuid::Uuid;

/// Tracks which transport halves have been closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloseState {
    client_closed: bool,
    upstream_closed: bool,
}

impl CloseState {
    /// Mark the client side closed. Returns `true` only on the transition
    /// from open to closed, i.e. when a close frame still needs to be sent.
    pub fn mark_client(&mut self) -> bool {
        let was_open = !self.client_closed;
        self.client_closed = true;
        was_open
    }

    /// Mark the upstream side closed. Same transition semantics as
    /// [`CloseState::mark_client`].
    pub fn mark_upstream(&mut self) -> bool {
        let was_open = !self.upstream_closed;
        self.upstream_closed = true;
        was_open
    }
}

/// Context threaded through one relay session.
#[derive(Debug)]
pub struct RelaySession {
    pub id: Uuid,
    pub close: CloseState,
}

impl RelaySession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            close: CloseState::default(),
        }
    }
}

impl Default for RelaySession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_is_idempotent_per_side() {
        let mut state = CloseState::default();
        assert!(state.mark_client());
        assert!(!state.mark_client());
        assert!(!state.mark_client());

        assert!(state.mark_upstream());
        assert!(!state.mark_upstream());
    }

    #[test]
    fn test_close_order_does_not_matter() {
        let mut state = CloseState::default();
        assert!(state.mark_upstream());
        assert!(state.mark_client());

        // Duplicate close events after full teardown stay no-ops.
        assert!(!state.mark_client());
        assert!(!state.mark_upstream());
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        assert_ne!(RelaySession::new().id, RelaySession::new().id);
    }
}
