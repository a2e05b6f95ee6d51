use thiserror::Error;
use tracing::debug;

use crate::link::BtState;

/// Rejected connection-state transition.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
#[error("no transition from `{from}` to `{to}`")]
pub struct TransitionError {
    pub from: BtState,
    pub to: BtState,
}

/// Classic connection state with the allowed edges enforced.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct ConnectionState {
    current: BtState,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            current: BtState::Disconnected,
        }
    }
}

impl ConnectionState {
    pub(crate) fn current(self) -> BtState {
        self.current
    }

    /// Whether `from -> to` is an edge of the state machine.
    pub(crate) fn allows(from: BtState, to: BtState) -> bool {
        matches!(
            (from, to),
            (BtState::Disconnected, BtState::Discoverable)
                | (BtState::Discoverable, BtState::Connecting)
                | (BtState::Connecting, BtState::Connected)
                | (
                    BtState::Discoverable | BtState::Connecting | BtState::Connected,
                    BtState::Disconnected
                )
        )
    }

    /// Moves to `to`. Returns `Ok(false)` when already there.
    pub(crate) fn transition(&mut self, to: BtState) -> Result<bool, TransitionError> {
        if self.current == to {
            return Ok(false);
        }
        if !Self::allows(self.current, to) {
            return Err(TransitionError {
                from: self.current,
                to,
            });
        }
        debug!(from = %self.current, %to, "connection state changed");
        self.current = to;
        Ok(true)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn starts_disconnected() {
        assert_eq!(BtState::Disconnected, ConnectionState::default().current());
    }

    #[test]
    fn walks_the_connect_path() {
        let mut state = ConnectionState::default();
        for next in [
            BtState::Discoverable,
            BtState::Connecting,
            BtState::Connected,
            BtState::Disconnected,
            BtState::Discoverable,
        ] {
            assert_eq!(Ok(true), state.transition(next));
        }
        assert_eq!(BtState::Discoverable, state.current());
    }

    #[test]
    fn repeated_state_is_not_a_change() {
        let mut state = ConnectionState::default();
        assert_eq!(Ok(false), state.transition(BtState::Disconnected));
    }

    #[rstest]
    #[case(BtState::Disconnected, BtState::Connecting)]
    #[case(BtState::Disconnected, BtState::Connected)]
    #[case(BtState::Discoverable, BtState::Connected)]
    #[case(BtState::Connected, BtState::Discoverable)]
    #[case(BtState::Connected, BtState::Connecting)]
    fn rejects_edges_outside_the_machine(#[case] from: BtState, #[case] to: BtState) {
        assert!(!ConnectionState::allows(from, to));
    }

    #[test]
    fn rejected_transition_keeps_state() {
        let mut state = ConnectionState::default();
        assert_matches!(
            state.transition(BtState::Connected),
            Err(TransitionError {
                from: BtState::Disconnected,
                to: BtState::Connected,
            })
        );
        assert_eq!(BtState::Disconnected, state.current());
    }

    #[test]
    fn every_state_can_reach_disconnected_except_itself() {
        let reachable = BtState::iter()
            .filter(|from| ConnectionState::allows(*from, BtState::Disconnected))
            .count();
        assert_eq!(3, reachable);
    }
}
