//! Round state machine for a streaming connection
//!
//! A connection waits for input, processes exactly one round at a time, and
//! ends when the peer leaves or a round fails. The transition function is
//! pure; the streaming adapter owns the current state.

use thiserror::Error;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvState {
    /// Ready for the next inbound message
    AwaitingInput,
    /// A round is in flight; no further input is read
    Processing,
    /// Terminal
    Closed,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A well-formed inbound message arrived
    Inbound,
    /// The round produced a reply
    Replied,
    /// The round failed and the connection must close
    Failed,
    /// The peer closed the connection, or the server is shutting down
    Disconnected,
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A round is already in progress")]
    Busy,
    #[error("Connection is closed")]
    Closed,
    #[error("Invalid transition: {event:?} in {state:?}")]
    Invalid { state: ConvState, event: Event },
}

/// Pure transition function
pub fn transition(state: ConvState, event: Event) -> Result<ConvState, TransitionError> {
    match (state, event) {
        (_, Event::Disconnected) => Ok(ConvState::Closed),
        (ConvState::Closed, _) => Err(TransitionError::Closed),

        (ConvState::AwaitingInput, Event::Inbound) => Ok(ConvState::Processing),
        (ConvState::Processing, Event::Inbound) => Err(TransitionError::Busy),

        (ConvState::Processing, Event::Replied) => Ok(ConvState::AwaitingInput),
        (ConvState::Processing, Event::Failed) => Ok(ConvState::Closed),

        (ConvState::AwaitingInput, event @ (Event::Replied | Event::Failed)) => {
            Err(TransitionError::Invalid { state, event })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let state = transition(ConvState::AwaitingInput, Event::Inbound).unwrap();
        assert_eq!(state, ConvState::Processing);
        let state = transition(state, Event::Replied).unwrap();
        assert_eq!(state, ConvState::AwaitingInput);
    }

    #[test]
    fn test_failure_closes() {
        assert_eq!(
            transition(ConvState::Processing, Event::Failed),
            Ok(ConvState::Closed)
        );
    }

    #[test]
    fn test_disconnect_from_any_state() {
        for state in [
            ConvState::AwaitingInput,
            ConvState::Processing,
            ConvState::Closed,
        ] {
            assert_eq!(transition(state, Event::Disconnected), Ok(ConvState::Closed));
        }
    }

    #[test]
    fn test_one_round_at_a_time() {
        assert_eq!(
            transition(ConvState::Processing, Event::Inbound),
            Err(TransitionError::Busy)
        );
    }

    #[test]
    fn test_closed_is_terminal() {
        for event in [Event::Inbound, Event::Replied, Event::Failed] {
            assert_eq!(
                transition(ConvState::Closed, event),
                Err(TransitionError::Closed)
            );
        }
    }

    #[test]
    fn test_reply_without_round_is_invalid() {
        assert_eq!(
            transition(ConvState::AwaitingInput, Event::Replied),
            Err(TransitionError::Invalid {
                state: ConvState::AwaitingInput,
                event: Event::Replied,
            })
        );
    }
}
