//! Adapter lifecycle state machine
//! Tracks Off/Busy/Ready/Connected and rejects any transition outside the
//! legal table. Observers subscribe to a stream of state values.

use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::core::bluetooth::constants::STATE_CHANNEL_CAPACITY;
use crate::core::bluetooth::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdapterState {
    Off,
    Busy,
    Ready,
    Connected,
}

impl AdapterState {
    /// Whether `self -> next` is in the transition table.
    pub fn can_transition_to(self, next: AdapterState) -> bool {
        use AdapterState::*;
        matches!(
            (self, next),
            (Off, Busy)
                | (Busy, Ready)
                | (Busy, Off)
                | (Busy, Connected)
                | (Ready, Busy)
                | (Ready, Connected)
                | (Connected, Ready)
        )
    }

    /// The error reported to a caller whose operation is not allowed in this state.
    pub fn rejection(self) -> BridgeError {
        match self {
            AdapterState::Off => BridgeError::AdapterOff,
            AdapterState::Busy => BridgeError::AdapterBusy,
            AdapterState::Ready => BridgeError::NotConnected,
            AdapterState::Connected => BridgeError::AlreadyConnected,
        }
    }
}

pub struct AdapterStateMachine {
    state: AdapterState,
    notifier: broadcast::Sender<AdapterState>,
}

impl AdapterStateMachine {
    pub fn new(initial: AdapterState) -> Self {
        let (notifier, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            state: initial,
            notifier,
        }
    }

    pub fn current(&self) -> AdapterState {
        self.state
    }

    /// Fails unless the adapter is Ready.
    pub fn require_ready(&self) -> Result<(), BridgeError> {
        match self.state {
            AdapterState::Ready => Ok(()),
            other => Err(other.rejection()),
        }
    }

    /// Fails while the adapter is Off or Busy.
    pub fn require_available(&self) -> Result<(), BridgeError> {
        match self.state {
            AdapterState::Ready | AdapterState::Connected => Ok(()),
            other => Err(other.rejection()),
        }
    }

    pub fn transition(&mut self, next: AdapterState) -> Result<(), BridgeError> {
        if !self.state.can_transition_to(next) {
            debug!("Rejected adapter transition {:?} -> {:?}", self.state, next);
            return Err(self.state.rejection());
        }
        debug!("Adapter state {:?} -> {:?}", self.state, next);
        self.state = next;
        // No subscribers is fine.
        let _ = self.notifier.send(next);
        Ok(())
    }

    /// Walks the legal path down to Off after the platform powered the radio down.
    pub fn power_lost(&mut self) {
        if self.state == AdapterState::Connected {
            let _ = self.transition(AdapterState::Ready);
        }
        if self.state == AdapterState::Ready {
            let _ = self.transition(AdapterState::Busy);
        }
        if self.state == AdapterState::Busy {
            let _ = self.transition(AdapterState::Off);
        }
    }

    /// Current state followed by every later transition. Each call starts a
    /// fresh sequence; it ends only when the state machine is dropped.
    pub fn subscribe(&self) -> BoxStream<'static, AdapterState> {
        let current = self.state;
        let updates = stream::unfold(self.notifier.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(state) => return Some((state, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Adapter state subscriber lagged, skipped {} updates", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        stream::once(async move { current }).chain(updates).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_table_is_exact() {
        use AdapterState::*;
        let all = [Off, Busy, Ready, Connected];
        let legal = [
            (Off, Busy),
            (Busy, Ready),
            (Busy, Off),
            (Busy, Connected),
            (Ready, Busy),
            (Ready, Connected),
            (Connected, Ready),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn illegal_transition_reports_current_state() {
        let mut machine = AdapterStateMachine::new(AdapterState::Off);
        assert_eq!(
            machine.transition(AdapterState::Connected),
            Err(BridgeError::AdapterOff)
        );
        machine.transition(AdapterState::Busy).unwrap();
        assert_eq!(machine.require_ready(), Err(BridgeError::AdapterBusy));
        machine.transition(AdapterState::Ready).unwrap();
        machine.transition(AdapterState::Connected).unwrap();
        assert_eq!(
            machine.transition(AdapterState::Busy),
            Err(BridgeError::AlreadyConnected)
        );
        assert_eq!(machine.current(), AdapterState::Connected);
    }

    #[test]
    fn power_lost_walks_down_to_off() {
        let mut machine = AdapterStateMachine::new(AdapterState::Ready);
        machine.transition(AdapterState::Connected).unwrap();
        machine.power_lost();
        assert_eq!(machine.current(), AdapterState::Off);
    }

    #[tokio::test]
    async fn subscribers_see_current_then_changes() {
        let mut machine = AdapterStateMachine::new(AdapterState::Off);
        let mut states = machine.subscribe();
        machine.transition(AdapterState::Busy).unwrap();
        machine.transition(AdapterState::Ready).unwrap();

        assert_eq!(states.next().await, Some(AdapterState::Off));
        assert_eq!(states.next().await, Some(AdapterState::Busy));
        assert_eq!(states.next().await, Some(AdapterState::Ready));

        // A second subscription restarts from the current value.
        let mut again = machine.subscribe();
        assert_eq!(again.next().await, Some(AdapterState::Ready));

        drop(machine);
        assert_eq!(states.next().await, None);
    }
}
