//! Single-flight session admission.
//!
//! [`SessionGate`] admits at most one command session at a time, whether it
//! was started by the wake listener thread or by typed input. Admission is a
//! single compare-and-swap on a packed state word, so the busy flag and the
//! state can never disagree. There is no queue: a rejected attempt gets
//! `None` and nothing else happens.
//!
//! An admitted session is represented by a [`SessionPermit`]. Dropping the
//! permit (normal return, early return, task abort, or panic unwind)
//! releases the gate and publishes `Idle`.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Observable lifecycle state of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Wake,
    Listening,
    Processing,
}

impl SessionState {
    fn to_word(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Wake => 1,
            Self::Listening => 2,
            Self::Processing => 3,
        }
    }

    fn from_word(word: u8) -> Self {
        match word {
            1 => Self::Wake,
            2 => Self::Listening,
            3 => Self::Processing,
            _ => Self::Idle,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Wake => "wake",
            Self::Listening => "listening",
            Self::Processing => "processing",
        }
    }
}

/// Channel a command came in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Voice,
    Text,
}

impl Origin {
    /// First state a session from this origin enters.
    ///
    /// Typed input has nothing to listen for and starts in `Processing`.
    fn initial_state(self) -> SessionState {
        match self {
            Self::Voice => SessionState::Wake,
            Self::Text => SessionState::Processing,
        }
    }
}

/// Callback invoked on every state transition. Must not block.
pub type StateObserver = Arc<dyn Fn(SessionState) + Send + Sync>;

/// Admits at most one active session.
pub struct SessionGate {
    /// `0` = idle; any other value = busy in that [`SessionState`].
    word: AtomicU8,
    observer: Option<StateObserver>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            word: AtomicU8::new(SessionState::Idle.to_word()),
            observer: None,
        }
    }

    /// Attach a state observer.
    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Try to start a session. Returns `None` if one is already active.
    pub fn try_open(self: &Arc<Self>, origin: Origin) -> Option<SessionPermit> {
        let initial = origin.initial_state();
        match self.word.compare_exchange(
            SessionState::Idle.to_word(),
            initial.to_word(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                let permit = SessionPermit {
                    gate: Arc::clone(self),
                    id: Uuid::new_v4(),
                    origin,
                };
                info!(session = %permit.id, ?origin, "session opened");
                self.notify(initial);
                Some(permit)
            }
            Err(current) => {
                debug!(
                    ?origin,
                    state = SessionState::from_word(current).as_str(),
                    "session rejected: gate busy"
                );
                None
            }
        }
    }

    /// Whether a session is active.
    pub fn is_busy(&self) -> bool {
        self.state() != SessionState::Idle
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        SessionState::from_word(self.word.load(Ordering::Acquire))
    }

    fn release(&self, id: Uuid) {
        self.word
            .store(SessionState::Idle.to_word(), Ordering::Release);
        info!(session = %id, "session closed");
        self.notify(SessionState::Idle);
    }

    /// Deliver a state to the observer. A panicking observer is logged and
    /// otherwise ignored.
    fn notify(&self, state: SessionState) {
        if let Some(observer) = &self.observer
            && catch_unwind(AssertUnwindSafe(|| observer(state))).is_err()
        {
            warn!(state = state.as_str(), "session state observer panicked");
        }
    }
}

/// Proof of an admitted session. Releases the gate on drop.
pub struct SessionPermit {
    gate: Arc<SessionGate>,
    id: Uuid,
    origin: Origin,
}

impl SessionPermit {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn state(&self) -> SessionState {
        self.gate.state()
    }

    /// Move the session forward to `state` and publish it.
    ///
    /// States only move forward (`wake → listening → processing`); a
    /// backward or idle transition is ignored.
    pub fn advance(&self, state: SessionState) {
        let current = self.gate.state();
        if state == SessionState::Idle || state.to_word() <= current.to_word() {
            debug!(
                session = %self.id,
                from = current.as_str(),
                to = state.as_str(),
                "ignoring non-forward session transition"
            );
            return;
        }
        self.gate.word.store(state.to_word(), Ordering::Release);
        debug!(session = %self.id, state = state.as_str(), "session state");
        self.gate.notify(state);
    }

    /// End the session explicitly. Equivalent to dropping the permit.
    pub fn close(self) {}
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        self.gate.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn recording_gate() -> (Arc<SessionGate>, Arc<Mutex<Vec<SessionState>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let gate = SessionGate::new().with_observer(Arc::new(move |state| {
            sink.lock().unwrap().push(state);
        }));
        (Arc::new(gate), seen)
    }

    #[test]
    fn voice_session_publishes_full_sequence() {
        let (gate, seen) = recording_gate();
        let permit = gate.try_open(Origin::Voice).expect("admitted");
        permit.advance(SessionState::Listening);
        permit.advance(SessionState::Processing);
        permit.close();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                SessionState::Wake,
                SessionState::Listening,
                SessionState::Processing,
                SessionState::Idle,
            ]
        );
        assert!(!gate.is_busy());
    }

    #[test]
    fn text_session_skips_to_processing() {
        let (gate, seen) = recording_gate();
        let permit = gate.try_open(Origin::Text).expect("admitted");
        assert_eq!(permit.state(), SessionState::Processing);
        drop(permit);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SessionState::Processing, SessionState::Idle]
        );
    }

    #[test]
    fn second_open_rejected_while_busy() {
        let (gate, seen) = recording_gate();
        let permit = gate.try_open(Origin::Voice).expect("admitted");
        assert!(gate.try_open(Origin::Text).is_none());
        assert!(gate.try_open(Origin::Voice).is_none());
        // Rejections publish nothing.
        assert_eq!(*seen.lock().unwrap(), vec![SessionState::Wake]);
        drop(permit);
        assert!(gate.try_open(Origin::Text).is_some());
    }

    #[test]
    fn backward_transition_ignored() {
        let (gate, seen) = recording_gate();
        let permit = gate.try_open(Origin::Text).expect("admitted");
        permit.advance(SessionState::Listening);
        permit.advance(SessionState::Idle);
        assert_eq!(permit.state(), SessionState::Processing);
        assert!(gate.is_busy());
        drop(permit);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SessionState::Processing, SessionState::Idle]
        );
    }

    #[test]
    fn panic_inside_session_still_releases() {
        let gate = Arc::new(SessionGate::new());
        let inner = Arc::clone(&gate);
        let result = std::thread::spawn(move || {
            let _permit = inner.try_open(Origin::Voice).expect("admitted");
            panic!("handler failed");
        })
        .join();
        assert!(result.is_err());
        assert!(!gate.is_busy());
    }

    #[test]
    fn panicking_observer_does_not_poison_gate() {
        let gate = Arc::new(SessionGate::new().with_observer(Arc::new(|_| panic!("bad ui"))));
        let permit = gate.try_open(Origin::Text).expect("admitted");
        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_open(Origin::Voice).is_some());
    }

    #[test]
    fn concurrent_triggers_admit_exactly_one() {
        for _ in 0..50 {
            let gate = Arc::new(SessionGate::new());
            let barrier = Arc::new(std::sync::Barrier::new(8));
            let admitted = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let gate = Arc::clone(&gate);
                    let barrier = Arc::clone(&barrier);
                    let admitted = Arc::clone(&admitted);
                    std::thread::spawn(move || {
                        let origin = if i % 2 == 0 { Origin::Voice } else { Origin::Text };
                        barrier.wait();
                        gate.try_open(origin).inspect(|_| {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        })
                    })
                })
                .collect();

            // Hold every permit until all threads are done so a fast
            // release cannot let a second opener in.
            let permits: Vec<_> = handles
                .into_iter()
                .filter_map(|h| h.join().expect("thread"))
                .collect();
            assert_eq!(permits.len(), 1);
            assert_eq!(admitted.load(Ordering::SeqCst), 1);
        }
    }
}
