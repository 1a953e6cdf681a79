//! Orbit: command orchestration core for a hands-free desktop assistant.
//!
//! A wake phrase or a typed request becomes exactly one in-flight command
//! session:
//!
//! Wake listener / text entry → SessionGate → CommandRouter → skill → speech
//!
//! # Architecture
//!
//! - **Session gate**: single-flight admission with an RAII permit
//! - **Wake listener**: background thread matching transcripts against wake phrases
//! - **Router**: intent classification, dialog replies, skill dispatch
//! - **Dialog**: confirm / cancel / select / undo over one pending action
//! - **Application registry** (`orbit-apps`): TTL-cached, ranked app lookup
//! - **Speech queue**: serialized, interruptible spoken output
//!
//! Speech recognition, synthesis and the trained intent model are supplied
//! by the host through the traits in [`speech`] and [`intent`].

pub mod assistant;
pub mod config;
pub mod dialog;
pub mod error;
pub mod intent;
pub mod router;
pub mod runtime;
pub mod session;
pub mod skills;
pub mod speech;
pub mod wakeword;

pub use assistant::{Assistant, Collaborators, SessionHandle};
pub use config::{ConfirmationPolicy, OrbitConfig};
pub use error::{OrbitError, Result};
pub use intent::{Intent, IntentClassifier, IntentResult, KeywordClassifier};
pub use router::{CommandRouter, Reply};
pub use runtime::AssistantEvent;
pub use session::{Origin, SessionGate, SessionPermit, SessionState};
pub use skills::{SkillCommand, SkillOutcome, SkillSet};
pub use speech::{SpeechCapture, SpeechOutput, SpeechQueue, SpeechSynth};
pub use wakeword::{WakeListener, WakePhraseMatcher, WakeTrigger};
