//! Session supervisor.
//!
//! [`Assistant`] owns the session gate, the router and the speech seams.
//! Wake detections and typed input both go through [`Assistant::trigger_wake`]
//! / [`Assistant::submit_text`]; each admitted session runs as its own tokio
//! task and is returned as a [`SessionHandle`]. A rejected trigger returns
//! `None` and has no other effect.

use std::sync::{Arc, Mutex, PoisonError};

use orbit_apps::ApplicationRegistry;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OrbitConfig;
use crate::error::Result;
use crate::intent::IntentClassifier;
use crate::router::{CommandRouter, NOT_CAUGHT, Reply};
use crate::runtime::AssistantEvent;
use crate::session::{Origin, SessionGate, SessionPermit, SessionState};
use crate::skills::SkillSet;
use crate::speech::{SpeechCapture, SpeechOutput};
use crate::wakeword::{WakeListener, WakeTrigger};

/// External collaborators the assistant drives.
pub struct Collaborators {
    pub classifier: Arc<dyn IntentClassifier>,
    pub skills: Arc<dyn SkillSet>,
    pub registry: Arc<ApplicationRegistry>,
    pub capture: Arc<dyn SpeechCapture>,
    pub speech: Arc<dyn SpeechOutput>,
    /// Event channel, usually from [`crate::runtime::event_channel`].
    pub events: broadcast::Sender<AssistantEvent>,
}

struct Inner {
    config: OrbitConfig,
    gate: Arc<SessionGate>,
    router: Mutex<CommandRouter>,
    capture: Arc<dyn SpeechCapture>,
    speech: Arc<dyn SpeechOutput>,
    events: broadcast::Sender<AssistantEvent>,
    runtime: tokio::runtime::Handle,
    last_response: Mutex<Option<String>>,
    shutdown: CancellationToken,
}

/// The assistant core. Cheap to clone; clones share one gate.
#[derive(Clone)]
pub struct Assistant {
    inner: Arc<Inner>,
}

/// A running session.
pub struct SessionHandle {
    id: Uuid,
    origin: Origin,
    cancel: CancellationToken,
    task: JoinHandle<Option<String>>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Cancel the session. The gate is released once the task unwinds.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session; yields the spoken reply, or `None` if the
    /// session was cancelled or failed.
    pub async fn join(self) -> Option<String> {
        match self.task.await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session = %self.id, error = %e, "session task failed");
                None
            }
        }
    }
}

impl Assistant {
    /// Build the assistant. Sessions are spawned on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(
        config: OrbitConfig,
        parts: Collaborators,
        runtime: tokio::runtime::Handle,
    ) -> Result<Self> {
        config.validate()?;

        let events = parts.events;
        let state_events = events.clone();
        let gate = Arc::new(SessionGate::new().with_observer(Arc::new(
            move |state: SessionState| {
                let _ = state_events.send(AssistantEvent::StateChanged(state));
            },
        )));

        parts.speech.set_muted(config.speech.muted);
        let router = CommandRouter::new(parts.classifier, parts.skills, parts.registry, &config);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                gate,
                router: Mutex::new(router),
                capture: parts.capture,
                speech: parts.speech,
                events,
                runtime,
                last_response: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Subscribe to assistant events.
    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.gate.state()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_busy()
    }

    /// Most recent spoken reply.
    pub fn last_response(&self) -> Option<String> {
        self.inner
            .last_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.inner.config
    }

    /// Start a voice session: acknowledge, listen for one command, handle it.
    pub fn trigger_wake(&self) -> Option<SessionHandle> {
        let permit = self.inner.gate.try_open(Origin::Voice)?;
        let inner = Arc::clone(&self.inner);
        Some(self.spawn_session(permit, move |permit, cancel| {
            voice_turn(inner, permit, cancel)
        }))
    }

    /// Start a session for typed `text`.
    pub fn submit_text(&self, text: &str) -> Option<SessionHandle> {
        let permit = self.inner.gate.try_open(Origin::Text)?;
        let inner = Arc::clone(&self.inner);
        let text = text.to_owned();
        Some(self.spawn_session(permit, move |permit, cancel| {
            text_turn(inner, permit, cancel, text)
        }))
    }

    /// Run `turn` as a task. The turn owns the permit: the gate is released
    /// when the turn completes or is dropped, unless routing work on the
    /// blocking pool still holds it.
    fn spawn_session<F, Fut>(&self, permit: SessionPermit, turn: F) -> SessionHandle
    where
        F: FnOnce(SessionPermit, CancellationToken) -> Fut,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        let id = permit.id();
        let origin = permit.origin();
        let cancel = self.inner.shutdown.child_token();
        let token = cancel.clone();
        let turn = turn(permit, cancel.clone());
        let task = self.inner.runtime.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(session = %id, "session cancelled");
                    None
                }
                reply = turn => reply,
            }
        });
        SessionHandle {
            id,
            origin,
            cancel,
            task,
        }
    }

    /// Stop speech output immediately.
    pub fn stop_speaking(&self) {
        self.inner.speech.stop();
    }

    /// Flip mute and return the new state.
    pub fn toggle_mute(&self) -> bool {
        let muted = !self.inner.speech.is_muted();
        self.inner.speech.set_muted(muted);
        muted
    }

    /// Start the background wake listener. Detections call
    /// [`Assistant::trigger_wake`]; detections while busy are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener thread cannot be started.
    pub fn start_wake_listener(&self) -> Result<WakeListener> {
        let trigger = WakeTrigger::new(Arc::clone(&self.inner.capture), &self.inner.config.wake);
        let assistant = self.clone();
        trigger.spawn(move || {
            if assistant.trigger_wake().is_none() {
                debug!("wake ignored: session already active");
            }
        })
    }

    /// Cancel every running session.
    pub fn shutdown(&self) {
        info!("assistant shutting down");
        self.inner.shutdown.cancel();
        self.inner.speech.stop();
    }
}

// ── Session turns ───────────────────────────────────────────────────────

async fn voice_turn(
    inner: Arc<Inner>,
    permit: SessionPermit,
    cancel: CancellationToken,
) -> Option<String> {
    inner.speech.speak(&inner.config.wake.acknowledgement);
    permit.advance(SessionState::Listening);

    let capture = Arc::clone(&inner.capture);
    let heard = tokio::task::spawn_blocking(move || capture.listen_once(None)).await;
    let text = match heard {
        Ok(Ok(Some(text))) if !text.trim().is_empty() => text,
        Ok(Ok(_)) => {
            debug!(session = %permit.id(), "nothing heard");
            return Some(deliver(&inner, Reply::say(NOT_CAUGHT)));
        }
        Ok(Err(e)) => {
            warn!(session = %permit.id(), error = %e, "command capture failed");
            return Some(deliver(&inner, Reply::say(NOT_CAUGHT)));
        }
        Err(e) => {
            warn!(session = %permit.id(), error = %e, "command capture task failed");
            return Some(deliver(&inner, Reply::say(NOT_CAUGHT)));
        }
    };

    permit.advance(SessionState::Processing);
    route(&inner, permit, cancel, text, Origin::Voice).await
}

async fn text_turn(
    inner: Arc<Inner>,
    permit: SessionPermit,
    cancel: CancellationToken,
    text: String,
) -> Option<String> {
    debug!(session = %permit.id(), "handling typed input");
    route(&inner, permit, cancel, text, Origin::Text).await
}

/// Route `text` on the blocking pool.
///
/// The permit moves into the blocking task and comes back with the reply.
/// A cancelled session stops waiting, but the gate stays busy until the
/// router is done, so no skill runs after `Idle` is published.
async fn route(
    inner: &Arc<Inner>,
    permit: SessionPermit,
    cancel: CancellationToken,
    text: String,
    origin: Origin,
) -> Option<String> {
    let _ = inner.events.send(AssistantEvent::UserInput {
        origin,
        text: text.clone(),
    });

    let worker = Arc::clone(inner);
    let handled = tokio::task::spawn_blocking(move || {
        let mut router = worker
            .router
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if cancel.is_cancelled() {
            debug!(session = %permit.id(), "cancelled before routing");
            return (None, permit);
        }
        (Some(router.handle(&text, origin)), permit)
    })
    .await;

    match handled {
        Ok((Some(reply), _permit)) => Some(deliver(inner, reply)),
        Ok((None, _permit)) => None,
        Err(e) => {
            warn!(error = %e, "command handling failed");
            None
        }
    }
}

/// Publish a reply and queue it for speech. Returns the spoken text.
fn deliver(inner: &Inner, reply: Reply) -> String {
    *inner
        .last_response
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(reply.spoken.clone());

    let _ = inner.events.send(AssistantEvent::Response {
        text: reply.spoken.clone(),
    });
    for line in reply.lines {
        let _ = inner.events.send(AssistantEvent::Message { text: line });
    }
    if reply.directory_changed {
        let _ = inner.events.send(AssistantEvent::DirectoryChanged);
    }

    inner.speech.speak(&reply.spoken);
    reply.spoken
}
