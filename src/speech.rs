//! Speech capture and speech output seams.
//!
//! Recognition and synthesis engines are external; the core sees them
//! through [`SpeechCapture`] and [`SpeechSynth`]. [`SpeechQueue`] wraps a
//! synthesizer in a single worker thread so utterances never overlap, can
//! be interrupted between sentences, and can be muted or replayed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{OrbitError, Result};
use crate::runtime::AssistantEvent;

// ── Capture ─────────────────────────────────────────────────────────────

/// One-shot speech recognition.
pub trait SpeechCapture: Send + Sync {
    /// Capture and transcribe one phrase, waiting at most `phrase_limit`
    /// (unbounded when `None`).
    ///
    /// `Ok(None)` means nothing intelligible was heard.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::Capture`] when the device or recognition
    /// service fails; callers retry after a backoff.
    fn listen_once(&self, phrase_limit: Option<Duration>) -> Result<Option<String>>;
}

/// Capture that never hears anything. For text-only front ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCapture;

impl SpeechCapture for SilentCapture {
    fn listen_once(&self, phrase_limit: Option<Duration>) -> Result<Option<String>> {
        if let Some(limit) = phrase_limit {
            std::thread::sleep(limit);
        }
        Ok(None)
    }
}

// ── Output ──────────────────────────────────────────────────────────────

/// Spoken output as seen by sessions.
pub trait SpeechOutput: Send + Sync {
    /// Queue `text` for speaking. Never blocks on playback.
    fn speak(&self, text: &str);
    /// Interrupt current speech and drop anything queued.
    fn stop(&self);
    fn set_muted(&self, muted: bool);
    fn is_muted(&self) -> bool;
}

/// A blocking text-to-speech engine.
pub trait SpeechSynth: Send + Sync {
    /// Speak one sentence, returning when playback ends.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::Speech`] if the engine fails.
    fn say(&self, sentence: &str) -> Result<()>;

    /// Cut off any in-progress playback. Default: nothing to cut.
    fn interrupt(&self) {}
}

/// Split text into speakable chunks at sentence ends and line breaks.
///
/// List numbering such as "2." stays attached to the item it numbers.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        let mut current = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            let at_break = matches!(c, '.' | '!' | '?')
                && chars.peek().is_none_or(|next| next.is_whitespace());
            let is_numbering = c == '.'
                && current.trim().len() > 1
                && current.trim()[..current.trim().len() - 1]
                    .chars()
                    .all(|d| d.is_ascii_digit());
            if at_break && !is_numbering {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    out.push(sentence.to_owned());
                }
                current.clear();
            }
        }
        let rest = current.trim();
        if !rest.is_empty() {
            out.push(rest.to_owned());
        }
    }
    out
}

enum SpeechJob {
    /// Text stamped with the stop generation it was queued under.
    Say { text: String, generation: u64 },
    /// Reply once every earlier job has been handled.
    Flush(Sender<()>),
    Shutdown,
}

struct Shared {
    /// Bumped by every stop; jobs from an older generation are dropped.
    generation: AtomicU64,
    muted: AtomicBool,
    last: Mutex<Option<String>>,
}

/// Serialized speech worker.
pub struct SpeechQueue {
    tx: Sender<SpeechJob>,
    rx: Receiver<SpeechJob>,
    shared: Arc<Shared>,
    synth: Arc<dyn SpeechSynth>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechQueue {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::Speech`] if the thread cannot be spawned.
    pub fn new(
        synth: Arc<dyn SpeechSynth>,
        events: Option<broadcast::Sender<AssistantEvent>>,
    ) -> Result<Self> {
        let (tx, rx) = unbounded::<SpeechJob>();
        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
            muted: AtomicBool::new(false),
            last: Mutex::new(None),
        });

        let worker_rx = rx.clone();
        let worker_shared = Arc::clone(&shared);
        let worker_synth = Arc::clone(&synth);
        let worker = std::thread::Builder::new()
            .name("orbit-speech".to_owned())
            .spawn(move || speech_loop(&worker_rx, &worker_shared, &*worker_synth, events.as_ref()))
            .map_err(|e| OrbitError::Speech(format!("failed to start speech worker: {e}")))?;

        Ok(Self {
            tx,
            rx,
            shared,
            synth,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Speak the last spoken text again.
    pub fn replay_last(&self) -> bool {
        let last = self
            .shared
            .last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match last {
            Some(text) => {
                self.speak(&text);
                true
            }
            None => false,
        }
    }

    /// Flip the mute flag and return the new state.
    pub fn toggle_mute(&self) -> bool {
        let muted = !self.is_muted();
        self.set_muted(muted);
        muted
    }

    /// Block until everything queued so far has been spoken or skipped.
    ///
    /// Returns `false` on timeout or if the queue was stopped meanwhile.
    pub fn flush(&self, timeout: Duration) -> bool {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        if self.tx.send(SpeechJob::Flush(done_tx)).is_err() {
            return false;
        }
        done_rx.recv_timeout(timeout).is_ok()
    }
}

impl SpeechOutput for SpeechQueue {
    fn speak(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.is_muted() {
            debug!("muted; dropping speech");
            return;
        }
        let job = SpeechJob::Say {
            text: text.to_owned(),
            generation: self.shared.generation.load(Ordering::Acquire),
        };
        if self.tx.send(job).is_err() {
            warn!("speech worker gone; dropping speech");
        }
    }

    fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let dropped = self
            .rx
            .try_iter()
            .filter(|job| matches!(job, SpeechJob::Say { .. }))
            .count();
        self.synth.interrupt();
        debug!(dropped, "speech stopped");
    }

    fn set_muted(&self, muted: bool) {
        self.shared.muted.store(muted, Ordering::Release);
        info!(muted, "speech mute changed");
        if muted {
            self.stop();
        }
    }

    fn is_muted(&self) -> bool {
        self.shared.muted.load(Ordering::Acquire)
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        self.stop();
        let _ = self.tx.send(SpeechJob::Shutdown);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("speech worker panicked");
        }
    }
}

fn speech_loop(
    rx: &Receiver<SpeechJob>,
    shared: &Shared,
    synth: &dyn SpeechSynth,
    events: Option<&broadcast::Sender<AssistantEvent>>,
) {
    let emit = |active: bool| {
        if let Some(events) = events {
            let _ = events.send(AssistantEvent::Speaking { active });
        }
    };

    while let Ok(job) = rx.recv() {
        let (text, generation) = match job {
            SpeechJob::Say { text, generation } => (text, generation),
            SpeechJob::Flush(done) => {
                let _ = done.send(());
                continue;
            }
            SpeechJob::Shutdown => break,
        };
        let stale = || shared.generation.load(Ordering::Acquire) != generation;
        if shared.muted.load(Ordering::Acquire) || stale() {
            continue;
        }
        *shared.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.clone());

        emit(true);
        for sentence in split_sentences(&text) {
            if stale() {
                debug!("speech interrupted");
                break;
            }
            if let Err(e) = synth.say(&sentence) {
                warn!(error = %e, "speech synthesis failed");
                break;
            }
        }
        emit(false);
    }
    debug!("speech worker stopped");
}
