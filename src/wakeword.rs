//! Text-based wake phrase detection.
//!
//! The wake listener transcribes short phrases with the same
//! [`SpeechCapture`] used for commands and checks each transcript with
//! [`WakePhraseMatcher`]. A match opens a voice session through the
//! callback given to [`WakeTrigger::spawn`]; the listener itself never
//! waits for the session.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WakeConfig;
use crate::error::{OrbitError, Result};
use crate::speech::SpeechCapture;

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `phrase` occurs in `text` on word boundaries. Both normalized.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    !phrase.is_empty() && format!(" {text} ").contains(&format!(" {phrase} "))
}

/// Decides whether a transcript contains the wake phrase.
#[derive(Debug, Clone)]
pub struct WakePhraseMatcher {
    phrases: Vec<String>,
    keyword: String,
    variants: Vec<String>,
}

impl WakePhraseMatcher {
    pub fn new(phrases: &[String], keyword: &str, variants: &[String]) -> Self {
        let clean = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|p| normalize(p))
                .filter(|p| !p.is_empty())
                .collect()
        };
        Self {
            phrases: clean(phrases),
            keyword: normalize(keyword),
            variants: clean(variants),
        }
    }

    pub fn from_config(config: &WakeConfig) -> Self {
        Self::new(&config.phrases, &config.keyword, &config.variants)
    }

    /// Checked in order: the whole transcript is a wake phrase; the keyword
    /// appears as a word; a known misrecognition appears; the transcript
    /// starts with a wake phrase.
    #[must_use]
    pub fn matches(&self, transcript: &str) -> bool {
        let heard = normalize(transcript);
        if heard.is_empty() {
            return false;
        }
        if self.phrases.iter().any(|p| *p == heard) {
            return true;
        }
        if !self.keyword.is_empty() && heard.split(' ').any(|w| w == self.keyword) {
            return true;
        }
        if self.variants.iter().any(|v| contains_phrase(&heard, v)) {
            return true;
        }
        self.phrases
            .iter()
            .any(|p| heard.starts_with(&format!("{p} ")))
    }
}

/// Background wake listener configuration plus its capture source.
pub struct WakeTrigger {
    capture: Arc<dyn SpeechCapture>,
    matcher: WakePhraseMatcher,
    phrase_limit: Duration,
    retry_backoff: Duration,
    cooldown: Duration,
}

impl WakeTrigger {
    pub fn new(capture: Arc<dyn SpeechCapture>, config: &WakeConfig) -> Self {
        Self {
            capture,
            matcher: WakePhraseMatcher::from_config(config),
            phrase_limit: Duration::from_millis(config.phrase_time_limit_ms),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            cooldown: Duration::from_millis(config.cooldown_ms),
        }
    }

    /// Start listening on a dedicated thread. `on_wake` runs on that thread
    /// for every detection and must return quickly.
    ///
    /// # Errors
    ///
    /// Returns [`OrbitError::Session`] if the thread cannot be spawned.
    pub fn spawn<F>(self, on_wake: F) -> Result<WakeListener>
    where
        F: Fn() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let thread = std::thread::Builder::new()
            .name("orbit-wake".to_owned())
            .spawn(move || self.run(&token, &on_wake))
            .map_err(|e| OrbitError::Session(format!("failed to start wake listener: {e}")))?;
        info!("wake listener started");
        Ok(WakeListener {
            cancel,
            thread: Some(thread),
        })
    }

    fn run(&self, cancel: &CancellationToken, on_wake: &dyn Fn()) {
        while !cancel.is_cancelled() {
            match self.capture.listen_once(Some(self.phrase_limit)) {
                Ok(Some(text)) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if self.matcher.matches(&text) {
                        info!(heard = %text, "wake phrase detected");
                        on_wake();
                        pause(cancel, self.cooldown);
                    } else {
                        debug!(heard = %text, "no wake phrase");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "wake capture failed; retrying");
                    pause(cancel, self.retry_backoff);
                }
            }
        }
        debug!("wake listener stopped");
    }
}

/// Sleep for `duration` in short slices so cancellation is noticed promptly.
fn pause(cancel: &CancellationToken, duration: Duration) {
    const SLICE: Duration = Duration::from_millis(50);
    let mut left = duration;
    while !left.is_zero() && !cancel.is_cancelled() {
        let step = left.min(SLICE);
        std::thread::sleep(step);
        left = left.saturating_sub(step);
    }
}

/// Handle to a running wake listener.
pub struct WakeListener {
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl WakeListener {
    /// Ask the listener to stop after the current capture.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop and wait for the thread to exit.
    pub fn join(mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("wake listener panicked");
        }
    }
}

impl Drop for WakeListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
