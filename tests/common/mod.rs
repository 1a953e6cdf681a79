//! Shared fakes for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use orbit::intent::{IntentClassifier, IntentResult, KeywordClassifier};
use orbit::skills::Listing;
use orbit::speech::{SpeechCapture, SpeechOutput};
use orbit::{Assistant, Collaborators, OrbitConfig, SkillOutcome, SkillSet};
use orbit_apps::{AppCandidate, AppKind, ApplicationRegistry, RegistryConfig, StaticDirectory};

// ── Skills ──────────────────────────────────────────────────────────────

/// Records every call and answers with a predictable sentence.
#[derive(Default)]
pub struct RecordingSkills {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingSkills {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> String {
        self.calls.lock().unwrap().push(call.clone());
        format!("ok: {call}")
    }
}

impl SkillSet for RecordingSkills {
    fn create_file(&self, name: &str) -> SkillOutcome {
        SkillOutcome::done(self.record(format!("create_file {name}")))
    }

    fn delete_file(&self, name: &str) -> SkillOutcome {
        SkillOutcome::done(self.record(format!("delete_file {name}")))
    }

    fn create_folder(&self, name: &str) -> SkillOutcome {
        SkillOutcome::done(self.record(format!("create_folder {name}")))
    }

    fn delete_folder(&self, name: &str) -> SkillOutcome {
        SkillOutcome::done(self.record(format!("delete_folder {name}")))
    }

    fn list_items(&self) -> Listing {
        self.calls.lock().unwrap().push("list_items".into());
        Listing {
            summary: "There are 2 items in home.".into(),
            items: vec!["a.txt".into(), "docs/".into()],
        }
    }

    fn navigate_in(&self, folder: &str) -> String {
        self.record(format!("navigate_in {folder}"))
    }

    fn navigate_out(&self) -> String {
        self.record("navigate_out".into())
    }

    fn open_application(&self, app: &AppCandidate) -> String {
        self.record(format!("open {}", app.name))
    }

    fn close_application(&self, app: &AppCandidate) -> String {
        self.record(format!("close {}", app.name))
    }

    fn current_time(&self) -> String {
        "9:41 AM".into()
    }
}

// ── Registry ────────────────────────────────────────────────────────────

pub fn app(name: &str) -> AppCandidate {
    AppCandidate::new(name, name.to_lowercase().replace(' ', "-"), AppKind::Desktop)
}

pub fn registry_with(names: &[&str]) -> Arc<ApplicationRegistry> {
    let provider = StaticDirectory::new(names.iter().map(|n| app(n)).collect());
    Arc::new(ApplicationRegistry::new(Arc::new(provider), RegistryConfig::default()).unwrap())
}

pub fn browser_registry() -> Arc<ApplicationRegistry> {
    registry_with(&["Chrome", "Chrome Beta", "Chrome Canary", "Firefox", "Calculator"])
}

// ── Classifiers ─────────────────────────────────────────────────────────

/// Always answers with the same result.
pub struct FixedClassifier(pub IntentResult);

impl IntentClassifier for FixedClassifier {
    fn classify(&self, _text: &str) -> IntentResult {
        self.0.clone()
    }
}

/// Keyword classifier that first waits for the test to release it.
pub struct GatedClassifier {
    pub release: Receiver<()>,
}

impl IntentClassifier for GatedClassifier {
    fn classify(&self, text: &str) -> IntentResult {
        let _ = self.release.recv();
        KeywordClassifier::default().classify(text)
    }
}

// ── Speech ──────────────────────────────────────────────────────────────

/// Replays scripted captures; afterwards hears silence.
pub struct ScriptedCapture {
    script: Mutex<VecDeque<orbit::Result<Option<String>>>>,
    repeat: Option<String>,
}

impl ScriptedCapture {
    pub fn new(script: Vec<orbit::Result<Option<String>>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            repeat: None,
        })
    }

    /// Hears `text` on every call.
    pub fn always(text: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(text.to_owned()),
        })
    }
}

impl SpeechCapture for ScriptedCapture {
    fn listen_once(&self, _limit: Option<Duration>) -> orbit::Result<Option<String>> {
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        std::thread::sleep(Duration::from_millis(5));
        Ok(self.repeat.clone())
    }
}

/// Blocks every capture until the test releases (or drops) the gate.
pub struct GatedCapture {
    pub release: Receiver<()>,
    pub heard: String,
}

impl SpeechCapture for GatedCapture {
    fn listen_once(&self, _limit: Option<Duration>) -> orbit::Result<Option<String>> {
        let _ = self.release.recv();
        Ok(Some(self.heard.clone()))
    }
}

pub fn gate() -> (Sender<()>, Receiver<()>) {
    crossbeam_channel::unbounded()
}

/// Records what would have been spoken.
#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<String>>,
    muted: Mutex<bool>,
}

impl RecordingSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechOutput for RecordingSpeech {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_owned());
    }

    fn stop(&self) {}

    fn set_muted(&self, muted: bool) {
        *self.muted.lock().unwrap() = muted;
    }

    fn is_muted(&self) -> bool {
        *self.muted.lock().unwrap()
    }
}

// ── Assembly ────────────────────────────────────────────────────────────

pub struct Harness {
    pub assistant: Assistant,
    pub skills: Arc<RecordingSkills>,
    pub speech: Arc<RecordingSpeech>,
}

pub fn harness(
    classifier: Arc<dyn IntentClassifier>,
    capture: Arc<dyn SpeechCapture>,
    config: OrbitConfig,
) -> Harness {
    let skills = Arc::new(RecordingSkills::default());
    let speech = Arc::new(RecordingSpeech::default());
    let assistant = Assistant::new(
        config,
        Collaborators {
            classifier,
            skills: skills.clone(),
            registry: browser_registry(),
            capture,
            speech: speech.clone(),
            events: orbit::runtime::event_channel(),
        },
        tokio::runtime::Handle::current(),
    )
    .unwrap();
    Harness {
        assistant,
        skills,
        speech,
    }
}

pub fn keyword_harness(capture: Arc<dyn SpeechCapture>) -> Harness {
    harness(
        Arc::new(KeywordClassifier::default()),
        capture,
        OrbitConfig::default(),
    )
}

/// Poll until `check` holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
