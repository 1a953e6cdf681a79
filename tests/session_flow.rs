//! End-to-end session lifecycle through the assistant.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::sync::{Arc, Barrier};
use std::time::Duration;

use common::{
    GatedCapture, GatedClassifier, ScriptedCapture, eventually, gate, harness, keyword_harness,
};
use crossbeam_channel::{Receiver, Sender};
use orbit::intent::{IntentClassifier, IntentResult, KeywordClassifier};
use orbit::router::{NOT_CAUGHT, UNRECOGNIZED};
use orbit::{AssistantEvent, OrbitConfig, OrbitError, Origin, SessionState};
use tokio::sync::broadcast;

fn drain(rx: &mut broadcast::Receiver<AssistantEvent>) -> Vec<AssistantEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

/// Announces that classification started, then waits for the test.
struct HeldClassifier {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl IntentClassifier for HeldClassifier {
    fn classify(&self, text: &str) -> IntentResult {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        KeywordClassifier::default().classify(text)
    }
}

fn states(events: &[AssistantEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|e| match e {
            AssistantEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

// ── Lifecycle ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn typed_session_processes_then_idles() {
    let h = keyword_harness(ScriptedCapture::new(vec![]));
    let mut rx = h.assistant.subscribe();

    let session = h.assistant.submit_text("what time is it").unwrap();
    assert_eq!(session.origin(), Origin::Text);
    assert_eq!(session.join().await.as_deref(), Some("The time is 9:41 AM."));

    let events = drain(&mut rx);
    assert_eq!(
        states(&events),
        vec![SessionState::Processing, SessionState::Idle]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        AssistantEvent::UserInput { origin: Origin::Text, text } if text == "what time is it"
    )));
    assert!(!h.assistant.is_busy());
    assert_eq!(h.speech.spoken(), vec!["The time is 9:41 AM."]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn voice_session_walks_every_state() {
    let capture = ScriptedCapture::new(vec![Ok(Some("open firefox".into()))]);
    let h = keyword_harness(capture);
    let mut rx = h.assistant.subscribe();

    let reply = h.assistant.trigger_wake().unwrap().join().await;
    assert_eq!(reply.as_deref(), Some("ok: open Firefox"));

    assert_eq!(
        states(&drain(&mut rx)),
        vec![
            SessionState::Wake,
            SessionState::Listening,
            SessionState::Processing,
            SessionState::Idle,
        ]
    );
    assert_eq!(h.speech.spoken(), vec!["Yes?", "ok: open Firefox"]);
    assert_eq!(h.skills.calls(), vec!["open Firefox"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn silence_after_wake_is_not_caught() {
    let h = keyword_harness(ScriptedCapture::new(vec![Ok(None)]));
    let mut rx = h.assistant.subscribe();

    let reply = h.assistant.trigger_wake().unwrap().join().await;
    assert_eq!(reply.as_deref(), Some(NOT_CAUGHT));
    assert_eq!(
        states(&drain(&mut rx)),
        vec![SessionState::Wake, SessionState::Listening, SessionState::Idle]
    );
    assert!(h.skills.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn capture_failure_still_releases_gate() {
    let h = keyword_harness(ScriptedCapture::new(vec![Err(OrbitError::Capture(
        "microphone unplugged".into(),
    ))]));

    let reply = h.assistant.trigger_wake().unwrap().join().await;
    assert_eq!(reply.as_deref(), Some(NOT_CAUGHT));
    assert!(!h.assistant.is_busy());
    assert!(h.assistant.submit_text("what time is it").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn last_response_follows_latest_reply() {
    let h = keyword_harness(ScriptedCapture::new(vec![]));
    assert_eq!(h.assistant.last_response(), None);

    h.assistant.submit_text("blah blah").unwrap().join().await;
    assert_eq!(h.assistant.last_response().as_deref(), Some(UNRECOGNIZED));

    h.assistant.submit_text("what time is it").unwrap().join().await;
    assert_eq!(
        h.assistant.last_response().as_deref(),
        Some("The time is 9:41 AM.")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reply_lines_are_published_as_messages() {
    let h = keyword_harness(ScriptedCapture::new(vec![]));
    let mut rx = h.assistant.subscribe();

    h.assistant.submit_text("show files").unwrap().join().await;

    let messages: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            AssistantEvent::Message { text } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(messages, vec!["a.txt", "docs/"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dialog_state_survives_between_sessions() {
    let h = keyword_harness(ScriptedCapture::new(vec![]));

    let ask = h.assistant.submit_text("delete file old.txt").unwrap();
    assert_eq!(
        ask.join().await.as_deref(),
        Some("Are you sure you want to delete old.txt?")
    );
    assert!(h.skills.calls().is_empty());

    h.assistant.submit_text("yes").unwrap().join().await;
    assert_eq!(h.skills.calls(), vec!["delete_file old.txt"]);
}

// ── Admission ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn busy_gate_rejects_both_entry_points() {
    let (release, waiting) = gate();
    let h = keyword_harness(Arc::new(GatedCapture {
        release: waiting,
        heard: "what time is it".into(),
    }));

    let session = h.assistant.trigger_wake().unwrap();
    assert!(eventually(|| h.assistant.state() == SessionState::Listening).await);

    assert!(h.assistant.trigger_wake().is_none());
    assert!(h.assistant.submit_text("open firefox").is_none());
    assert!(h.skills.calls().is_empty());

    release.send(()).unwrap();
    assert_eq!(session.join().await.as_deref(), Some("The time is 9:41 AM."));
    assert!(h.assistant.submit_text("open firefox").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_session_frees_gate() {
    let (release, waiting) = gate();
    let h = keyword_harness(Arc::new(GatedCapture {
        release: waiting,
        heard: "open firefox".into(),
    }));
    let mut rx = h.assistant.subscribe();

    let session = h.assistant.trigger_wake().unwrap();
    assert!(eventually(|| h.assistant.state() == SessionState::Listening).await);

    session.cancel();
    assert_eq!(session.join().await, None);
    assert!(!h.assistant.is_busy());
    assert_eq!(states(&drain(&mut rx)).last(), Some(&SessionState::Idle));

    // Unblock the abandoned capture so the runtime can shut down.
    drop(release);
    assert!(h.skills.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_session_stays_busy_until_routing_ends() {
    let (entered_tx, entered) = gate();
    let (release, waiting) = gate();
    let h = harness(
        Arc::new(HeldClassifier {
            entered: entered_tx,
            release: waiting,
        }),
        ScriptedCapture::new(vec![]),
        OrbitConfig::default(),
    );
    let mut rx = h.assistant.subscribe();

    let session = h.assistant.submit_text("open firefox").unwrap();
    assert!(eventually(|| entered.try_recv().is_ok()).await);

    session.cancel();
    assert_eq!(session.join().await, None);
    assert!(h.assistant.is_busy());
    assert!(h.assistant.submit_text("what time is it").is_none());
    assert!(h.skills.calls().is_empty());

    release.send(()).unwrap();
    assert!(eventually(|| !h.assistant.is_busy()).await);
    let at_idle = h.skills.calls();
    assert_eq!(at_idle, vec!["open Firefox"]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.skills.calls(), at_idle);
    let events = drain(&mut rx);
    assert_eq!(states(&events).last(), Some(&SessionState::Idle));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, AssistantEvent::Response { .. }))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_cancels_running_session() {
    let (release, waiting) = gate();
    let h = keyword_harness(Arc::new(GatedCapture {
        release: waiting,
        heard: "open firefox".into(),
    }));

    let session = h.assistant.trigger_wake().unwrap();
    assert!(eventually(|| h.assistant.is_busy()).await);

    h.assistant.shutdown();
    assert_eq!(session.join().await, None);
    assert!(!h.assistant.is_busy());
    drop(release);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_triggers_admit_exactly_one() {
    let (release, waiting) = gate();
    let h = harness(
        Arc::new(GatedClassifier {
            release: waiting.clone(),
        }),
        Arc::new(GatedCapture {
            release: waiting,
            heard: "what time is it".into(),
        }),
        OrbitConfig::default(),
    );

    let barrier = Arc::new(Barrier::new(16));
    let threads: Vec<_> = (0..16)
        .map(|i| {
            let assistant = h.assistant.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                if i % 2 == 0 {
                    assistant.trigger_wake()
                } else {
                    assistant.submit_text("what time is it")
                }
            })
        })
        .collect();

    let admitted: Vec<_> = threads
        .into_iter()
        .filter_map(|t| t.join().unwrap())
        .collect();
    assert_eq!(admitted.len(), 1);

    drop(release);
    for session in admitted {
        assert!(session.join().await.is_some());
    }
    assert!(!h.assistant.is_busy());
}

// ── Wake listener ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wake_listener_starts_voice_sessions() {
    let h = keyword_harness(ScriptedCapture::always("hey orbit"));
    let mut rx = h.assistant.subscribe();

    let listener = h.assistant.start_wake_listener().unwrap();
    assert!(listener.is_running());

    let reply = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(AssistantEvent::Response { text }) => break text,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .unwrap();

    // The command capture hears the wake phrase again, which is no command.
    assert_eq!(reply, UNRECOGNIZED);
    assert_eq!(h.speech.spoken().first().map(String::as_str), Some("Yes?"));

    listener.stop();
    tokio::task::spawn_blocking(move || listener.join())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mute_toggles_speech_output() {
    let h = keyword_harness(ScriptedCapture::new(vec![]));

    assert!(h.assistant.toggle_mute());
    assert!(!h.assistant.toggle_mute());

    let mut config = OrbitConfig::default();
    config.speech.muted = true;
    let muted = harness(
        Arc::new(orbit::KeywordClassifier::default()),
        ScriptedCapture::new(vec![]),
        config,
    );
    assert!(!muted.assistant.toggle_mute());
}
