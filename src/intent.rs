//! Intent classification: turn a transcript into a typed [`Intent`].
//!
//! The classifier itself is pluggable ([`IntentClassifier`]); the crate
//! ships [`KeywordClassifier`], a deterministic keyword/phrase matcher that
//! needs no model files. Slot helpers ([`normalize_name`], [`extract_time`],
//! [`extract_level`]) are shared so any classifier produces slots in the
//! same shape.

use serde::{Deserialize, Serialize};

/// A recognized user request with its slots already extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    GetTime,
    GetDate,
    CreateFile { name: String },
    DeleteFile { name: String },
    CreateFolder { name: String },
    DeleteFolder { name: String },
    ListFiles,
    NavigateIn { folder: Option<String> },
    NavigateOut,
    OpenApplication { app: String },
    CloseApplication { app: String },
    ListApplications,
    RefreshApplications,
    Undo,
    SetVolume { level: Option<u8> },
    IncreaseVolume,
    DecreaseVolume,
    Mute,
    Unmute,
    SetAlarm { time: Option<(u8, u8)> },
    CancelAlarm,
    AlarmStatus,
    Unknown,
}

impl Intent {
    /// Stable label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::GetTime => "get_time",
            Self::GetDate => "get_date",
            Self::CreateFile { .. } => "create_file",
            Self::DeleteFile { .. } => "delete_file",
            Self::CreateFolder { .. } => "create_folder",
            Self::DeleteFolder { .. } => "delete_folder",
            Self::ListFiles => "list_files",
            Self::NavigateIn { .. } => "navigate_in",
            Self::NavigateOut => "navigate_out",
            Self::OpenApplication { .. } => "open_application",
            Self::CloseApplication { .. } => "close_application",
            Self::ListApplications => "list_applications",
            Self::RefreshApplications => "refresh_applications",
            Self::Undo => "undo",
            Self::SetVolume { .. } => "set_volume",
            Self::IncreaseVolume => "increase_volume",
            Self::DecreaseVolume => "decrease_volume",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::SetAlarm { .. } => "set_alarm",
            Self::CancelAlarm => "cancel_alarm",
            Self::AlarmStatus => "alarm_status",
            Self::Unknown => "unknown",
        }
    }
}

/// Classifier output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl IntentResult {
    pub fn new(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn unknown() -> Self {
        Self::new(Intent::Unknown, 0.0)
    }
}

/// Maps free text to an intent. Implementations must be pure with respect
/// to the text: no side effects, no dialog state.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> IntentResult;
}

// ── Slot helpers ────────────────────────────────────────────────────────

/// Lowercase, drop punctuation other than `.` `:` `-` `_` inside words, and
/// collapse whitespace.
fn clean(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, '.' | ':' | '-' | '_') {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(|w| w.trim_matches(|c| c == '.' || c == '-'))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

const SPOKEN_SEPARATORS: &[(&str, &str)] = &[
    (" dot ", "."),
    (" underscore ", "_"),
    (" dash ", "-"),
    (" hyphen ", "-"),
    (" slash ", "/"),
    (" space ", ""),
];

const NAME_FILLERS: &[&str] = &[
    "named", "called", "as", "file", "folder", "directory", "a", "an", "the", "please", "can",
    "could", "you", "new",
];

/// Pull a file or folder name out of a spoken request.
///
/// Spoken separators are joined ("notes dot txt" → "notes.txt"), filler
/// words are dropped and the last remaining token wins. Returns an empty
/// string when nothing is left.
#[must_use]
pub fn normalize_name(text: &str) -> String {
    let mut joined = format!(" {} ", text.trim().to_lowercase());
    for (spoken, symbol) in SPOKEN_SEPARATORS {
        while joined.contains(spoken) {
            joined = joined.replacen(spoken, symbol, 1);
        }
    }
    joined
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '_'))
        .filter(|w| !w.is_empty() && !NAME_FILLERS.contains(w))
        .next_back()
        .unwrap_or_default()
        .to_owned()
}

fn parse_hour(token: &str) -> Option<u8> {
    if token.is_empty() || token.len() > 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn parse_minute(token: &str) -> Option<u8> {
    if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Split "5pm" into ("5", Some("pm")).
fn split_meridiem(token: &str) -> (&str, Option<&'static str>) {
    for suffix in ["am", "pm"] {
        if let Some(stem) = token.strip_suffix(suffix)
            && !stem.is_empty()
            && stem.bytes().all(|b| b.is_ascii_digit() || b == b':')
        {
            return (stem, Some(suffix));
        }
    }
    (token, None)
}

/// Extract an `(hour, minute)` from phrases like "5 pm", "5:30 pm",
/// "17 00", "17:00" or "7am".
///
/// Returns `None` when no time is present or the result is out of range.
#[must_use]
pub fn extract_time(text: &str) -> Option<(u8, u8)> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| matches!(c, ',' | '?' | '!')))
        .collect();

    let mut meridiem = tokens.iter().find_map(|t| match *t {
        "pm" | "p.m." | "p.m" => Some("pm"),
        "am" | "a.m." | "a.m" => Some("am"),
        _ => None,
    });

    let mut found: Option<(u8, u8)> = None;

    // Pass 1: "H:MM" or "H MM".
    for (i, raw) in tokens.iter().enumerate() {
        let (token, suffix) = split_meridiem(raw);
        if let Some((h, m)) = token.split_once(':')
            && let (Some(h), Some(m)) = (parse_hour(h), parse_minute(m))
        {
            found = Some((h, m));
            meridiem = suffix.or(meridiem);
            break;
        }
        if suffix.is_none()
            && let Some(h) = parse_hour(token)
            && let Some(next) = tokens.get(i + 1)
        {
            let (next, next_suffix) = split_meridiem(next);
            if let Some(m) = parse_minute(next) {
                found = Some((h, m));
                meridiem = next_suffix.or(meridiem);
                break;
            }
        }
    }

    // Pass 2: a bare hour.
    if found.is_none() {
        for raw in &tokens {
            let (token, suffix) = split_meridiem(raw);
            if let Some(h) = parse_hour(token) {
                found = Some((h, 0));
                meridiem = suffix.or(meridiem);
                break;
            }
        }
    }

    let (mut hour, minute) = found?;
    match meridiem {
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

/// First whole number in `0..=100`, for volume levels.
#[must_use]
pub fn extract_level(text: &str) -> Option<u8> {
    text.split_whitespace()
        .map(|t| t.trim_end_matches('%').trim_matches(|c: char| !c.is_ascii_digit()))
        .find_map(|t| t.parse::<u16>().ok())
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| *n <= 100)
}

// ── Keyword classifier ──────────────────────────────────────────────────

/// Deterministic keyword classifier.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    matched_confidence: f32,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            matched_confidence: 0.9,
        }
    }
}

fn has_any(words: &[&str], wanted: &[&str]) -> bool {
    words.iter().any(|w| wanted.contains(w))
}

fn has_phrase(text: &str, phrase: &str) -> bool {
    format!(" {text} ").contains(&format!(" {phrase} "))
}

/// Words after the first occurrence of any of `verbs`.
fn rest_after<'a>(words: &[&'a str], verbs: &[&str]) -> String {
    words
        .iter()
        .position(|w| verbs.contains(w))
        .map(|i| words[i + 1..].join(" "))
        .unwrap_or_default()
}

impl KeywordClassifier {
    fn match_intent(text: &str) -> Option<Intent> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return None;
        }

        const FOLDER: &[&str] = &["folder", "directory"];
        const CREATE: &[&str] = &["create", "make", "new"];
        const DELETE: &[&str] = &["delete", "remove", "erase"];
        const APP: &[&str] = &["app", "apps", "application", "applications", "programs"];

        if has_any(&words, &["undo"]) {
            return Some(Intent::Undo);
        }

        if has_any(&words, &["alarm", "alarms"]) {
            if has_any(&words, &["cancel", "delete", "remove", "stop", "clear"]) {
                return Some(Intent::CancelAlarm);
            }
            if has_any(&words, &["set", "create", "add", "for", "at"]) {
                return Some(Intent::SetAlarm {
                    time: extract_time(text),
                });
            }
            return Some(Intent::AlarmStatus);
        }
        if has_phrase(text, "wake me") {
            return Some(Intent::SetAlarm {
                time: extract_time(text),
            });
        }

        if has_any(&words, &["time"]) && !has_any(&words, &["alarm"]) {
            return Some(Intent::GetTime);
        }
        if has_any(&words, &["date"]) || has_phrase(text, "what day") {
            return Some(Intent::GetDate);
        }

        if has_any(&words, &["unmute"]) {
            return Some(Intent::Unmute);
        }
        if has_any(&words, &["mute", "silence"]) {
            return Some(Intent::Mute);
        }
        if has_any(&words, &["volume", "louder", "quieter"]) {
            if has_any(&words, &["up", "increase", "raise", "louder", "higher"]) {
                return Some(Intent::IncreaseVolume);
            }
            if has_any(&words, &["down", "decrease", "lower", "quieter", "reduce"]) {
                return Some(Intent::DecreaseVolume);
            }
            return Some(Intent::SetVolume {
                level: extract_level(text),
            });
        }

        if has_any(&words, &["refresh", "rescan", "reload"]) && has_any(&words, APP) {
            return Some(Intent::RefreshApplications);
        }
        if has_any(&words, &["list", "show"]) && has_any(&words, APP) {
            return Some(Intent::ListApplications);
        }
        if has_phrase(text, "installed applications") || has_phrase(text, "installed apps") {
            return Some(Intent::ListApplications);
        }
        if has_any(&words, &["list", "show"]) && has_any(&words, &["files", "folders", "contents"])
        {
            return Some(Intent::ListFiles);
        }
        if has_phrase(text, "what is here") || has_phrase(text, "what's here") {
            return Some(Intent::ListFiles);
        }

        if has_phrase(text, "go back")
            || has_phrase(text, "go up")
            || has_phrase(text, "parent folder")
            || has_phrase(text, "leave folder")
        {
            return Some(Intent::NavigateOut);
        }
        if has_phrase(text, "go to")
            || has_phrase(text, "go into")
            || has_phrase(text, "open folder")
            || has_phrase(text, "enter folder")
            || has_any(&words, &["navigate", "cd"])
        {
            let rest = rest_after(&words, &["to", "into", "folder", "navigate", "cd"]);
            let folder = normalize_name(&rest);
            return Some(Intent::NavigateIn {
                folder: (!folder.is_empty()).then_some(folder),
            });
        }

        let is_folder = has_any(&words, FOLDER);
        if has_any(&words, CREATE) {
            let name = normalize_name(&rest_after(&words, CREATE));
            return Some(if is_folder {
                Intent::CreateFolder { name }
            } else {
                Intent::CreateFile { name }
            });
        }
        if has_any(&words, DELETE) {
            let name = normalize_name(&rest_after(&words, DELETE));
            return Some(if is_folder {
                Intent::DeleteFolder { name }
            } else {
                Intent::DeleteFile { name }
            });
        }

        if has_any(&words, &["open", "launch", "start", "run"]) {
            return Some(Intent::OpenApplication {
                app: rest_after(&words, &["open", "launch", "start", "run"]),
            });
        }
        if has_any(&words, &["close", "quit", "exit", "kill"]) {
            return Some(Intent::CloseApplication {
                app: rest_after(&words, &["close", "quit", "exit", "kill"]),
            });
        }

        None
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> IntentResult {
        let cleaned = clean(text);
        match Self::match_intent(&cleaned) {
            Some(intent) => IntentResult::new(intent, self.matched_confidence),
            None => IntentResult::unknown(),
        }
    }
}
