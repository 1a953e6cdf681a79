//! Skill capabilities the router dispatches to.
//!
//! A [`SkillSet`] is a fixed collection of operations. Every operation
//! answers with a user-facing string: failures are absorbed by the skill
//! and phrased for the user, never returned as errors to the router.
//!
//! Deferred work (confirmations, disambiguation, undo) is described by
//! [`SkillCommand`] values rather than closures, so a pending action can be
//! logged, compared and serialized.

pub mod alarm;
pub mod desktop;
pub mod file_control;

pub use alarm::AlarmClock;
pub use desktop::DesktopSkills;
pub use file_control::FileControl;

use orbit_apps::AppCandidate;
use serde::{Deserialize, Serialize};

/// Answer for capabilities the host does not provide.
pub const UNAVAILABLE: &str = "That is not available on this device.";

/// A spoken summary plus display lines (one per item).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub summary: String,
    pub items: Vec<String>,
}

/// Reply of a reversible operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillOutcome {
    pub message: String,
    /// False when the operation was refused or failed and nothing changed.
    pub applied: bool,
}

impl SkillOutcome {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            applied: true,
        }
    }

    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            applied: false,
        }
    }
}

/// The operations available to the router.
///
/// File and folder changes report a [`SkillOutcome`] so only changes that
/// actually happened become undoable.
pub trait SkillSet: Send + Sync {
    fn create_file(&self, name: &str) -> SkillOutcome;
    fn delete_file(&self, name: &str) -> SkillOutcome;
    fn create_folder(&self, name: &str) -> SkillOutcome;
    fn delete_folder(&self, name: &str) -> SkillOutcome;
    fn list_items(&self) -> Listing;
    fn navigate_in(&self, folder: &str) -> String;
    fn navigate_out(&self) -> String;

    fn open_application(&self, app: &AppCandidate) -> String;
    fn close_application(&self, app: &AppCandidate) -> String;

    fn set_volume(&self, _level: u8) -> String {
        UNAVAILABLE.to_owned()
    }

    fn increase_volume(&self) -> String {
        UNAVAILABLE.to_owned()
    }

    fn decrease_volume(&self) -> String {
        UNAVAILABLE.to_owned()
    }

    fn mute(&self) -> String {
        UNAVAILABLE.to_owned()
    }

    fn unmute(&self) -> String {
        UNAVAILABLE.to_owned()
    }

    fn set_alarm(&self, _hour: u8, _minute: u8) -> String {
        UNAVAILABLE.to_owned()
    }

    fn cancel_alarm(&self) -> String {
        UNAVAILABLE.to_owned()
    }

    fn alarm_status(&self) -> String {
        UNAVAILABLE.to_owned()
    }

    /// Local wall-clock time, e.g. "5:07 PM".
    fn current_time(&self) -> String {
        chrono::Local::now().format("%-I:%M %p").to_string()
    }

    /// Local date, e.g. "Monday, October 19, 2026".
    fn current_date(&self) -> String {
        chrono::Local::now().format("%A, %B %-d, %Y").to_string()
    }
}

/// A deferred skill invocation: operation plus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SkillCommand {
    CreateFile { name: String },
    DeleteFile { name: String },
    CreateFolder { name: String },
    DeleteFolder { name: String },
    /// Launch `name`, remembering it as the choice for `query`.
    OpenApplication { query: String, name: String },
    CloseApplication { query: String, name: String },
    /// Answer with `text` and do nothing else.
    Echo { text: String },
}

impl SkillCommand {
    /// The command that reverses this one, if any.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::CreateFile { name } => Some(Self::DeleteFile { name: name.clone() }),
            Self::DeleteFile { name } => Some(Self::CreateFile { name: name.clone() }),
            Self::CreateFolder { name } => Some(Self::DeleteFolder { name: name.clone() }),
            Self::DeleteFolder { name } => Some(Self::CreateFolder { name: name.clone() }),
            Self::OpenApplication { .. } | Self::CloseApplication { .. } | Self::Echo { .. } => {
                None
            }
        }
    }

    /// Bind a chosen option label into this command.
    ///
    /// Application commands target the chosen name; anything else resolves
    /// to echoing the label back.
    #[must_use]
    pub fn with_choice(&self, label: &str) -> Self {
        match self {
            Self::OpenApplication { query, .. } => Self::OpenApplication {
                query: query.clone(),
                name: label.to_owned(),
            },
            Self::CloseApplication { query, .. } => Self::CloseApplication {
                query: query.clone(),
                name: label.to_owned(),
            },
            _ => Self::Echo {
                text: label.to_owned(),
            },
        }
    }

    /// Short human description, e.g. "create file notes.txt".
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateFile { name } => format!("create file {name}"),
            Self::DeleteFile { name } => format!("delete file {name}"),
            Self::CreateFolder { name } => format!("create folder {name}"),
            Self::DeleteFolder { name } => format!("delete folder {name}"),
            Self::OpenApplication { name, .. } => format!("open {name}"),
            Self::CloseApplication { name, .. } => format!("close {name}"),
            Self::Echo { text } => text.clone(),
        }
    }
}
