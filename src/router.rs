//! Turn one utterance into one reply.
//!
//! Order of precedence for each turn:
//!
//! 1. classify (low confidence counts as unknown);
//! 2. time and date answer immediately, even mid-dialog;
//! 3. with an action pending, the utterance is a dialog reply;
//! 4. unknown intents ask for a rephrase;
//! 5. everything else dispatches to a skill, possibly via a pending action.

use std::sync::Arc;

use orbit_apps::ApplicationRegistry;
use tracing::{debug, info};

use crate::config::{ConfirmationPolicy, OrbitConfig};
use crate::dialog::{ActionExecutor, DialogState, PendingAction};
use crate::intent::{Intent, IntentClassifier};
use crate::session::Origin;
use crate::skills::{SkillCommand, SkillOutcome, SkillSet};

pub const DIALOG_REPROMPT: &str = "Please say yes, no, or choose an option.";
pub const UNRECOGNIZED: &str = "I am not sure what you mean. Please rephrase.";
pub const TRY_AGAIN: &str = "Please try again.";
pub const NOT_CAUGHT: &str = "I did not catch that.";
pub const NEED_NAME: &str = "Please specify a file or folder name.";
pub const NEED_ALARM_TIME: &str = "Please tell me a valid time for the alarm.";

/// The outcome of one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Sentence(s) to speak.
    pub spoken: String,
    /// Display lines accompanying the reply.
    pub lines: Vec<String>,
    /// The file skill moved to another directory.
    pub directory_changed: bool,
}

impl Reply {
    /// A reply with speech only.
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            spoken: text.into(),
            ..Self::default()
        }
    }
}

/// How an utterance answers a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogReply {
    Confirm,
    Cancel,
    Select(usize),
    Unclear,
}

const YES_WORDS: &[&str] = &["yes", "yeah", "yep", "sure", "confirm"];
const NO_WORDS: &[&str] = &["no", "nope", "cancel"];
const ORDINALS: &[&str] = &["first", "second", "third", "fourth", "fifth"];

/// Interpret an utterance while an action is pending.
///
/// Matching is by whole word, so "know" is not "no". Ordinals count only
/// as the leading word ("second one", "third please").
#[must_use]
pub fn parse_dialog_reply(text: &str) -> DialogReply {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| YES_WORDS.contains(w)) {
        return DialogReply::Confirm;
    }
    if words.iter().any(|w| NO_WORDS.contains(w)) {
        return DialogReply::Cancel;
    }
    if let Some(index) = words
        .first()
        .and_then(|first| ORDINALS.iter().position(|o| o == first))
    {
        return DialogReply::Select(index);
    }
    DialogReply::Unclear
}

/// Resolves [`SkillCommand`]s against the skill set and registry.
struct CommandExecutor<'a> {
    skills: &'a dyn SkillSet,
    registry: &'a ApplicationRegistry,
}

impl ActionExecutor for CommandExecutor<'_> {
    fn execute(&self, command: &SkillCommand) -> SkillOutcome {
        match command {
            SkillCommand::CreateFile { name } => self.skills.create_file(name),
            SkillCommand::DeleteFile { name } => self.skills.delete_file(name),
            SkillCommand::CreateFolder { name } => self.skills.create_folder(name),
            SkillCommand::DeleteFolder { name } => self.skills.delete_folder(name),
            SkillCommand::OpenApplication { query, name } => {
                match self.registry.candidate_by_name(name) {
                    Some(app) => {
                        self.registry.remember_choice(query, &app.name);
                        SkillOutcome::done(self.skills.open_application(&app))
                    }
                    None => SkillOutcome::unchanged(format!(
                        "I couldn't find any application matching {name}."
                    )),
                }
            }
            SkillCommand::CloseApplication { name, .. } => {
                match self.registry.candidate_by_name(name) {
                    Some(app) => SkillOutcome::done(self.skills.close_application(&app)),
                    None => SkillOutcome::unchanged(format!(
                        "I couldn't find any application matching {name}."
                    )),
                }
            }
            SkillCommand::Echo { text } => SkillOutcome::done(text.clone()),
        }
    }
}

/// Which way an application request goes.
#[derive(Clone, Copy)]
enum AppVerb {
    Open,
    Close,
}

/// Classifies, negotiates and dispatches.
pub struct CommandRouter {
    classifier: Arc<dyn IntentClassifier>,
    skills: Arc<dyn SkillSet>,
    registry: Arc<ApplicationRegistry>,
    dialog: DialogState,
    policy: ConfirmationPolicy,
    confidence_threshold: f32,
    max_options: usize,
}

impl CommandRouter {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        skills: Arc<dyn SkillSet>,
        registry: Arc<ApplicationRegistry>,
        config: &OrbitConfig,
    ) -> Self {
        Self {
            classifier,
            skills,
            registry,
            dialog: DialogState::new(),
            policy: config.dialog.confirmation,
            confidence_threshold: config.intent.confidence_threshold,
            max_options: config.dialog.max_options.max(1),
        }
    }

    pub fn dialog(&self) -> &DialogState {
        &self.dialog
    }

    pub fn registry(&self) -> &Arc<ApplicationRegistry> {
        &self.registry
    }

    /// Handle one utterance from `origin`.
    pub fn handle(&mut self, text: &str, origin: Origin) -> Reply {
        let text = text.trim();
        if text.is_empty() {
            return Reply::say(NOT_CAUGHT);
        }

        let result = self.classifier.classify(text);
        let intent = if result.confidence < self.confidence_threshold {
            debug!(
                intent = result.intent.label(),
                confidence = result.confidence,
                "classification below threshold"
            );
            None
        } else {
            Some(result.intent)
        };
        info!(
            ?origin,
            intent = intent.as_ref().map_or("unrecognized", Intent::label),
            "routing"
        );

        match intent {
            Some(Intent::GetTime) => {
                return Reply::say(format!("The time is {}.", self.skills.current_time()));
            }
            Some(Intent::GetDate) => {
                return Reply::say(format!("Today is {}.", self.skills.current_date()));
            }
            _ => {}
        }

        if self.dialog.has_pending() {
            return Reply::say(self.dialog_turn(text));
        }

        match intent {
            None => Reply::say(UNRECOGNIZED),
            Some(intent) => self.dispatch(intent, origin),
        }
    }

    fn executor(&self) -> CommandExecutor<'_> {
        CommandExecutor {
            skills: self.skills.as_ref(),
            registry: self.registry.as_ref(),
        }
    }

    fn dialog_turn(&mut self, text: &str) -> String {
        let executor = CommandExecutor {
            skills: self.skills.as_ref(),
            registry: self.registry.as_ref(),
        };
        match parse_dialog_reply(text) {
            DialogReply::Confirm => self.dialog.confirm(&executor),
            DialogReply::Cancel => self.dialog.cancel(),
            DialogReply::Select(index) => self.dialog.select(index, &executor),
            DialogReply::Unclear => DIALOG_REPROMPT.to_owned(),
        }
    }

    fn dispatch(&mut self, intent: Intent, origin: Origin) -> Reply {
        match intent {
            Intent::CreateFile { name } => {
                self.destructive(SkillCommand::CreateFile { name }, origin)
            }
            Intent::DeleteFile { name } => {
                self.destructive(SkillCommand::DeleteFile { name }, origin)
            }
            Intent::CreateFolder { name } => {
                self.destructive(SkillCommand::CreateFolder { name }, origin)
            }
            Intent::DeleteFolder { name } => {
                self.destructive(SkillCommand::DeleteFolder { name }, origin)
            }
            Intent::ListFiles => {
                let listing = self.skills.list_items();
                if listing.items.is_empty() {
                    Reply::say(listing.summary)
                } else {
                    Reply {
                        spoken: "Here are the files and folders in the current directory."
                            .to_owned(),
                        lines: listing.items,
                        directory_changed: false,
                    }
                }
            }
            Intent::NavigateIn { folder: None } => Reply::say("Please specify a folder name."),
            Intent::NavigateIn {
                folder: Some(folder),
            } => Reply {
                spoken: self.skills.navigate_in(&folder),
                lines: Vec::new(),
                directory_changed: true,
            },
            Intent::NavigateOut => Reply {
                spoken: self.skills.navigate_out(),
                lines: Vec::new(),
                directory_changed: true,
            },
            Intent::OpenApplication { app } => self.application(&app, AppVerb::Open),
            Intent::CloseApplication { app } => self.application(&app, AppVerb::Close),
            Intent::ListApplications => {
                let names = self.registry.list_names();
                Reply {
                    spoken: format!("There are {} installed applications.", names.len()),
                    lines: names,
                    directory_changed: false,
                }
            }
            Intent::RefreshApplications => {
                let count = self.registry.refresh();
                debug!(count, "applications after refresh");
                Reply::say("Application list refreshed.")
            }
            Intent::Undo => {
                let executor = CommandExecutor {
                    skills: self.skills.as_ref(),
                    registry: self.registry.as_ref(),
                };
                Reply::say(self.dialog.undo(&executor))
            }
            Intent::SetVolume { level: None } => Reply::say("Please tell me a volume level."),
            Intent::SetVolume { level: Some(level) } => Reply::say(self.skills.set_volume(level)),
            Intent::IncreaseVolume => Reply::say(self.skills.increase_volume()),
            Intent::DecreaseVolume => Reply::say(self.skills.decrease_volume()),
            Intent::Mute => Reply::say(self.skills.mute()),
            Intent::Unmute => Reply::say(self.skills.unmute()),
            Intent::SetAlarm { time: None } => Reply::say(NEED_ALARM_TIME),
            Intent::SetAlarm {
                time: Some((hour, minute)),
            } => Reply::say(self.skills.set_alarm(hour, minute)),
            Intent::CancelAlarm => Reply::say(self.skills.cancel_alarm()),
            Intent::AlarmStatus => Reply::say(self.skills.alarm_status()),
            Intent::GetTime | Intent::GetDate | Intent::Unknown => Reply::say(TRY_AGAIN),
        }
    }

    /// File and folder changes: confirm first or run now, per policy.
    fn destructive(&mut self, command: SkillCommand, origin: Origin) -> Reply {
        let prompt = match &command {
            SkillCommand::CreateFile { name } | SkillCommand::DeleteFile { name }
            | SkillCommand::CreateFolder { name } | SkillCommand::DeleteFolder { name }
                if name.trim().is_empty() =>
            {
                return Reply::say(NEED_NAME);
            }
            SkillCommand::CreateFile { name } => format!("Should I create the file {name}?"),
            SkillCommand::DeleteFile { name } => {
                format!("Are you sure you want to delete {name}?")
            }
            SkillCommand::CreateFolder { name } => format!("Should I create the folder {name}?"),
            SkillCommand::DeleteFolder { name } => {
                format!("Are you sure you want to delete the folder {name}?")
            }
            other => return Reply::say(self.executor().execute(other).message),
        };

        if self.policy.requires_confirmation(origin) {
            self.dialog.set_pending(PendingAction::reversible(command));
            Reply::say(prompt)
        } else {
            Reply::say(self.executor().execute(&command).message)
        }
    }

    fn application(&mut self, query: &str, verb: AppVerb) -> Reply {
        let query = query.trim();
        if query.is_empty() {
            return Reply::say(match verb {
                AppVerb::Open => "Which application should I open?",
                AppVerb::Close => "Which application should I close?",
            });
        }

        let candidates = self.registry.find_candidates(query);
        let command = |name: String| match verb {
            AppVerb::Open => SkillCommand::OpenApplication {
                query: query.to_owned(),
                name,
            },
            AppVerb::Close => SkillCommand::CloseApplication {
                query: query.to_owned(),
                name,
            },
        };

        match candidates.as_slice() {
            [] => Reply::say(format!("I couldn't find any application matching {query}.")),
            [only] => Reply::say(
                self.executor()
                    .execute(&command(only.name.clone()))
                    .message,
            ),
            many => {
                let names: Vec<String> = many
                    .iter()
                    .take(self.max_options)
                    .map(|app| app.name.clone())
                    .collect();
                let mut prompt = String::from("I found multiple applications:\n");
                for (i, name) in names.iter().enumerate() {
                    prompt.push_str(&format!("{}. {name}\n", i + 1));
                }
                prompt.push_str(match verb {
                    AppVerb::Open => "Which one should I open?",
                    AppVerb::Close => "Which one should I close?",
                });
                let first = names[0].clone();
                self.dialog
                    .set_pending(PendingAction::choice(command(first), names));
                Reply::say(prompt)
            }
        }
    }
}
