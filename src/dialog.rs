//! Confirm / cancel / select / undo dialog.
//!
//! Holds at most one [`PendingAction`] awaiting the user's answer and at
//! most one confirmed action kept for a single undo. Every operation
//! answers with a sentence; misuse (nothing pending, bad option) yields a
//! fixed message and leaves the state untouched.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::skills::{SkillCommand, SkillOutcome};

pub const NOTHING_TO_CONFIRM: &str = "There is nothing to confirm.";
pub const CANCELLED: &str = "Cancelled.";
pub const NOTHING_TO_UNDO: &str = "There is nothing to undo.";
pub const NOTHING_TO_SELECT: &str = "There is nothing to select.";
pub const NO_SUCH_OPTION: &str = "That option does not exist.";

/// Runs a [`SkillCommand`] and phrases the outcome.
pub trait ActionExecutor {
    fn execute(&self, command: &SkillCommand) -> SkillOutcome;
}

/// A deferred operation waiting for confirmation or a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub description: String,
    pub command: SkillCommand,
    pub undo: Option<SkillCommand>,
    /// Choices offered to the user, in spoken order.
    #[serde(default)]
    pub options: Vec<String>,
}

impl PendingAction {
    /// A confirmable action whose undo is the command's inverse.
    pub fn reversible(command: SkillCommand) -> Self {
        Self {
            description: command.describe(),
            undo: command.inverse(),
            command,
            options: Vec::new(),
        }
    }

    /// A choice between `options`; confirming without choosing runs `command`.
    pub fn choice(command: SkillCommand, options: Vec<String>) -> Self {
        Self {
            description: command.describe(),
            command,
            undo: None,
            options,
        }
    }
}

/// Dialog slots.
#[derive(Debug, Default)]
pub struct DialogState {
    pending: Option<PendingAction>,
    last_action: Option<PendingAction>,
}

impl DialogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn last_action(&self) -> Option<&PendingAction> {
        self.last_action.as_ref()
    }

    /// Replace any pending action. The replaced one is discarded, not
    /// promoted to the undo slot.
    pub fn set_pending(&mut self, action: PendingAction) {
        if let Some(old) = &self.pending {
            debug!(discarded = %old.description, "pending action replaced");
        }
        info!(action = %action.description, options = action.options.len(), "awaiting confirmation");
        self.pending = Some(action);
    }

    /// Run the pending action and keep it for undo.
    ///
    /// An action the skill refused or could not complete is not kept, and
    /// clears any older undo target.
    pub fn confirm(&mut self, executor: &dyn ActionExecutor) -> String {
        let Some(action) = self.pending.take() else {
            return NOTHING_TO_CONFIRM.to_owned();
        };
        info!(action = %action.description, "confirmed");
        let outcome = executor.execute(&action.command);
        if outcome.applied {
            self.last_action = Some(action);
        } else {
            debug!(action = %action.description, "confirmed action changed nothing");
            self.last_action = None;
        }
        outcome.message
    }

    /// Drop the pending action without running it.
    pub fn cancel(&mut self) -> String {
        if let Some(action) = self.pending.take() {
            info!(action = %action.description, "cancelled");
        }
        CANCELLED.to_owned()
    }

    /// Pick option `index` (zero-based) and confirm it.
    ///
    /// An out-of-range index keeps the pending action so the user can
    /// choose again.
    pub fn select(&mut self, index: usize, executor: &dyn ActionExecutor) -> String {
        let Some(action) = self.pending.as_mut() else {
            return NOTHING_TO_SELECT.to_owned();
        };
        if action.options.is_empty() {
            return NOTHING_TO_SELECT.to_owned();
        }
        let Some(label) = action.options.get(index).cloned() else {
            debug!(index, available = action.options.len(), "selection out of range");
            return NO_SUCH_OPTION.to_owned();
        };
        action.command = action.command.with_choice(&label);
        action.description = action.command.describe();
        self.confirm(executor)
    }

    /// Reverse the last confirmed action, once.
    pub fn undo(&mut self, executor: &dyn ActionExecutor) -> String {
        let Some(undo) = self.last_action.as_ref().and_then(|a| a.undo.clone()) else {
            return NOTHING_TO_UNDO.to_owned();
        };
        self.last_action = None;
        info!(action = %undo.describe(), "undoing last action");
        executor.execute(&undo).message
    }
}
