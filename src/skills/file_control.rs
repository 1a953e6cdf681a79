//! Working-directory file skill.
//!
//! Owns its current directory (no process-wide state). All operations are
//! relative to that directory and answer with a sentence; the mutating ones
//! also report whether anything on disk changed.

use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{Listing, SkillOutcome};

/// File and folder operations rooted at a movable working directory.
#[derive(Debug)]
pub struct FileControl {
    cwd: Mutex<PathBuf>,
}

fn folder_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl FileControl {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Mutex::new(base.into()),
        }
    }

    /// Start in the process's current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    fn lock(&self) -> MutexGuard<'_, PathBuf> {
        self.cwd.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_dir(&self) -> PathBuf {
        self.lock().clone()
    }

    /// Resolve `name` below the working directory. Absolute paths and `..`
    /// are rejected.
    fn resolve(cwd: &Path, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        if name.trim().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(cwd.join(relative))
    }

    pub fn create_file(&self, name: &str) -> SkillOutcome {
        let cwd = self.lock();
        let folder = folder_label(&cwd);
        let Some(path) = Self::resolve(&cwd, name) else {
            return SkillOutcome::unchanged(format!("{name} is not a valid file name."));
        };
        if path.exists() {
            return SkillOutcome::unchanged(format!(
                "The file named {name} already exists in the folder {folder}."
            ));
        }
        match std::fs::File::create(&path) {
            Ok(_) => {
                debug!(path = %path.display(), "file created");
                SkillOutcome::done(format!(
                    "A new file named {name} has been created in the folder {folder}."
                ))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "create file failed");
                SkillOutcome::unchanged(format!("I could not create the file {name}."))
            }
        }
    }

    pub fn delete_file(&self, name: &str) -> SkillOutcome {
        let cwd = self.lock();
        let folder = folder_label(&cwd);
        let Some(path) = Self::resolve(&cwd, name) else {
            return SkillOutcome::unchanged(format!("{name} is not a valid file name."));
        };
        if !path.exists() {
            return SkillOutcome::unchanged(format!("I could not find a file named {name}."));
        }
        if path.is_dir() {
            return SkillOutcome::unchanged(format!("{name} is a folder, not a file."));
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "file deleted");
                SkillOutcome::done(format!(
                    "The file named {name} has been successfully deleted from {folder}."
                ))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "delete file failed");
                SkillOutcome::unchanged(format!("I could not delete the file {name}."))
            }
        }
    }

    pub fn create_folder(&self, name: &str) -> SkillOutcome {
        let cwd = self.lock();
        let folder = folder_label(&cwd);
        let Some(path) = Self::resolve(&cwd, name) else {
            return SkillOutcome::unchanged(format!("{name} is not a valid folder name."));
        };
        if path.exists() {
            return SkillOutcome::unchanged(format!("Folder '{name}' already exists."));
        }
        match std::fs::create_dir(&path) {
            Ok(()) => {
                SkillOutcome::done(format!("Folder '{name}' created in the parent folder {folder}."))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "create folder failed");
                SkillOutcome::unchanged(format!("I could not create the folder {name}."))
            }
        }
    }

    pub fn delete_folder(&self, name: &str) -> SkillOutcome {
        let cwd = self.lock();
        let Some(path) = Self::resolve(&cwd, name) else {
            return SkillOutcome::unchanged(format!("{name} is not a valid folder name."));
        };
        if !path.is_dir() {
            return SkillOutcome::unchanged(format!("Folder '{name}' not found."));
        }
        match std::fs::remove_dir_all(&path) {
            Ok(()) => SkillOutcome::done(format!("Folder '{name}' deleted.")),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "delete folder failed");
                SkillOutcome::unchanged(format!("I could not delete the folder {name}."))
            }
        }
    }

    /// Entries of the working directory, sorted; folders end with `/`.
    pub fn list_items(&self) -> Listing {
        let cwd = self.lock();
        let folder = folder_label(&cwd);
        let entries = match std::fs::read_dir(&*cwd) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %cwd.display(), error = %e, "list folder failed");
                return Listing {
                    summary: format!("I could not read the folder {folder}."),
                    items: Vec::new(),
                };
            }
        };

        let mut items: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    format!("{name}/")
                } else {
                    name
                }
            })
            .collect();
        items.sort_by_key(|name| name.to_lowercase());

        let summary = match items.len() {
            0 => "The selected folder is empty.".to_owned(),
            1 => format!("There is 1 item in {folder}."),
            n => format!("There are {n} items in {folder}."),
        };
        Listing { summary, items }
    }

    pub fn navigate_in(&self, folder: &str) -> String {
        let mut cwd = self.lock();
        let Some(target) = Self::resolve(&cwd, folder) else {
            return format!("I could not find a folder named {folder}.");
        };
        if !target.exists() {
            return format!("I could not find a folder named {folder}.");
        }
        if !target.is_dir() {
            return format!("{folder} is not a folder.");
        }
        debug!(path = %target.display(), "working directory changed");
        *cwd = target;
        format!("I have moved into the folder {folder}.")
    }

    pub fn navigate_out(&self) -> String {
        let mut cwd = self.lock();
        let Some(parent) = cwd.parent().map(Path::to_path_buf) else {
            return "You are already at the root directory.".to_owned();
        };
        debug!(path = %parent.display(), "working directory changed");
        *cwd = parent;
        format!("I have moved back to the folder {}.", folder_label(&cwd))
    }
}
