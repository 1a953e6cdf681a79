//! Skill set for a desktop host: working-directory files, process launch
//! and termination, volume through `pactl`, and an in-process alarm.

use std::process::{Command, Stdio};

use orbit_apps::{AppCandidate, AppKind};
use tracing::{debug, warn};

use super::{AlarmClock, FileControl, Listing, SkillOutcome, SkillSet};

const VOLUME_STEP: &str = "10%";

/// Host-backed [`SkillSet`].
#[derive(Debug)]
pub struct DesktopSkills {
    files: FileControl,
    alarm: AlarmClock,
}

impl DesktopSkills {
    pub fn new(files: FileControl, alarm: AlarmClock) -> Self {
        Self { files, alarm }
    }

    pub fn files(&self) -> &FileControl {
        &self.files
    }
}

/// Split a launch command into program and arguments.
fn split_command(command: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Executable file name for a process-kill lookup.
fn executable_name(program: &str) -> Option<String> {
    std::path::Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

fn launch(app: &AppCandidate) -> std::io::Result<()> {
    let mut command = match app.kind {
        AppKind::Uwp => {
            let mut c = Command::new("explorer");
            c.arg(format!("shell:AppsFolder\\{}", app.launch_command));
            c
        }
        AppKind::Win32 => Command::new(&app.launch_command),
        AppKind::Desktop => {
            let Some((program, args)) = split_command(&app.launch_command) else {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "empty launch command",
                ));
            };
            let mut c = Command::new(program);
            c.args(args);
            c
        }
    };
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    // Reap the child so it does not linger as a zombie.
    std::thread::Builder::new()
        .name("orbit-app-reaper".to_owned())
        .spawn(move || {
            let _ = child.wait();
        })?;
    Ok(())
}

fn run_quiet(program: &str, args: &[&str]) -> std::io::Result<bool> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    Ok(status.success())
}

fn pactl(args: &[&str]) -> bool {
    match run_quiet("pactl", args) {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "pactl unavailable");
            false
        }
    }
}

impl SkillSet for DesktopSkills {
    fn create_file(&self, name: &str) -> SkillOutcome {
        self.files.create_file(name)
    }

    fn delete_file(&self, name: &str) -> SkillOutcome {
        self.files.delete_file(name)
    }

    fn create_folder(&self, name: &str) -> SkillOutcome {
        self.files.create_folder(name)
    }

    fn delete_folder(&self, name: &str) -> SkillOutcome {
        self.files.delete_folder(name)
    }

    fn list_items(&self) -> Listing {
        self.files.list_items()
    }

    fn navigate_in(&self, folder: &str) -> String {
        self.files.navigate_in(folder)
    }

    fn navigate_out(&self) -> String {
        self.files.navigate_out()
    }

    fn open_application(&self, app: &AppCandidate) -> String {
        match launch(app) {
            Ok(()) => {
                debug!(app = %app.name, kind = %app.kind, "application launched");
                format!("Opening {}.", app.name)
            }
            Err(e) => {
                warn!(app = %app.name, error = %e, "application launch failed");
                format!("I couldn't open {}.", app.name)
            }
        }
    }

    fn close_application(&self, app: &AppCandidate) -> String {
        let outcome = match app.kind {
            AppKind::Uwp => return format!("I cannot safely close {}.", app.name),
            AppKind::Win32 => match executable_name(&app.launch_command) {
                Some(exe) if exe.to_lowercase().ends_with(".exe") => {
                    run_quiet("taskkill", &["/f", "/im", &exe])
                }
                _ => return format!("I cannot determine how to close {}.", app.name),
            },
            AppKind::Desktop => {
                match split_command(&app.launch_command).and_then(|(p, _)| executable_name(p)) {
                    Some(exe) => run_quiet("pkill", &["-x", &exe]),
                    None => return format!("I cannot determine how to close {}.", app.name),
                }
            }
        };
        match outcome {
            Ok(true) => format!("Closed {}.", app.name),
            Ok(false) => format!("{} does not appear to be running.", app.name),
            Err(e) => {
                warn!(app = %app.name, error = %e, "application close failed");
                format!("I couldn't close {}.", app.name)
            }
        }
    }

    fn set_volume(&self, level: u8) -> String {
        let level = level.min(100);
        if pactl(&["set-sink-volume", "@DEFAULT_SINK@", &format!("{level}%")]) {
            format!("Volume set to {level} percent.")
        } else {
            "I could not change the volume.".to_owned()
        }
    }

    fn increase_volume(&self) -> String {
        if pactl(&["set-sink-volume", "@DEFAULT_SINK@", &format!("+{VOLUME_STEP}")]) {
            "Volume increased.".to_owned()
        } else {
            "I could not change the volume.".to_owned()
        }
    }

    fn decrease_volume(&self) -> String {
        if pactl(&["set-sink-volume", "@DEFAULT_SINK@", &format!("-{VOLUME_STEP}")]) {
            "Volume decreased.".to_owned()
        } else {
            "I could not change the volume.".to_owned()
        }
    }

    fn mute(&self) -> String {
        if pactl(&["set-sink-mute", "@DEFAULT_SINK@", "1"]) {
            "Volume muted.".to_owned()
        } else {
            "I could not mute the volume.".to_owned()
        }
    }

    fn unmute(&self) -> String {
        if pactl(&["set-sink-mute", "@DEFAULT_SINK@", "0"]) {
            "Volume unmuted.".to_owned()
        } else {
            "I could not unmute the volume.".to_owned()
        }
    }

    fn set_alarm(&self, hour: u8, minute: u8) -> String {
        self.alarm.set(hour, minute)
    }

    fn cancel_alarm(&self) -> String {
        self.alarm.cancel()
    }

    fn alarm_status(&self) -> String {
        self.alarm.status()
    }
}
