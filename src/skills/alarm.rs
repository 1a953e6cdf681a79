//! One-shot daily alarm.
//!
//! At most one alarm is armed. Each alarm gets a named timer thread that
//! waits on a cancellation channel; dropping the sender (cancel or re-arm)
//! wakes the thread early without ringing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use tracing::{info, warn};

/// Called with `(hour, minute)` when an alarm rings.
pub type RingCallback = Arc<dyn Fn(u8, u8) + Send + Sync>;

#[derive(Default)]
struct Armed {
    time: Option<(u8, u8)>,
    generation: u64,
    cancel: Option<Sender<()>>,
}

/// Single-slot alarm clock.
pub struct AlarmClock {
    slot: Arc<Mutex<Armed>>,
    on_ring: RingCallback,
}

impl std::fmt::Debug for AlarmClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmClock")
            .field("time", &lock(&self.slot).time)
            .finish_non_exhaustive()
    }
}

fn lock(slot: &Mutex<Armed>) -> MutexGuard<'_, Armed> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Time from `now` until the next `hour:minute` (tomorrow if already past).
pub fn delay_until(now: NaiveDateTime, hour: u8, minute: u8) -> Option<Duration> {
    let today = now
        .date()
        .and_hms_opt(u32::from(hour), u32::from(minute), 0)?;
    let target = if today <= now {
        today.checked_add_signed(TimeDelta::days(1))?
    } else {
        today
    };
    (target - now).to_std().ok()
}

impl AlarmClock {
    pub fn new(on_ring: RingCallback) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Armed::default())),
            on_ring,
        }
    }

    /// Arm the alarm for the next `hour:minute` local time, replacing any
    /// existing alarm.
    pub fn set(&self, hour: u8, minute: u8) -> String {
        let now = chrono::Local::now().naive_local();
        let Some(delay) = delay_until(now, hour, minute) else {
            return "Please tell me a valid time for the alarm.".to_owned();
        };
        self.arm(hour, minute, delay)
    }

    fn arm(&self, hour: u8, minute: u8, delay: Duration) -> String {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let generation = {
            let mut slot = lock(&self.slot);
            slot.generation = slot.generation.wrapping_add(1);
            slot.time = Some((hour, minute));
            // Dropping the previous sender disarms its timer thread.
            slot.cancel = Some(cancel_tx);
            slot.generation
        };

        let slot = Arc::clone(&self.slot);
        let on_ring = Arc::clone(&self.on_ring);
        let spawned = std::thread::Builder::new()
            .name("orbit-alarm".to_owned())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(delay) {
                    {
                        let mut armed = lock(&slot);
                        if armed.generation != generation {
                            return;
                        }
                        armed.time = None;
                        armed.cancel = None;
                    }
                    info!(hour, minute, "alarm ringing");
                    on_ring(hour, minute);
                }
            });

        if let Err(e) = spawned {
            warn!(error = %e, "failed to start alarm timer");
            let mut armed = lock(&self.slot);
            armed.time = None;
            armed.cancel = None;
            return "I could not set the alarm.".to_owned();
        }

        info!(hour, minute, delay_secs = delay.as_secs(), "alarm set");
        format!("Alarm set for {hour:02}:{minute:02}.")
    }

    pub fn cancel(&self) -> String {
        let mut armed = lock(&self.slot);
        if armed.time.take().is_none() {
            return "No alarm is currently set.".to_owned();
        }
        armed.generation = armed.generation.wrapping_add(1);
        armed.cancel = None;
        info!("alarm cancelled");
        "Alarm cancelled.".to_owned()
    }

    pub fn status(&self) -> String {
        match lock(&self.slot).time {
            Some((h, m)) => format!("Alarm is set for {h:02}:{m:02}."),
            None => "No alarm is currently set.".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn recording() -> (AlarmClock, crossbeam_channel::Receiver<(u8, u8)>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let clock = AlarmClock::new(Arc::new(move |h, m| {
            let _ = tx.send((h, m));
        }));
        (clock, rx)
    }

    #[test]
    fn delay_later_today() {
        assert_eq!(
            delay_until(at(8, 0), 9, 30),
            Some(Duration::from_secs(90 * 60))
        );
    }

    #[test]
    fn delay_rolls_to_tomorrow() {
        assert_eq!(
            delay_until(at(18, 0), 17, 0),
            Some(Duration::from_secs(23 * 3600))
        );
        // Exactly now means tomorrow, not immediately.
        assert_eq!(
            delay_until(at(7, 0), 7, 0),
            Some(Duration::from_secs(24 * 3600))
        );
    }

    #[test]
    fn delay_rejects_invalid_time() {
        assert_eq!(delay_until(at(7, 0), 24, 0), None);
        assert_eq!(delay_until(at(7, 0), 7, 60), None);
    }

    #[test]
    fn armed_alarm_rings_once() {
        let (clock, rang) = recording();
        assert_eq!(
            clock.arm(6, 5, Duration::from_millis(20)),
            "Alarm set for 06:05."
        );
        assert_eq!(clock.status(), "Alarm is set for 06:05.");
        assert_eq!(rang.recv_timeout(Duration::from_secs(2)).unwrap(), (6, 5));
        assert_eq!(clock.status(), "No alarm is currently set.");
        assert!(rang.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn cancelled_alarm_never_rings() {
        let (clock, rang) = recording();
        clock.arm(7, 0, Duration::from_millis(150));
        assert_eq!(clock.cancel(), "Alarm cancelled.");
        assert!(rang.recv_timeout(Duration::from_millis(400)).is_err());
        assert_eq!(clock.cancel(), "No alarm is currently set.");
    }

    #[test]
    fn rearming_replaces_previous_alarm() {
        let (clock, rang) = recording();
        clock.arm(7, 0, Duration::from_millis(150));
        clock.arm(8, 15, Duration::from_millis(20));
        assert_eq!(rang.recv_timeout(Duration::from_secs(2)).unwrap(), (8, 15));
        assert!(rang.recv_timeout(Duration::from_millis(400)).is_err());
    }
}
