//! The uniform monitor contract shared by hardware and simulated displays.

use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::hardware::HardwareMonitor;
use crate::simulated::SimulatedMonitor;

/// Lowest brightness any monitor reports, on a percentage scale.
pub const MIN_BRIGHTNESS: u8 = 0;
/// Highest brightness any monitor reports, on a percentage scale.
pub const MAX_BRIGHTNESS: u8 = 100;

/// Clamps an arbitrary integer into `MIN_BRIGHTNESS..=MAX_BRIGHTNESS`.
#[must_use]
pub fn clamp_brightness(value: i32) -> u8 {
    // Lossless: the clamp keeps the value inside u8 range.
    value.clamp(i32::from(MIN_BRIGHTNESS), i32::from(MAX_BRIGHTNESS)) as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    /// The panel built into the machine, driven through WMI
    Internal,
    /// A monitor on a video output, driven through DDC/CI
    External,
}

impl std::fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal => f.write_str("internal"),
            Self::External => f.write_str("external"),
        }
    }
}

/// The externally visible description of one display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub id: String,
    pub name: String,
    #[serde(alias = "type")]
    pub kind: MonitorKind,
    pub min: u8,
    pub max: u8,
    /// `None` until the monitor has produced (or been set to) a value
    pub current: Option<u8>,
}

/// Last known brightness of one monitor.
///
/// Only the write path and the read path touch this: a successful read or
/// write replaces `last_known_value`, a failed read only clears
/// `last_read_succeeded` and hands back whatever value was known before.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BrightnessState {
    pub last_known_value: Option<u8>,
    pub last_read_succeeded: bool,
}

impl BrightnessState {
    pub const fn seeded(value: Option<u8>) -> Self {
        Self {
            last_known_value: value,
            last_read_succeeded: value.is_some(),
        }
    }

    pub fn record_read(&mut self, value: u8) {
        self.last_known_value = Some(value);
        self.last_read_succeeded = true;
    }

    pub fn record_read_failure(&mut self) -> Option<u8> {
        self.last_read_succeeded = false;
        self.last_known_value
    }

    pub fn record_write(&mut self, value: u8) {
        self.last_known_value = Some(value);
    }
}

/// `BrightnessState` behind a lock so shared instances can be read and
/// written through `&self`.
#[derive(Debug, Default)]
pub(crate) struct BrightnessCell(Mutex<BrightnessState>);

impl BrightnessCell {
    pub const fn new(state: BrightnessState) -> Self {
        Self(Mutex::new(state))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut BrightnessState) -> R) -> R {
        // The state is two plain fields, a panic mid-update cannot leave it torn.
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn get(&self) -> BrightnessState {
        self.with(|state| *state)
    }
}

/// One display, either backed by real hardware or simulated in memory.
#[derive(Debug)]
pub enum Monitor {
    Hardware(HardwareMonitor),
    Simulated(SimulatedMonitor),
}

impl Monitor {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Hardware(m) => m.id(),
            Self::Simulated(m) => m.id(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Hardware(m) => m.name(),
            Self::Simulated(m) => m.name(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> MonitorKind {
        match self {
            Self::Hardware(m) => m.kind(),
            Self::Simulated(m) => m.kind(),
        }
    }

    #[must_use]
    pub fn describe(&self) -> (&str, MonitorKind) {
        (self.name(), self.kind())
    }

    /// Always `(0, 100)`.
    #[must_use]
    pub const fn range(&self) -> (u8, u8) {
        (MIN_BRIGHTNESS, MAX_BRIGHTNESS)
    }

    /// Reads the current brightness.
    ///
    /// Hardware monitors try a live read and fall back to the last known
    /// value when the backend fails; see [`HardwareMonitor::brightness`].
    pub fn brightness(&self) -> Result<u8> {
        match self {
            Self::Hardware(m) => m.brightness(),
            Self::Simulated(m) => Ok(m.brightness()),
        }
    }

    /// Clamps `value` into the monitor's range and applies it.
    ///
    /// `Ok(false)` means the change could not be applied, which is an
    /// expected outcome for monitors without a working backend.
    pub fn set_brightness(&self, value: i32) -> Result<bool> {
        match self {
            Self::Hardware(m) => m.set_brightness(value),
            Self::Simulated(m) => Ok(m.set_brightness(value)),
        }
    }

    #[must_use]
    pub fn is_controllable(&self) -> bool {
        match self {
            Self::Hardware(m) => m.is_controllable(),
            Self::Simulated(m) => m.is_controllable(),
        }
    }

    /// Whether `other` describes the same device driven the same way, so one
    /// instance can stand in for the other across enumerations.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Hardware(a), Self::Hardware(b)) => {
                a.identity() == b.identity() && a.capabilities() == b.capabilities()
            }
            (Self::Simulated(a), Self::Simulated(b)) => {
                a.id() == b.id() && a.name() == b.name() && a.kind() == b.kind()
            }
            _ => false,
        }
    }

    /// Snapshots the monitor, doing one read to fill `current`.
    pub fn record(&self) -> MonitorRecord {
        let (min, max) = self.range();
        MonitorRecord {
            id: self.id().to_owned(),
            name: self.name().to_owned(),
            kind: self.kind(),
            min,
            max,
            current: self.brightness().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_values_in_range() {
        assert_eq!(clamp_brightness(-999), 0);
        assert_eq!(clamp_brightness(-1), 0);
        assert_eq!(clamp_brightness(0), 0);
        assert_eq!(clamp_brightness(42), 42);
        assert_eq!(clamp_brightness(100), 100);
        assert_eq!(clamp_brightness(101), 100);
        assert_eq!(clamp_brightness(i32::MAX), 100);
        assert_eq!(clamp_brightness(i32::MIN), 0);
    }

    #[test]
    fn failed_read_keeps_last_value_and_marks_stale() {
        let mut state = BrightnessState::seeded(Some(30));
        assert!(state.last_read_succeeded);

        assert_eq!(state.record_read_failure(), Some(30));
        assert!(!state.last_read_succeeded);
        assert_eq!(state.last_known_value, Some(30));

        state.record_read(55);
        assert!(state.last_read_succeeded);
        assert_eq!(state.last_known_value, Some(55));
    }

    #[test]
    fn write_updates_value_without_touching_read_flag() {
        let mut state = BrightnessState::seeded(None);
        assert_eq!(state.record_read_failure(), None);

        state.record_write(80);
        assert_eq!(state.last_known_value, Some(80));
        assert!(!state.last_read_succeeded);
    }

    #[test]
    fn kind_serializes_lowercase() {
        let record = MonitorRecord {
            id: "internal_0".to_owned(),
            name: "Internal Display".to_owned(),
            kind: MonitorKind::Internal,
            min: 0,
            max: 100,
            current: Some(40),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "internal");
        assert_eq!(json["current"], 40);

        let parsed: MonitorRecord = serde_json::from_str(
            r#"{"id":"x","name":"y","type":"external","min":0,"max":100,"current":null}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind, MonitorKind::External);
        assert_eq!(parsed.current, None);
    }
}
