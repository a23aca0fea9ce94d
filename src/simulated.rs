//! In-memory monitors for running without display hardware.

use tracing::debug;

use crate::monitor::clamp_brightness;
use crate::monitor::BrightnessCell;
use crate::monitor::BrightnessState;
use crate::monitor::MonitorKind;

/// Brightness every simulated fixture starts at.
pub const DEFAULT_SIMULATED_BRIGHTNESS: u8 = 50;

/// A monitor whose brightness lives only in memory. Reads and writes always
/// succeed.
#[derive(Debug)]
pub struct SimulatedMonitor {
    id: String,
    name: String,
    kind: MonitorKind,
    state: BrightnessCell,
}

impl SimulatedMonitor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: MonitorKind,
        initial_brightness: i32,
    ) -> Self {
        let id = id.into();
        let name = name.into();
        let initial = clamp_brightness(initial_brightness);
        debug!(monitor = %id, %name, %kind, brightness = initial, "simulated monitor created");

        Self {
            id,
            name,
            kind,
            state: BrightnessCell::new(BrightnessState::seeded(Some(initial))),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> MonitorKind {
        self.kind
    }

    pub fn brightness(&self) -> u8 {
        let value = self
            .state
            .get()
            .last_known_value
            .unwrap_or(DEFAULT_SIMULATED_BRIGHTNESS);
        debug!(monitor = %self.id, value, "simulated brightness read");
        value
    }

    pub fn set_brightness(&self, value: i32) -> bool {
        let clamped = clamp_brightness(value);
        if i32::from(clamped) != value {
            debug!(monitor = %self.id, requested = value, clamped, "simulated brightness clamped");
        }
        self.state.with(|state| state.record_write(clamped));
        debug!(monitor = %self.id, value = clamped, "simulated brightness set");
        true
    }

    pub const fn is_controllable(&self) -> bool {
        true
    }
}

/// The fixed simulated set: one internal and two external displays, in that
/// order, all at [`DEFAULT_SIMULATED_BRIGHTNESS`].
pub fn fixtures() -> Vec<SimulatedMonitor> {
    let initial = i32::from(DEFAULT_SIMULATED_BRIGHTNESS);
    vec![
        SimulatedMonitor::new(
            "mock_internal_0",
            "Mock Internal Display",
            MonitorKind::Internal,
            initial,
        ),
        SimulatedMonitor::new(
            "mock_external_0",
            "Mock External Display 1",
            MonitorKind::External,
            initial,
        ),
        SimulatedMonitor::new(
            "mock_external_1",
            "Mock External Display 2",
            MonitorKind::External,
            initial,
        ),
    ]
}
