//! `ROOT\WMI` classes used for the internal panel, and which instance a write targets.

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::monitor::MAX_BRIGHTNESS;

/// Seconds the panel may take to reach the new level; zero applies it at once.
const TRANSITION_TIMEOUT: u32 = 0;

#[derive(Deserialize, Debug)]
#[serde(rename = "WmiMonitorBrightness")]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WmiMonitorBrightness {
    pub current_brightness: u8,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename = "WmiMonitorBrightnessMethods")]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WmiMonitorBrightnessMethods {
    #[serde(rename = "__Path")]
    pub path: String,
    pub active: Option<bool>,
    pub instance_name: Option<String>,
}

/// In-parameters of `WmiMonitorBrightnessMethods.WmiSetBrightness`, typed as the
/// class declares them: `uint32 Timeout`, `uint8 Brightness`.
#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WmiSetBrightnessParams {
    pub timeout: u32,
    pub brightness: u8,
}

impl WmiSetBrightnessParams {
    pub fn immediate(brightness: u8) -> Self {
        Self {
            timeout: TRANSITION_TIMEOUT,
            brightness: brightness.min(MAX_BRIGHTNESS),
        }
    }
}

/// The first instance that is not explicitly inactive.
///
/// An instance without an `Active` property counts as active.
pub(crate) fn first_active(
    instances: impl IntoIterator<Item = WmiMonitorBrightnessMethods>,
) -> Option<WmiMonitorBrightnessMethods> {
    instances.into_iter().find(|instance| {
        let active = instance.active.unwrap_or(true);
        if !active {
            debug!(instance = ?instance.instance_name, "skipping inactive brightness methods");
        }
        active
    })
}
