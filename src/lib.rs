//! Display brightness for every monitor on the machine behind one contract.
//!
//! The internal panel is driven through WMI and external monitors through DDC/CI. In simulated
//! mode a fixed set of in-memory monitors stands in for the hardware.
//!
//! ```
//! brightness_hal::initialize(brightness_hal::Options { simulated: true }).unwrap();
//! let monitors = brightness_hal::list_monitors();
//! assert!(brightness_hal::set_brightness(&monitors[0].id, 75).unwrap());
//! assert_eq!(brightness_hal::get_brightness(&monitors[0].id).unwrap(), 75);
//! ```

mod backend;
mod cache;
pub mod config;
#[cfg(windows)]
mod device;
mod enumerate;
pub mod error;
mod hal;
mod hardware;
pub mod logging;
mod monitor;
mod simulated;

use std::sync::OnceLock;

pub use backend::Backend;
pub use backend::Route;
pub use backend::SystemBackend;
pub use cache::ResultCache;
pub use cache::FRESHNESS_WINDOW;
pub use config::HalConfig;
pub use enumerate::assemble;
pub use enumerate::classify;
pub use enumerate::enumerate;
pub use enumerate::DisplaySurface;
pub use enumerate::INTERNAL_ID;
pub use error::Error;
pub use error::Result;
pub use hal::Hal;
pub use hal::Options;
pub use hardware::Capabilities;
pub use hardware::DisplayIdentity;
pub use hardware::HardwareMonitor;
pub use monitor::clamp_brightness;
pub use monitor::Monitor;
pub use monitor::MonitorKind;
pub use monitor::MonitorRecord;
pub use monitor::MAX_BRIGHTNESS;
pub use monitor::MIN_BRIGHTNESS;
pub use simulated::SimulatedMonitor;
pub use simulated::DEFAULT_SIMULATED_BRIGHTNESS;

static HAL: OnceLock<Hal> = OnceLock::new();

/// The process-wide instance behind the free functions below, created on first use from
/// [`HalConfig::default`].
pub fn hal() -> &'static Hal {
    HAL.get_or_init(Hal::default)
}

pub fn initialize(options: Options) -> Result<()> {
    hal().initialize(options)
}

pub fn list_monitors() -> Vec<MonitorRecord> {
    hal().list_monitors()
}

pub fn get_brightness(id: &str) -> Result<u8> {
    hal().get_brightness(id)
}

pub fn set_brightness(id: &str, value: i32) -> Result<bool> {
    hal().set_brightness(id, value)
}
