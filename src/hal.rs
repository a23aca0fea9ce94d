//! The four operations a binding layer calls.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::backend::system_backends_available;
use crate::cache::ResultCache;
use crate::config::HalConfig;
use crate::enumerate::enumerate;
use crate::error::Error;
use crate::error::Result;
use crate::monitor::Monitor;
use crate::monitor::MonitorRecord;

/// Payload of [`Hal::initialize`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    #[serde(alias = "mockMode")]
    pub simulated: bool,
}

/// Mode selection plus the enumeration cache.
///
/// Calls are synchronous and may block on system services for as long as a
/// WMI or DDC/CI round trip takes; hosts with a latency-sensitive thread should
/// call from a worker. Operations on one monitor are not serialized here.
#[derive(Debug)]
pub struct Hal {
    simulated: AtomicBool,
    cache: ResultCache,
}

impl Default for Hal {
    fn default() -> Self {
        Self::new(&HalConfig::default())
    }
}

impl Hal {
    pub fn new(config: &HalConfig) -> Self {
        Self {
            simulated: AtomicBool::new(config.simulated),
            cache: ResultCache::new(config.cache_ttl()),
        }
    }

    /// Selects simulated or hardware mode and drops the cached enumeration.
    ///
    /// Fails, leaving the mode unchanged, when hardware mode is requested on a
    /// platform without the system backends.
    pub fn initialize(&self, options: Options) -> Result<()> {
        if !options.simulated && !system_backends_available() {
            return Err(Error::unavailable(
                "hardware brightness control is only available on Windows",
            ));
        }

        self.simulated.store(options.simulated, Ordering::SeqCst);
        self.cache.invalidate();
        info!(simulated = options.simulated, "brightness layer initialized");
        Ok(())
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated.load(Ordering::SeqCst)
    }

    /// The current monitor instances, from the cache when it is fresh.
    pub fn monitors(&self) -> Vec<Arc<Monitor>> {
        let simulated = self.is_simulated();
        self.cache.get_or_refresh(|| enumerate(simulated))
    }

    pub fn monitor(&self, id: &str) -> Result<Arc<Monitor>> {
        self.monitors()
            .into_iter()
            .find(|monitor| monitor.id() == id)
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    /// One record per monitor; `current` comes from a read of each.
    pub fn list_monitors(&self) -> Vec<MonitorRecord> {
        self.monitors()
            .iter()
            .map(|monitor| monitor.record())
            .collect()
    }

    pub fn get_brightness(&self, id: &str) -> Result<u8> {
        self.monitor(id)?.brightness()
    }

    /// Clamps `value` to 0..=100 and applies it.
    ///
    /// `Ok(false)` when the monitor is not controllable or the backend call
    /// failed; [`Error::NotFound`] for unknown ids.
    pub fn set_brightness(&self, id: &str, value: i32) -> Result<bool> {
        self.monitor(id)?.set_brightness(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorKind;

    fn simulated_hal() -> Hal {
        Hal::new(&HalConfig {
            simulated: true,
            ..HalConfig::default()
        })
    }

    #[test]
    fn options_accept_legacy_key() {
        let options: Options = serde_json::from_str(r#"{"mockMode": true}"#).unwrap();
        assert!(options.simulated);
        let options: Options = serde_json::from_str("{}").unwrap();
        assert!(!options.simulated);
    }

    #[test]
    fn records_expose_range_and_current() {
        let hal = simulated_hal();
        let records = hal.list_monitors();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, MonitorKind::Internal);
        assert!(records
            .iter()
            .all(|r| r.min == 0 && r.max == 100 && r.current == Some(50)));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let hal = simulated_hal();
        assert!(matches!(
            hal.get_brightness("no_such_id"),
            Err(Error::NotFound(id)) if id == "no_such_id"
        ));
        assert!(matches!(
            hal.set_brightness("no_such_id", 10),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn switching_mode_reenumerates() {
        let hal = simulated_hal();
        assert!(hal.set_brightness("mock_external_0", 10).unwrap());

        hal.initialize(Options { simulated: true }).unwrap();
        assert_eq!(hal.get_brightness("mock_external_0").unwrap(), 50);
    }

    #[cfg(not(windows))]
    #[test]
    fn hardware_mode_is_refused_without_backends() {
        let hal = simulated_hal();
        assert!(matches!(
            hal.initialize(Options { simulated: false }),
            Err(Error::BackendUnavailable(_))
        ));
        assert!(hal.is_simulated());
    }
}
