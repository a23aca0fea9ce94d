//! Monitors backed by a real display, dispatching to WMI or DDC/CI.

use tracing::debug;
use tracing::warn;

use crate::backend::Backend;
use crate::backend::Route;
use crate::backend::SystemBackend;
use crate::error::Error;
use crate::error::Result;
use crate::monitor::clamp_brightness;
use crate::monitor::BrightnessCell;
use crate::monitor::BrightnessState;
use crate::monitor::MonitorKind;
use crate::monitor::MAX_BRIGHTNESS;

/// Which backends answered the probe at enumeration time. Never re-probed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub internal_backend: bool,
    pub external_backend: bool,
}

/// Who a hardware monitor is, independent of how it is driven.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayIdentity {
    pub id: String,
    pub name: String,
    pub kind: MonitorKind,
    /// The system `HMONITOR`; owned by the system, never closed here
    pub hmonitor: isize,
}

#[derive(Debug)]
pub struct HardwareMonitor<B = SystemBackend> {
    identity: DisplayIdentity,
    capabilities: Capabilities,
    backend: B,
    state: BrightnessCell,
}

impl<B: Backend> HardwareMonitor<B> {
    /// Builds the monitor and seeds its brightness.
    ///
    /// A `seed` from an earlier probe is used as is; otherwise one best-effort
    /// read goes through the monitor's route. A failed read still yields a
    /// monitor, just one without a known value.
    pub fn new(
        identity: DisplayIdentity,
        capabilities: Capabilities,
        backend: B,
        seed: Option<u8>,
    ) -> Self {
        let mut monitor = Self {
            identity,
            capabilities,
            backend,
            state: BrightnessCell::default(),
        };

        let seed = seed.or_else(|| {
            let route = monitor.route()?;
            monitor
                .backend
                .read(route)
                .map_err(|e| debug!(monitor = %monitor.identity.id, error = %e, "seed read failed"))
                .ok()
        });
        monitor.state = BrightnessCell::new(BrightnessState::seeded(
            seed.map(|value| value.min(MAX_BRIGHTNESS)),
        ));
        monitor
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub const fn kind(&self) -> MonitorKind {
        self.identity.kind
    }

    pub const fn identity(&self) -> &DisplayIdentity {
        &self.identity
    }

    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The backend for this monitor's kind, if that backend was available.
    pub const fn route(&self) -> Option<Route> {
        match self.identity.kind {
            MonitorKind::Internal if self.capabilities.internal_backend => Some(Route::Wmi),
            MonitorKind::External if self.capabilities.external_backend => Some(Route::Ddc {
                hmonitor: self.identity.hmonitor,
            }),
            _ => None,
        }
    }

    pub const fn is_controllable(&self) -> bool {
        self.route().is_some()
    }

    /// [`Self::route`], or [`Error::NotControllable`] when there is none.
    pub fn controllable_route(&self) -> Result<Route> {
        self.route().ok_or_else(|| Error::NotControllable {
            id: self.identity.id.clone(),
        })
    }

    /// Reads the brightness live, falling back to the last known value.
    ///
    /// Non-controllable monitors never touch a backend and only return the
    /// last known value. Fails with [`Error::ReadUnavailable`] (or
    /// [`Error::PrivilegeRequired`] if that was the cause) only when no value
    /// was ever known.
    pub fn brightness(&self) -> Result<u8> {
        let Some(route) = self.route() else {
            return self
                .state
                .get()
                .last_known_value
                .ok_or_else(|| Error::ReadUnavailable {
                    id: self.identity.id.clone(),
                });
        };

        match self.backend.read(route) {
            Ok(value) => {
                let value = value.min(MAX_BRIGHTNESS);
                self.state.with(|state| state.record_read(value));
                Ok(value)
            }
            Err(error) => match self.state.with(BrightnessState::record_read_failure) {
                Some(last_known) => {
                    debug!(
                        monitor = %self.identity.id,
                        %error,
                        last_known,
                        "live read failed, returning last known brightness"
                    );
                    Ok(last_known)
                }
                None if matches!(error, Error::PrivilegeRequired) => Err(error),
                None => {
                    warn!(monitor = %self.identity.id, %error, "brightness read failed");
                    Err(Error::ReadUnavailable {
                        id: self.identity.id.clone(),
                    })
                }
            },
        }
    }

    /// Clamps and applies `value`.
    ///
    /// Returns `Ok(false)` when the monitor is not controllable or the backend
    /// rejected the change; only a missing privilege is an error.
    pub fn set_brightness(&self, value: i32) -> Result<bool> {
        let clamped = clamp_brightness(value);
        let route = match self.controllable_route() {
            Ok(route) => route,
            Err(error) => {
                debug!(monitor = %self.identity.id, %error, "ignoring brightness change");
                return Ok(false);
            }
        };

        match self.backend.write(route, clamped) {
            Ok(()) => {
                self.state.with(|state| state.record_write(clamped));
                debug!(monitor = %self.identity.id, value = clamped, "brightness set");
                Ok(true)
            }
            Err(Error::PrivilegeRequired) => Err(Error::PrivilegeRequired),
            Err(error) => {
                warn!(monitor = %self.identity.id, value = clamped, %error, "brightness change failed");
                Ok(false)
            }
        }
    }
}
