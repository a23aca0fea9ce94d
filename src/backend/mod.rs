//! The two system services behind hardware monitors: WMI for the internal
//! panel and DDC/CI for external displays.

#[cfg(windows)]
mod ddc;
#[cfg(windows)]
mod internal;
#[cfg_attr(not(windows), allow(dead_code))]
mod vcp;
#[cfg_attr(not(windows), allow(dead_code))]
mod wmi_classes;

use crate::error::Result;
#[cfg(not(windows))]
use crate::error::Error;

/// Which service (and which display, for DDC/CI) an operation goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// `WmiMonitorBrightness` / `WmiMonitorBrightnessMethods` in `ROOT\WMI`
    Wmi,
    /// DDC/CI on the first physical monitor behind this `HMONITOR`
    Ddc { hmonitor: isize },
}

/// Reads and writes brightness on a percentage scale.
///
/// Implementations report failures as errors and never retry; callers decide
/// whether a failure degrades to a cached value.
pub trait Backend {
    fn read(&self, route: Route) -> Result<u8>;
    fn write(&self, route: Route, value: u8) -> Result<()>;
}

impl<T: Backend + ?Sized> Backend for &T {
    fn read(&self, route: Route) -> Result<u8> {
        (**self).read(route)
    }

    fn write(&self, route: Route, value: u8) -> Result<()> {
        (**self).write(route, value)
    }
}

/// The real services of the host system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBackend;

#[cfg(windows)]
impl Backend for SystemBackend {
    fn read(&self, route: Route) -> Result<u8> {
        match route {
            Route::Wmi => internal::read_brightness().map_err(Into::into),
            Route::Ddc { hmonitor } => ddc::read_brightness(hmonitor).map_err(Into::into),
        }
    }

    fn write(&self, route: Route, value: u8) -> Result<()> {
        match route {
            Route::Wmi => internal::write_brightness(value).map_err(Into::into),
            Route::Ddc { hmonitor } => ddc::write_brightness(hmonitor, value).map_err(Into::into),
        }
    }
}

#[cfg(not(windows))]
const UNSUPPORTED: &str = "WMI and DDC/CI brightness control is only available on Windows";

#[cfg(not(windows))]
impl Backend for SystemBackend {
    fn read(&self, _route: Route) -> Result<u8> {
        Err(Error::unavailable(UNSUPPORTED))
    }

    fn write(&self, _route: Route, _value: u8) -> Result<()> {
        Err(Error::unavailable(UNSUPPORTED))
    }
}

/// Whether this build can reach the hardware services at all.
pub const fn system_backends_available() -> bool {
    cfg!(windows)
}
