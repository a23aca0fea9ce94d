#![warn(clippy::all, clippy::nursery, clippy::pedantic)]

use std::error::Error as StdError;

use thiserror::Error;
#[cfg(windows)]
use windows::core::Error as WinError;
#[cfg(windows)]
use wmi::WMIError;

/// Errors used in this API
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The monitor id is not part of the current enumeration
    #[error("Monitor not found: {0}")]
    NotFound(String),
    /// The system service behind a monitor could not be reached or initialized
    #[error("Brightness backend unavailable: {0}")]
    BackendUnavailable(#[source] Box<dyn StdError + Send + Sync>),
    /// Internal display control needs an elevated process
    #[error(
        "Internal display brightness control requires administrator privileges, run the \
         process elevated"
    )]
    PrivilegeRequired,
    /// A live read failed and no earlier value exists to fall back to
    #[error("No brightness value is available for monitor {id}")]
    ReadUnavailable { id: String },
    /// The monitor has no working backend for its kind
    #[error("Monitor {id} does not support brightness control")]
    NotControllable { id: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn unavailable(reason: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::BackendUnavailable(reason.into())
    }
}

#[derive(Debug, Error)]
#[cfg(windows)]
pub(crate) enum SysError {
    #[error("Failed to enumerate device monitors")]
    EnumDisplayMonitorsFailed(#[source] WinError),
    #[error("Failed to get display config buffer sizes")]
    GetDisplayConfigBufferSizesFailed(#[source] WinError),
    #[error("Failed to query display config")]
    QueryDisplayConfigFailed(#[source] WinError),
    #[error("Failed to get display config device info")]
    DisplayConfigGetDeviceInfoFailed(#[source] WinError),
    #[error("Failed to get monitor info")]
    GetMonitorInfoFailed(#[source] WinError),
    #[error("Failed to get physical monitors from the HMONITOR")]
    GetPhysicalMonitorsFailed(#[source] WinError),
    #[error("The HMONITOR is not backed by any physical monitor")]
    NoPhysicalMonitors,
    #[error("The monitor did not answer a DDC/CI brightness query")]
    DdcReadFailed,
    #[error("The monitor rejected a DDC/CI brightness change to {value}")]
    DdcWriteFailed { value: u8 },
    #[error("Failed to initialize COM on the calling thread")]
    ComInitializationFailed(#[source] WinError),
    #[error("Failed to configure COM security")]
    ComSecurityFailed(#[source] WinError),
    #[error("Failed to check the process token for administrator membership")]
    ElevationCheckFailed(#[source] WinError),
    #[error("The process is not running as administrator")]
    NotElevated,
    #[error("Access to the ROOT\\WMI namespace was denied")]
    WmiAccessDenied(#[source] WMIError),
    #[error("Failed to connect to the ROOT\\WMI namespace")]
    WmiConnectionFailed(#[source] WMIError),
    #[error("WMI query against {class} failed")]
    WmiQueryFailed {
        class: &'static str,
        source: WMIError,
    },
    #[error("WmiMonitorBrightness returned no instances")]
    NoBrightnessInstance,
    #[error("WmiMonitorBrightnessMethods returned no active instance")]
    NoActiveBrightnessMethods,
    #[error("WmiSetBrightness failed on {path}")]
    WmiSetBrightnessFailed { path: String, source: WMIError },
}

#[cfg(windows)]
impl From<SysError> for Error {
    fn from(e: SysError) -> Self {
        match &e {
            SysError::NotElevated => Self::PrivilegeRequired,
            SysError::EnumDisplayMonitorsFailed(..)
            | SysError::GetDisplayConfigBufferSizesFailed(..)
            | SysError::QueryDisplayConfigFailed(..)
            | SysError::DisplayConfigGetDeviceInfoFailed(..)
            | SysError::GetMonitorInfoFailed(..)
            | SysError::GetPhysicalMonitorsFailed(..)
            | SysError::NoPhysicalMonitors
            | SysError::DdcReadFailed
            | SysError::DdcWriteFailed { .. }
            | SysError::ComInitializationFailed(..)
            | SysError::ComSecurityFailed(..)
            | SysError::ElevationCheckFailed(..)
            | SysError::WmiAccessDenied(..)
            | SysError::WmiConnectionFailed(..)
            | SysError::WmiQueryFailed { .. }
            | SysError::NoBrightnessInstance
            | SysError::NoActiveBrightnessMethods
            | SysError::WmiSetBrightnessFailed { .. } => Self::BackendUnavailable(Box::new(e)),
        }
    }
}
