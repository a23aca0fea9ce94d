use std::ffi::c_void;
use std::ptr;

use tracing::debug;
use windows::Win32::Devices::Display::DestroyPhysicalMonitor;
use windows::Win32::Devices::Display::GetMonitorBrightness;
use windows::Win32::Devices::Display::GetNumberOfPhysicalMonitorsFromHMONITOR;
use windows::Win32::Devices::Display::GetPhysicalMonitorsFromHMONITOR;
use windows::Win32::Devices::Display::GetVCPFeatureAndVCPFeatureReply;
use windows::Win32::Devices::Display::SetMonitorBrightness;
use windows::Win32::Devices::Display::SetVCPFeature;
use windows::Win32::Devices::Display::PHYSICAL_MONITOR;
use windows::Win32::Foundation::FALSE;
use windows::Win32::Foundation::HANDLE;
use windows::Win32::Graphics::Gdi::HMONITOR;

use super::vcp;
use super::vcp::DdcChannel;
use super::vcp::BRIGHTNESS_VCP_CODE;
use crate::error::SysError;
use crate::monitor::MAX_BRIGHTNESS;

/// A safe wrapper for a physical monitor handle that implements `Drop` to call `DestroyPhysicalMonitor`
struct WrappedPhysicalMonitor(HANDLE);

impl std::fmt::Debug for WrappedPhysicalMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0 .0)
    }
}

impl Drop for WrappedPhysicalMonitor {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyPhysicalMonitor(self.0);
        }
    }
}

/// Gets the list of `PHYSICAL_MONITOR` handles that belong to a `HMONITOR`.\
/// A valid handle is still returned for monitors without DDC/CI support, so success here says
/// nothing about whether the brightness calls below will work.\
/// The handles are released when the returned wrappers drop, on every path.
unsafe fn get_physical_monitors_from_hmonitor(
    hmonitor: HMONITOR,
) -> Result<Vec<WrappedPhysicalMonitor>, SysError> {
    let mut physical_number: u32 = 0;
    GetNumberOfPhysicalMonitorsFromHMONITOR(hmonitor, &mut physical_number)
        .map_err(SysError::GetPhysicalMonitorsFailed)?;
    if physical_number == 0 {
        return Err(SysError::NoPhysicalMonitors);
    }
    let mut raw_physical_monitors = vec![PHYSICAL_MONITOR::default(); physical_number as usize];
    // Allocate first so that pushing the wrapped handles always succeeds.
    let mut physical_monitors = Vec::with_capacity(raw_physical_monitors.len());
    GetPhysicalMonitorsFromHMONITOR(hmonitor, &mut raw_physical_monitors)
        .map_err(SysError::GetPhysicalMonitorsFailed)?;
    // Transform immediately into WrappedPhysicalMonitor so the handles don't leak
    raw_physical_monitors
        .into_iter()
        .for_each(|pm| physical_monitors.push(WrappedPhysicalMonitor(pm.hPhysicalMonitor)));
    Ok(physical_monitors)
}

impl DdcChannel for WrappedPhysicalMonitor {
    fn high_level_brightness(&self) -> Option<u8> {
        let mut minimum: u32 = 0;
        let mut current: u32 = 0;
        let mut maximum: u32 = 0;
        let ok = unsafe { GetMonitorBrightness(self.0, &mut minimum, &mut current, &mut maximum) };
        if ok == FALSE.0 {
            return None;
        }
        debug!(minimum, current, maximum, "GetMonitorBrightness");
        Some(current.min(u32::from(MAX_BRIGHTNESS)) as u8)
    }

    fn vcp_brightness(&self) -> Option<(u32, u32)> {
        let mut current: u32 = 0;
        let mut maximum: u32 = 0;
        let ok = unsafe {
            GetVCPFeatureAndVCPFeatureReply(
                self.0,
                BRIGHTNESS_VCP_CODE,
                None,
                ptr::addr_of_mut!(current),
                Some(ptr::addr_of_mut!(maximum)),
            )
        };
        if ok == FALSE.0 {
            return None;
        }
        debug!(current, maximum, "GetVCPFeatureAndVCPFeatureReply");
        Some((current, maximum))
    }

    fn set_high_level_brightness(&self, value: u8) -> bool {
        unsafe { SetMonitorBrightness(self.0, u32::from(value)) != FALSE.0 }
    }

    fn set_vcp_brightness(&self, value: u8) -> bool {
        unsafe { SetVCPFeature(self.0, BRIGHTNESS_VCP_CODE, u32::from(value)) != FALSE.0 }
    }
}

fn physical_monitors(hmonitor: isize) -> Result<Vec<WrappedPhysicalMonitor>, SysError> {
    unsafe { get_physical_monitors_from_hmonitor(HMONITOR(hmonitor as *mut c_void)) }
}

pub(crate) fn read_brightness(hmonitor: isize) -> Result<u8, SysError> {
    vcp::with_first(physical_monitors(hmonitor)?, |monitor| vcp::read(monitor))
        .ok_or(SysError::NoPhysicalMonitors)?
        .ok_or(SysError::DdcReadFailed)
}

pub(crate) fn write_brightness(hmonitor: isize, value: u8) -> Result<(), SysError> {
    let value = value.min(MAX_BRIGHTNESS);
    vcp::with_first(physical_monitors(hmonitor)?, |monitor| {
        vcp::write(monitor, value).then_some(())
    })
    .ok_or(SysError::NoPhysicalMonitors)?
    .ok_or(SysError::DdcWriteFailed { value })
}
