use std::collections::HashMap;
use std::ffi::OsString;
use std::iter::once;
use std::mem::size_of;
use std::os::windows::ffi::OsStringExt;

use itertools::Either;
use tracing::debug;
use tracing::warn;
use windows::core::BOOL;
use windows::core::PCWSTR;
use windows::Win32::Devices::Display::DisplayConfigGetDeviceInfo;
use windows::Win32::Devices::Display::GetDisplayConfigBufferSizes;
use windows::Win32::Devices::Display::QueryDisplayConfig;
use windows::Win32::Devices::Display::DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME;
use windows::Win32::Devices::Display::DISPLAYCONFIG_MODE_INFO;
use windows::Win32::Devices::Display::DISPLAYCONFIG_MODE_INFO_TYPE_TARGET;
use windows::Win32::Devices::Display::DISPLAYCONFIG_OUTPUT_TECHNOLOGY_INTERNAL;
use windows::Win32::Devices::Display::DISPLAYCONFIG_PATH_INFO;
use windows::Win32::Devices::Display::DISPLAYCONFIG_TARGET_DEVICE_NAME;
use windows::Win32::Devices::Display::QDC_ONLY_ACTIVE_PATHS;
use windows::Win32::Foundation::ERROR_ACCESS_DENIED;
use windows::Win32::Foundation::ERROR_SUCCESS;
use windows::Win32::Foundation::LPARAM;
use windows::Win32::Foundation::RECT;
use windows::Win32::Foundation::WIN32_ERROR;
use windows::Win32::Graphics::Gdi::EnumDisplayDevicesW;
use windows::Win32::Graphics::Gdi::EnumDisplayMonitors;
use windows::Win32::Graphics::Gdi::GetMonitorInfoW;
use windows::Win32::Graphics::Gdi::DISPLAY_DEVICEW;
use windows::Win32::Graphics::Gdi::HDC;
use windows::Win32::Graphics::Gdi::HMONITOR;
use windows::Win32::Graphics::Gdi::MONITORINFO;
use windows::Win32::Graphics::Gdi::MONITORINFOEXW;
use windows::Win32::UI::WindowsAndMessaging::EDD_GET_DEVICE_INTERFACE_NAME;
use windows::Win32::UI::WindowsAndMessaging::MONITORINFOF_PRIMARY;

use crate::enumerate::DisplaySurface;
use crate::error::SysError;

/// Device path (`DISPLAY_DEVICEW::DeviceID`) of a display target.
type DevicePath = [u16; 128];

#[inline]
fn flag_set<T: std::ops::BitAnd<Output = T> + PartialEq + Copy>(t: T, flag: T) -> bool {
    t & flag == flag
}

/// Walks every display surface in `EnumDisplayMonitors` order.\
/// Only a failure of the walk itself is an error; a surface whose details cannot be read is
/// still yielded, with what could be learned about it.
pub(crate) fn display_surfaces() -> impl Iterator<Item = Result<DisplaySurface, SysError>> {
    unsafe {
        let hmonitors = match enum_display_monitors() {
            Ok(monitors) => monitors,
            Err(e) => return Either::Right(once(Err(e))),
        };

        let internal_outputs = get_internal_output_map().unwrap_or_else(|e| {
            debug!(error = %e, "could not resolve display output technologies");
            HashMap::new()
        });

        Either::Left(
            hmonitors
                .into_iter()
                .map(move |hmonitor| Ok(describe_surface(hmonitor, &internal_outputs))),
        )
    }
}

unsafe fn describe_surface(
    hmonitor: HMONITOR,
    internal_outputs: &HashMap<DevicePath, bool>,
) -> DisplaySurface {
    let handle = hmonitor.0 as isize;
    let info = match get_monitor_info(hmonitor) {
        Ok(info) => info,
        Err(e) => {
            warn!(hmonitor = handle, error = %e, "could not read monitor info");
            return DisplaySurface {
                hmonitor: handle,
                ..DisplaySurface::default()
            };
        }
    };

    let device = get_first_display_device(&info);
    DisplaySurface {
        hmonitor: handle,
        description: device
            .as_ref()
            .map(|device| wchar_to_string(&device.DeviceString)),
        is_primary: flag_set(info.monitorInfo.dwFlags, MONITORINFOF_PRIMARY),
        internal_output: device
            .as_ref()
            .and_then(|device| internal_outputs.get(&device.DeviceID).copied()),
    }
}

/// Returns a `HashMap` of Device Path to whether the target uses an internal output technology.\
/// Only used to flag displays the primary-display heuristic may have misclassified.
unsafe fn get_internal_output_map() -> Result<HashMap<DevicePath, bool>, SysError> {
    let mut path_count = 0;
    let mut mode_count = 0;
    GetDisplayConfigBufferSizes(QDC_ONLY_ACTIVE_PATHS, &mut path_count, &mut mode_count)
        .ok()
        .map_err(SysError::GetDisplayConfigBufferSizesFailed)?;
    let mut display_paths = vec![DISPLAYCONFIG_PATH_INFO::default(); path_count as usize];
    let mut display_modes = vec![DISPLAYCONFIG_MODE_INFO::default(); mode_count as usize];
    QueryDisplayConfig(
        QDC_ONLY_ACTIVE_PATHS,
        &mut path_count,
        display_paths.as_mut_ptr(),
        &mut mode_count,
        display_modes.as_mut_ptr(),
        None,
    )
    .ok()
    .map_err(SysError::QueryDisplayConfigFailed)?;

    display_modes
        .into_iter()
        .filter(|mode| mode.infoType == DISPLAYCONFIG_MODE_INFO_TYPE_TARGET)
        .flat_map(|mode| {
            let mut device_name = DISPLAYCONFIG_TARGET_DEVICE_NAME::default();
            device_name.header.size = size_of::<DISPLAYCONFIG_TARGET_DEVICE_NAME>() as u32;
            device_name.header.adapterId = mode.adapterId;
            device_name.header.id = mode.id;
            device_name.header.r#type = DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME;

            match WIN32_ERROR(DisplayConfigGetDeviceInfo(&mut device_name.header) as u32) {
                ERROR_SUCCESS => Some(Ok((
                    device_name.monitorDevicePath,
                    device_name.outputTechnology == DISPLAYCONFIG_OUTPUT_TECHNOLOGY_INTERNAL,
                ))),
                // This error occurs if the calling process does not have access to the current desktop or is running on a remote session.
                ERROR_ACCESS_DENIED => None,
                error => Some(Err(SysError::DisplayConfigGetDeviceInfoFailed(error.into()))),
            }
        })
        .collect()
}

/// Calls `EnumDisplayMonitors` and returns a list of `HMONITOR` handles.\
/// Note that a `HMONITOR` is a logical construct that may correspond to multiple physical monitors.\
/// e.g. when in "Duplicate" mode two physical monitors will belong to the same `HMONITOR`
unsafe fn enum_display_monitors() -> Result<Vec<HMONITOR>, SysError> {
    unsafe extern "system" fn enum_monitors(
        handle: HMONITOR,
        _: HDC,
        _: *mut RECT,
        data: LPARAM,
    ) -> BOOL {
        let monitors = &mut *(data.0 as *mut Vec<HMONITOR>);
        monitors.push(handle);
        true.into()
    }
    let mut hmonitors = Vec::<HMONITOR>::new();
    EnumDisplayMonitors(
        None,
        None,
        Some(enum_monitors),
        LPARAM(&mut hmonitors as *mut _ as isize),
    )
    .ok()
    .map_err(SysError::EnumDisplayMonitorsFailed)?;
    Ok(hmonitors)
}

unsafe fn get_monitor_info(hmonitor: HMONITOR) -> Result<MONITORINFOEXW, SysError> {
    let mut info = MONITORINFOEXW::default();
    info.monitorInfo.cbSize = size_of::<MONITORINFOEXW>() as u32;
    let info_ptr = &mut info as *mut _ as *mut MONITORINFO;
    GetMonitorInfoW(hmonitor, info_ptr)
        .ok()
        .map_err(SysError::GetMonitorInfoFailed)?;
    Ok(info)
}

/// Gets the first display device attached to the surface's adapter output.\
/// Due to the `EDD_GET_DEVICE_INTERFACE_NAME` flag, the `DISPLAY_DEVICEW` will contain the DOS
/// device path for the monitor in the `DeviceID` field; `DeviceString` is unaffected.
unsafe fn get_first_display_device(info: &MONITORINFOEXW) -> Option<DISPLAY_DEVICEW> {
    let mut device = DISPLAY_DEVICEW {
        cb: size_of::<DISPLAY_DEVICEW>() as u32,
        ..Default::default()
    };
    EnumDisplayDevicesW(
        PCWSTR(info.szDevice.as_ptr()),
        0,
        &mut device,
        EDD_GET_DEVICE_INTERFACE_NAME,
    )
    .as_bool()
    .then_some(device)
}

fn wchar_to_string(s: &[u16]) -> String {
    let end = s.iter().position(|&x| x == 0).unwrap_or(s.len());
    let truncated = &s[0..end];
    OsString::from_wide(truncated).to_string_lossy().into()
}
