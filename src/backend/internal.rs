//! Internal panel brightness through `ROOT\WMI`.
//!
//! Getting a usable connection walks four steps in order, each of which is
//! safe to repeat:
//!
//! 1. COM is initialized on the calling thread (once per thread, balanced by
//!    `CoUninitialize` when the thread exits).
//! 2. COM security is configured (once per process, cannot be undone).
//! 3. The process is checked for administrator membership (once per process).
//!    `WmiSetBrightness` refuses non-elevated callers without a useful error,
//!    so this is reported as its own failure.
//! 4. A connection to `ROOT\WMI` is opened. Connections are per call because
//!    they are bound to the apartment of the thread that opened them.

use std::cell::RefCell;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;

use tracing::debug;
use tracing::trace;
use windows::core::BOOL;
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::Foundation::RPC_E_TOO_LATE;
use windows::Win32::Security::AllocateAndInitializeSid;
use windows::Win32::Security::CheckTokenMembership;
use windows::Win32::Security::FreeSid;
use windows::Win32::Security::PSID;
use windows::Win32::Security::SECURITY_NT_AUTHORITY;
use windows::Win32::System::Com::CoInitializeEx;
use windows::Win32::System::Com::CoInitializeSecurity;
use windows::Win32::System::Com::CoUninitialize;
use windows::Win32::System::Com::COINIT_MULTITHREADED;
use windows::Win32::System::Com::EOAC_NONE;
use windows::Win32::System::Com::RPC_C_AUTHN_LEVEL_DEFAULT;
use windows::Win32::System::Com::RPC_C_IMP_LEVEL_IMPERSONATE;
use windows::Win32::System::SystemServices::DOMAIN_ALIAS_RID_ADMINS;
use windows::Win32::System::SystemServices::SECURITY_BUILTIN_DOMAIN_RID;
use wmi::COMLibrary;
use wmi::WMIConnection;
use wmi::WMIError;

use super::wmi_classes::first_active;
use super::wmi_classes::WmiMonitorBrightness;
use super::wmi_classes::WmiMonitorBrightnessMethods;
use super::wmi_classes::WmiSetBrightnessParams;
use crate::error::SysError;
use crate::monitor::MAX_BRIGHTNESS;

const NAMESPACE: &str = "ROOT\\WMI";

/// `WBEM_E_ACCESS_DENIED`
const WBEM_E_ACCESS_DENIED: i32 = 0x8004_1003_u32 as i32;


/// This thread's COM reference. Dropped (and released) when the thread exits.
struct Apartment {
    owns_reference: bool,
}

impl Drop for Apartment {
    fn drop(&mut self) {
        if self.owns_reference {
            unsafe { CoUninitialize() };
        }
    }
}

thread_local! {
    static APARTMENT: RefCell<Option<Apartment>> = const { RefCell::new(None) };
}

static SECURITY_CONFIGURED: Mutex<bool> = Mutex::new(false);
static ELEVATED: OnceLock<bool> = OnceLock::new();

fn ensure_apartment() -> Result<COMLibrary, SysError> {
    APARTMENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
            let apartment = if hr.is_ok() {
                // S_OK and S_FALSE both add a reference that must be released.
                Apartment {
                    owns_reference: true,
                }
            } else if hr == RPC_E_CHANGED_MODE {
                debug!("COM already initialized on this thread with another threading model");
                Apartment {
                    owns_reference: false,
                }
            } else {
                return Err(SysError::ComInitializationFailed(hr.into()));
            };
            *slot = Some(apartment);
        }
        // COM is live on this thread for as long as the thread-local lives.
        Ok(unsafe { COMLibrary::assume_initialized() })
    })
}

fn ensure_security() -> Result<(), SysError> {
    let mut configured = SECURITY_CONFIGURED
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if *configured {
        return Ok(());
    }

    let result = unsafe {
        CoInitializeSecurity(
            None,
            -1,
            None,
            None,
            RPC_C_AUTHN_LEVEL_DEFAULT,
            RPC_C_IMP_LEVEL_IMPERSONATE,
            None,
            EOAC_NONE,
            None,
        )
    };
    match result {
        Ok(()) => trace!("COM security configured"),
        Err(e) if e.code() == RPC_E_TOO_LATE => {
            debug!("COM security was already configured for this process");
        }
        Err(e) => return Err(SysError::ComSecurityFailed(e)),
    }

    *configured = true;
    Ok(())
}

/// Checks whether the process token is a member of BUILTIN\Administrators.
unsafe fn is_elevated() -> Result<bool, SysError> {
    let mut admin_group = PSID::default();
    AllocateAndInitializeSid(
        &SECURITY_NT_AUTHORITY,
        2,
        SECURITY_BUILTIN_DOMAIN_RID as u32,
        DOMAIN_ALIAS_RID_ADMINS as u32,
        0,
        0,
        0,
        0,
        0,
        0,
        &mut admin_group,
    )
    .map_err(SysError::ElevationCheckFailed)?;

    let mut is_member = BOOL::default();
    let checked = CheckTokenMembership(None, admin_group, &mut is_member);
    FreeSid(admin_group);
    checked.map_err(SysError::ElevationCheckFailed)?;

    Ok(is_member.as_bool())
}

fn ensure_elevated() -> Result<(), SysError> {
    let elevated = match ELEVATED.get() {
        Some(elevated) => *elevated,
        None => {
            let elevated = unsafe { is_elevated()? };
            *ELEVATED.get_or_init(|| elevated)
        }
    };

    if elevated {
        Ok(())
    } else {
        Err(SysError::NotElevated)
    }
}

fn connect() -> Result<WMIConnection, SysError> {
    let com = ensure_apartment()?;
    ensure_security()?;
    ensure_elevated()?;

    WMIConnection::with_namespace_path(NAMESPACE, com).map_err(|e| {
        if matches!(e, WMIError::HResultError { hres } if hres == WBEM_E_ACCESS_DENIED) {
            SysError::WmiAccessDenied(e)
        } else {
            SysError::WmiConnectionFailed(e)
        }
    })
}

/// Reads `CurrentBrightness` of the first `WmiMonitorBrightness` instance.
pub(crate) fn read_brightness() -> Result<u8, SysError> {
    let connection = connect()?;
    let instances: Vec<WmiMonitorBrightness> = connection
        .raw_query("SELECT CurrentBrightness FROM WmiMonitorBrightness")
        .map_err(|source| SysError::WmiQueryFailed {
            class: "WmiMonitorBrightness",
            source,
        })?;

    instances
        .into_iter()
        .next()
        .map(|instance| instance.current_brightness.min(MAX_BRIGHTNESS))
        .ok_or(SysError::NoBrightnessInstance)
}

/// Calls `WmiSetBrightness` on the first active `WmiMonitorBrightnessMethods` instance.
pub(crate) fn write_brightness(value: u8) -> Result<(), SysError> {
    let connection = connect()?;
    let instances: Vec<WmiMonitorBrightnessMethods> = connection
        .raw_query("SELECT * FROM WmiMonitorBrightnessMethods")
        .map_err(|source| SysError::WmiQueryFailed {
            class: "WmiMonitorBrightnessMethods",
            source,
        })?;

    let target = first_active(instances).ok_or(SysError::NoActiveBrightnessMethods)?;

    let params = WmiSetBrightnessParams::immediate(value);
    debug!(path = %target.path, ?params, "invoking WmiSetBrightness");

    connection
        .exec_instance_method::<WmiMonitorBrightnessMethods, _, ()>(
            "WmiSetBrightness",
            &target.path,
            params,
        )
        .map_err(|source| SysError::WmiSetBrightnessFailed {
            path: target.path.clone(),
            source,
        })
}
