//! DDC/CI brightness over a physical monitor: the monitor configuration API first, raw VCP
//! luminance second.

use tracing::debug;

use crate::monitor::MAX_BRIGHTNESS;

/// VCP (Virtual Control Panel) code for luminance
pub(crate) const BRIGHTNESS_VCP_CODE: u8 = 0x10;

/// The two ways of reaching one physical monitor's brightness.
pub(crate) trait DdcChannel {
    /// `GetMonitorBrightness`, as a percentage.
    fn high_level_brightness(&self) -> Option<u8>;
    /// VCP 0x10 as `(current, maximum)`.
    fn vcp_brightness(&self) -> Option<(u32, u32)>;
    /// `SetMonitorBrightness`.
    fn set_high_level_brightness(&self, value: u8) -> bool;
    /// `SetVCPFeature` on VCP 0x10.
    fn set_vcp_brightness(&self, value: u8) -> bool;
}

/// `current * 100 / maximum`, or `None` when the monitor reports no maximum.
pub(crate) fn percent_of(current: u32, maximum: u32) -> Option<u8> {
    if maximum == 0 {
        return None;
    }
    let percent = u64::from(current) * u64::from(MAX_BRIGHTNESS) / u64::from(maximum);
    Some(percent.min(u64::from(MAX_BRIGHTNESS)) as u8)
}

pub(crate) fn read<C: DdcChannel>(channel: &C) -> Option<u8> {
    if let Some(value) = channel.high_level_brightness() {
        return Some(value.min(MAX_BRIGHTNESS));
    }
    debug!("GetMonitorBrightness failed, falling back to VCP 0x10");
    let (current, maximum) = channel.vcp_brightness()?;
    percent_of(current, maximum)
}

pub(crate) fn write<C: DdcChannel>(channel: &C, value: u8) -> bool {
    let value = value.min(MAX_BRIGHTNESS);
    if channel.set_high_level_brightness(value) {
        return true;
    }
    debug!(value, "SetMonitorBrightness failed, falling back to SetVCPFeature");
    channel.set_vcp_brightness(value)
}

/// Runs `operation` on the first channel. Every channel is consumed, and so released,
/// whatever the outcome.
pub(crate) fn with_first<C, T>(
    channels: Vec<C>,
    operation: impl FnOnce(&C) -> Option<T>,
) -> Option<Option<T>> {
    let first = channels.first()?;
    Some(operation(first))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Script {
        high_level: Option<u8>,
        vcp: Option<(u32, u32)>,
        accept_high_level: bool,
        accept_vcp: bool,
        calls: RefCell<Vec<&'static str>>,
    }

    impl DdcChannel for Script {
        fn high_level_brightness(&self) -> Option<u8> {
            self.calls.borrow_mut().push("get_high_level");
            self.high_level
        }

        fn vcp_brightness(&self) -> Option<(u32, u32)> {
            self.calls.borrow_mut().push("get_vcp");
            self.vcp
        }

        fn set_high_level_brightness(&self, _value: u8) -> bool {
            self.calls.borrow_mut().push("set_high_level");
            self.accept_high_level
        }

        fn set_vcp_brightness(&self, _value: u8) -> bool {
            self.calls.borrow_mut().push("set_vcp");
            self.accept_vcp
        }
    }

    /// Counts how many handles have been released.
    struct Handle(Rc<Cell<usize>>);

    impl Drop for Handle {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn vcp_values_scale_to_percent() {
        assert_eq!(percent_of(50, 100), Some(50));
        assert_eq!(percent_of(128, 255), Some(50));
        assert_eq!(percent_of(255, 255), Some(100));
        assert_eq!(percent_of(300, 255), Some(100));
        assert_eq!(percent_of(10, 0), None);
    }

    #[test]
    fn high_level_read_wins_without_touching_vcp() {
        let channel = Script {
            high_level: Some(70),
            vcp: Some((10, 100)),
            ..Script::default()
        };
        assert_eq!(read(&channel), Some(70));
        assert_eq!(*channel.calls.borrow(), ["get_high_level"]);
    }

    #[test]
    fn failed_high_level_read_falls_back_to_vcp() {
        let channel = Script {
            vcp: Some((128, 255)),
            ..Script::default()
        };
        assert_eq!(read(&channel), Some(50));
        assert_eq!(*channel.calls.borrow(), ["get_high_level", "get_vcp"]);
    }

    #[test]
    fn both_reads_failing_is_a_failure() {
        let channel = Script::default();
        assert_eq!(read(&channel), None);

        let no_maximum = Script {
            vcp: Some((40, 0)),
            ..Script::default()
        };
        assert_eq!(read(&no_maximum), None);
    }

    #[test]
    fn failed_high_level_write_falls_back_to_vcp() {
        let channel = Script {
            accept_vcp: true,
            ..Script::default()
        };
        assert!(write(&channel, 60));
        assert_eq!(*channel.calls.borrow(), ["set_high_level", "set_vcp"]);
    }

    #[test]
    fn accepted_high_level_write_skips_vcp() {
        let channel = Script {
            accept_high_level: true,
            ..Script::default()
        };
        assert!(write(&channel, 60));
        assert_eq!(*channel.calls.borrow(), ["set_high_level"]);
    }

    #[test]
    fn both_writes_failing_is_a_failure() {
        assert!(!write(&Script::default(), 60));
    }

    #[test]
    fn every_handle_is_released_on_failure() {
        let released = Rc::new(Cell::new(0));
        let handles = vec![Handle(Rc::clone(&released)), Handle(Rc::clone(&released))];

        let outcome = with_first(handles, |_| None::<u8>);
        assert_eq!(outcome, Some(None));
        assert_eq!(released.get(), 2);
    }

    #[test]
    fn only_the_first_handle_is_used() {
        let released = Rc::new(Cell::new(0));
        let seen = Cell::new(0);
        let handles: Vec<_> = (0..3).map(|_| Handle(Rc::clone(&released))).collect();

        let outcome = with_first(handles, |_| {
            seen.set(seen.get() + 1);
            Some(42)
        });
        assert_eq!(outcome, Some(Some(42)));
        assert_eq!(seen.get(), 1);
        assert_eq!(released.get(), 3);
    }

    #[test]
    fn no_handles_is_distinguished_from_a_failed_operation() {
        let outcome = with_first(Vec::<Handle>::new(), |_| Some(1));
        assert_eq!(outcome, None);
    }
}
