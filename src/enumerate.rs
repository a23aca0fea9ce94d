//! Discovers displays and turns them into [`Monitor`]s.

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend::Backend;
use crate::backend::Route;
use crate::backend::SystemBackend;
use crate::hardware::Capabilities;
use crate::hardware::DisplayIdentity;
use crate::hardware::HardwareMonitor;
use crate::monitor::Monitor;
use crate::monitor::MonitorKind;
use crate::simulated;

/// Id of the (single) internal display.
pub const INTERNAL_ID: &str = "internal_0";
/// Name of the (single) internal display.
pub const INTERNAL_NAME: &str = "Internal Display";

/// Substrings of a device description that identify a built-in panel.
const INTERNAL_PANEL_MARKERS: [&str; 3] = ["Internal", "Laptop", "Built-in"];

/// What the display walk learned about one display surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplaySurface {
    pub hmonitor: isize,
    /// `DISPLAY_DEVICEW::DeviceString` of the first device on the surface
    pub description: Option<String>,
    pub is_primary: bool,
    /// Whether the display path reports an internal output technology, when
    /// that could be resolved. Diagnostic only.
    pub internal_output: Option<bool>,
}

#[must_use]
pub fn has_internal_marker(description: &str) -> bool {
    INTERNAL_PANEL_MARKERS
        .iter()
        .any(|marker| description.contains(marker))
}

/// Classifies a surface.
///
/// A recognized panel marker makes a display internal; failing that the
/// primary display is assumed to be internal. That fallback misclassifies the
/// primary monitor of a desktop machine, which then routes to WMI and is
/// usually not controllable. Once `internal_taken` is set every further
/// display is external.
#[must_use]
pub fn classify(surface: &DisplaySurface, internal_taken: bool) -> MonitorKind {
    if internal_taken {
        return MonitorKind::External;
    }

    let marked = surface
        .description
        .as_deref()
        .is_some_and(has_internal_marker);
    if marked {
        return MonitorKind::Internal;
    }

    if surface.is_primary {
        if surface.internal_output == Some(false) {
            warn!(
                hmonitor = surface.hmonitor,
                description = ?surface.description,
                "primary display classified as internal but reports an external output"
            );
        }
        return MonitorKind::Internal;
    }

    MonitorKind::External
}

/// `monitor_<handle as hex>_<ordinal>`, stable for an unchanged device set.
#[must_use]
pub fn external_id(hmonitor: isize, ordinal: usize) -> String {
    format!("monitor_{:08x}_{ordinal}", hmonitor as usize)
}

/// The device description, or `External Display N` when there is none.
#[must_use]
pub fn external_name(description: Option<&str>, ordinal: usize) -> String {
    description
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| format!("External Display {}", ordinal + 1), str::to_owned)
}

/// Builds hardware monitors for the surfaces, in walk order.
///
/// The internal display is assumed to have WMI; that is only discovered on
/// first use, so enumeration never needs elevation. External displays are
/// probed with one DDC/CI read, whose value also seeds the monitor.
pub fn assemble<B>(
    surfaces: impl IntoIterator<Item = DisplaySurface>,
    backend: &B,
) -> Vec<HardwareMonitor<B>>
where
    B: Backend + Clone,
{
    let mut internal_taken = false;
    let mut external_ordinal = 0;

    surfaces
        .into_iter()
        .map(|surface| match classify(&surface, internal_taken) {
            MonitorKind::Internal => {
                internal_taken = true;
                let identity = DisplayIdentity {
                    id: INTERNAL_ID.to_owned(),
                    name: INTERNAL_NAME.to_owned(),
                    kind: MonitorKind::Internal,
                    hmonitor: surface.hmonitor,
                };
                let capabilities = Capabilities {
                    internal_backend: true,
                    external_backend: false,
                };
                HardwareMonitor::new(identity, capabilities, backend.clone(), None)
            }
            MonitorKind::External => {
                let ordinal = external_ordinal;
                external_ordinal += 1;

                let identity = DisplayIdentity {
                    id: external_id(surface.hmonitor, ordinal),
                    name: external_name(surface.description.as_deref(), ordinal),
                    kind: MonitorKind::External,
                    hmonitor: surface.hmonitor,
                };
                let probe = backend
                    .read(Route::Ddc {
                        hmonitor: surface.hmonitor,
                    })
                    .map_err(|e| debug!(monitor = %identity.id, error = %e, "DDC/CI probe failed"))
                    .ok();
                let capabilities = Capabilities {
                    internal_backend: false,
                    external_backend: probe.is_some(),
                };
                HardwareMonitor::new(identity, capabilities, backend.clone(), probe)
            }
        })
        .collect()
}

#[cfg(windows)]
fn display_surfaces() -> Vec<DisplaySurface> {
    crate::device::display_surfaces()
        .filter_map(|surface| {
            surface
                .map_err(|e| warn!(error = %e, "display walk failed"))
                .ok()
        })
        .collect()
}

#[cfg(not(windows))]
fn display_surfaces() -> Vec<DisplaySurface> {
    debug!("no display walk on this platform");
    Vec::new()
}

/// Returns the simulated fixture set, or every attached display.
///
/// Never fails: displays that cannot be probed come back non-controllable,
/// and a failed walk yields an empty list.
pub fn enumerate(simulated: bool) -> Vec<Monitor> {
    if simulated {
        return simulated::fixtures()
            .into_iter()
            .map(Monitor::Simulated)
            .collect();
    }

    let monitors: Vec<Monitor> = assemble(display_surfaces(), &SystemBackend)
        .into_iter()
        .map(Monitor::Hardware)
        .collect();
    info!(
        count = monitors.len(),
        controllable = monitors.iter().filter(|m| m.is_controllable()).count(),
        "enumerated displays"
    );
    monitors
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::hardware::tests::FakeBackend;

    fn surface(hmonitor: isize, description: &str, is_primary: bool) -> DisplaySurface {
        DisplaySurface {
            hmonitor,
            description: Some(description.to_owned()),
            is_primary,
            internal_output: None,
        }
    }

    #[test]
    fn marker_makes_a_display_internal() {
        assert!(has_internal_marker("Internal Display"));
        assert!(has_internal_marker("Built-in Retina"));
        assert!(has_internal_marker("Generic Laptop Panel"));
        assert!(!has_internal_marker("Generic PnP Monitor"));

        let panel = surface(1, "Laptop Panel", false);
        assert_eq!(classify(&panel, false), MonitorKind::Internal);
    }

    #[test]
    fn primary_falls_back_to_internal() {
        let primary = surface(1, "Generic PnP Monitor", true);
        assert_eq!(classify(&primary, false), MonitorKind::Internal);

        let secondary = surface(2, "Generic PnP Monitor", false);
        assert_eq!(classify(&secondary, false), MonitorKind::External);
    }

    #[test]
    fn only_first_internal_candidate_is_internal() {
        let panel = surface(1, "Internal Display", true);
        assert_eq!(classify(&panel, true), MonitorKind::External);
    }

    #[test]
    fn surface_without_description_is_classified() {
        let unknown = DisplaySurface {
            hmonitor: 7,
            ..Default::default()
        };
        assert_eq!(classify(&unknown, false), MonitorKind::External);
    }

    #[test]
    fn external_ids_are_deterministic() {
        assert_eq!(external_id(0x1234, 0), "monitor_00001234_0");
        assert_eq!(external_id(0x1234, 0), external_id(0x1234, 0));
        assert_ne!(external_id(0x1234, 0), external_id(0x1234, 1));
    }

    #[test]
    fn external_name_falls_back_to_ordinal() {
        assert_eq!(external_name(Some("DELL U2720Q"), 0), "DELL U2720Q");
        assert_eq!(external_name(Some("  "), 1), "External Display 2");
        assert_eq!(external_name(None, 0), "External Display 1");
    }

    #[test]
    fn assemble_classifies_probes_and_numbers_displays() {
        let fake = FakeBackend::with_value(45);
        let surfaces = vec![
            surface(0x10, "Generic PnP Monitor", false),
            surface(0x20, "Internal Panel", true),
            surface(0x30, "", false),
        ];

        let monitors = assemble(surfaces, &&fake);
        let ids: Vec<_> = monitors.iter().map(HardwareMonitor::id).collect();
        assert_eq!(ids, ["monitor_00000010_0", INTERNAL_ID, "monitor_00000030_1"]);

        assert_eq!(monitors[1].kind(), MonitorKind::Internal);
        assert_eq!(monitors[1].name(), INTERNAL_NAME);
        assert!(monitors[1].capabilities().internal_backend);
        assert_eq!(monitors[2].name(), "External Display 2");
        assert!(monitors.iter().all(HardwareMonitor::is_controllable));

        // One probe per external display plus one seed read for the internal one.
        assert_eq!(fake.reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_probe_leaves_display_listed_but_not_controllable() {
        let fake = FakeBackend::default();
        fake.fail_reads.store(true, Ordering::SeqCst);

        let monitors = assemble(vec![surface(0x10, "Generic PnP Monitor", false)], &&fake);
        assert_eq!(monitors.len(), 1);
        assert!(!monitors[0].is_controllable());
        assert!(!monitors[0].capabilities().external_backend);
    }

    #[test]
    fn at_most_one_internal_display() {
        let fake = FakeBackend::with_value(45);
        let surfaces = vec![
            surface(0x10, "Internal Panel", true),
            surface(0x20, "Built-in Panel", false),
        ];

        let monitors = assemble(surfaces, &&fake);
        let kinds: Vec<_> = monitors.iter().map(HardwareMonitor::kind).collect();
        assert_eq!(kinds, [MonitorKind::Internal, MonitorKind::External]);
        assert_eq!(monitors[1].id(), "monitor_00000020_0");
    }

    #[test]
    fn reenumeration_yields_same_ids() {
        let fake = FakeBackend::with_value(45);
        let surfaces = vec![
            surface(0x10, "Internal Panel", true),
            surface(0x20, "Generic PnP Monitor", false),
        ];

        let first: Vec<String> = assemble(surfaces.clone(), &&fake)
            .iter()
            .map(|m| m.id().to_owned())
            .collect();
        let second: Vec<String> = assemble(surfaces, &&fake)
            .iter()
            .map(|m| m.id().to_owned())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn simulated_enumeration_is_fixed() {
        let monitors = enumerate(true);
        let kinds: Vec<_> = monitors.iter().map(Monitor::kind).collect();
        assert_eq!(
            kinds,
            [MonitorKind::Internal, MonitorKind::External, MonitorKind::External]
        );
        assert!(monitors.iter().all(|m| m.brightness().unwrap() == 50));
    }
}
