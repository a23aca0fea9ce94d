//! Short-lived memo of the last enumeration.
//!
//! The cache holds monitor instances, not brightness values: a cached
//! hardware monitor still reads live. It only bounds how often displays are
//! re-walked, re-classified and re-probed.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use itertools::Itertools;
use tracing::debug;
use tracing::info;

use crate::monitor::Monitor;

/// How long an enumeration is served before displays are walked again.
pub const FRESHNESS_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct Slot {
    monitors: Vec<Arc<Monitor>>,
    produced_at: Instant,
}

#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    slot: Mutex<Option<Slot>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(FRESHNESS_WINDOW)
    }
}

impl ResultCache {
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Slot>> {
        // The slot is only ever replaced wholesale.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached monitors while they are younger than the window,
    /// otherwise runs `enumerate` and caches its result.
    ///
    /// A fresh enumeration keeps the previous instance of every monitor it
    /// finds again unchanged, so state held by those instances survives the
    /// refresh. Concurrent callers wait for a single enumeration.
    pub fn get_or_refresh(&self, enumerate: impl FnOnce() -> Vec<Monitor>) -> Vec<Arc<Monitor>> {
        let mut slot = self.lock();
        if let Some(fresh) = slot
            .as_ref()
            .filter(|cached| cached.produced_at.elapsed() < self.ttl)
        {
            return fresh.monitors.clone();
        }

        let produced_at = Instant::now();
        let previous = slot.take().map(|cached| cached.monitors).unwrap_or_default();
        let monitors: Vec<Arc<Monitor>> = enumerate()
            .into_iter()
            .map(|monitor| {
                previous
                    .iter()
                    .find(|old| old.is_equivalent(&monitor))
                    .map_or_else(|| Arc::new(monitor), Arc::clone)
            })
            .collect();

        info!(
            count = monitors.len(),
            ids = %monitors.iter().map(|monitor| monitor.id()).join(", "),
            "monitor cache refreshed"
        );
        *slot = Some(Slot {
            monitors: monitors.clone(),
            produced_at,
        });
        monitors
    }

    /// Drops the cached list so the next call always enumerates.
    pub fn invalidate(&self) {
        if self.lock().take().is_some() {
            debug!("monitor cache invalidated");
        }
    }

    /// Age of the cached list, `None` when nothing is cached.
    pub fn age(&self) -> Option<Duration> {
        self.lock().as_ref().map(|cached| cached.produced_at.elapsed())
    }
}
