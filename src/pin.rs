use crate::core::{Progress, ScrollRegion};

/// Lifecycle phase of a pinned region.
///
/// `Pinning` and `Releasing` are reported on the single update that crosses
/// a pin boundary; the machine settles into `Pinned`/`Unpinned` on the next
/// update. Reverse transitions are symmetric: scrolling back up re-pins the
/// region and walks progress back toward 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinPhase {
    Unpinned,
    Pinning,
    Pinned,
    Releasing,
}

/// Outcome of feeding one scroll offset through the controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinUpdate {
    pub phase: PinPhase,
    pub progress: Progress,
}

/// Holds the playback viewport fixed while its virtual scroll distance is
/// consumed, then releases it.
#[derive(Clone, Debug)]
pub struct PinController {
    region: ScrollRegion,
    phase: PinPhase,
}

impl PinController {
    pub fn new(region: ScrollRegion) -> Self {
        Self {
            region,
            phase: PinPhase::Unpinned,
        }
    }

    pub fn region(&self) -> ScrollRegion {
        self.region
    }

    pub fn phase(&self) -> PinPhase {
        self.phase
    }

    /// Swap pin parameters mid-flight. Progress is derived from the offset,
    /// so the next update recomputes against the new region and lands on
    /// exactly the recomputed frame.
    pub fn set_region(&mut self, region: ScrollRegion) {
        self.region = region;
    }

    /// Advance the state machine with the latest authoritative offset.
    ///
    /// Progress saturates at the boundary the region exited through: 1 past
    /// the end, 0 above the start. Each call supersedes the previous one;
    /// the result reflects only the offset given here.
    pub fn update(&mut self, offset: f64) -> PinUpdate {
        let inside = self.region.contains(offset);
        self.phase = match (self.phase, inside) {
            (PinPhase::Unpinned, true) => PinPhase::Pinning,
            (PinPhase::Pinning | PinPhase::Pinned, true) => PinPhase::Pinned,
            (PinPhase::Releasing, true) => PinPhase::Pinning,
            (PinPhase::Pinning | PinPhase::Pinned, false) => PinPhase::Releasing,
            (PinPhase::Unpinned | PinPhase::Releasing, false) => PinPhase::Unpinned,
        };
        PinUpdate {
            phase: self.phase,
            progress: self.region.progress_at(offset),
        }
    }
}
