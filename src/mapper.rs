use crate::core::{FrameIndex, Progress};

/// Quantize normalized progress to the nearest frame of an `n`-frame sequence.
///
/// The snap rule is `round(progress * (n - 1))`, clamped to
/// `[0, n - 1]`. Pure and idempotent; any smoothing happens upstream in the
/// scroll source, never here.
pub fn map_frame(progress: Progress, frame_count: u32) -> FrameIndex {
    if frame_count <= 1 {
        return FrameIndex(0);
    }
    let last = frame_count - 1;
    let raw = (progress.get() * f64::from(last)).round() as u32;
    FrameIndex(raw.min(last))
}
