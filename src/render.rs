use tracing::trace;

use crate::core::{FrameIndex, Viewport};
use crate::error::PinreelResult;
use crate::filter::VisualFilter;
use crate::sequence::{ImageFormat, SequenceStore, frame_asset_path};
use crate::surface::Surface;

/// Result of one render request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The frame was drawn.
    Drawn,
    /// The index matched the last drawn frame; the draw was elided.
    SkippedUnchanged,
    /// The frame is not available yet; the previous contents were retained.
    SkippedMissing,
}

/// Draws the current frame of a sequence into a playback viewport.
///
/// Implementations must skip redundant draws when the computed index is
/// unchanged from the last rendered index: sub-pixel scroll jitter that
/// quantizes to the same frame must not trigger a second draw.
pub trait FrameRenderer {
    fn render(&mut self, store: &SequenceStore, index: FrameIndex) -> PinreelResult<RenderOutcome>;

    /// The last frame actually drawn, if any.
    fn last_drawn(&self) -> Option<FrameIndex>;

    /// Total draws performed (skips excluded).
    fn draw_calls(&self) -> u64;

    /// Forget the last drawn frame so the next render always draws.
    fn invalidate(&mut self);

    /// React to a viewport change. Default: nothing to resize.
    fn resize(&mut self, _viewport: Viewport) {}

    /// The pixel surface, when this strategy owns one.
    fn surface(&self) -> Option<&Surface> {
        None
    }
}

/// Direct-swap strategy: repoint the displayed asset path without touching
/// pixels.
///
/// Can show a stale frame for one paint when the target asset is not cached;
/// acceptable only for low frame-change rates.
#[derive(Debug, Default)]
pub struct SwapRenderer {
    format: ImageFormat,
    current_src: Option<String>,
    last_drawn: Option<FrameIndex>,
    draw_calls: u64,
}

impl SwapRenderer {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Asset path currently on display.
    pub fn current_src(&self) -> Option<&str> {
        self.current_src.as_deref()
    }
}

impl FrameRenderer for SwapRenderer {
    fn render(&mut self, store: &SequenceStore, index: FrameIndex) -> PinreelResult<RenderOutcome> {
        if self.last_drawn == Some(index) {
            return Ok(RenderOutcome::SkippedUnchanged);
        }
        let Some(name) = store.name() else {
            return Ok(RenderOutcome::SkippedMissing);
        };
        if index.0 >= store.frame_count() {
            return Ok(RenderOutcome::SkippedMissing);
        }

        self.current_src = Some(frame_asset_path(name, index, self.format)?);
        self.last_drawn = Some(index);
        self.draw_calls += 1;
        Ok(RenderOutcome::Drawn)
    }

    fn last_drawn(&self) -> Option<FrameIndex> {
        self.last_drawn
    }

    fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    fn invalidate(&mut self) {
        self.last_drawn = None;
    }
}

/// Surface-draw strategy: resolve the frame and draw it scaled into an owned
/// pixel surface, applying the section's visual filter.
///
/// When the frame has not loaded yet the previous contents are retained;
/// a blank frame is never drawn over a previously valid one.
#[derive(Debug)]
pub struct SurfaceRenderer {
    surface: Surface,
    filter: VisualFilter,
    last_drawn: Option<FrameIndex>,
    draw_calls: u64,
}

impl SurfaceRenderer {
    pub fn new(viewport: Viewport, filter: VisualFilter) -> Self {
        Self {
            surface: Surface::new(viewport),
            filter,
            last_drawn: None,
            draw_calls: 0,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn filter(&self) -> &VisualFilter {
        &self.filter
    }
}

impl FrameRenderer for SurfaceRenderer {
    fn render(&mut self, store: &SequenceStore, index: FrameIndex) -> PinreelResult<RenderOutcome> {
        if self.last_drawn == Some(index) {
            return Ok(RenderOutcome::SkippedUnchanged);
        }
        let Some(frame) = store.resolve(index) else {
            trace!(index = index.0, "frame not resolvable yet, retaining previous");
            return Ok(RenderOutcome::SkippedMissing);
        };

        self.surface.clear();
        self.surface.blit_cover(&frame)?;
        if !self.filter.is_identity() {
            self.filter.apply_in_place(self.surface.pixels_mut())?;
        }
        self.last_drawn = Some(index);
        self.draw_calls += 1;
        Ok(RenderOutcome::Drawn)
    }

    fn last_drawn(&self) -> Option<FrameIndex> {
        self.last_drawn
    }

    fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    fn invalidate(&mut self) {
        self.last_drawn = None;
    }

    fn resize(&mut self, viewport: Viewport) {
        self.surface.resize(viewport);
        self.last_drawn = None;
    }

    fn surface(&self) -> Option<&Surface> {
        Some(&self.surface)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sequence::PreparedFrame;

    fn solid(shade: u8) -> PreparedFrame {
        PreparedFrame {
            width: 1,
            height: 1,
            rgba8_premul: Arc::new(vec![shade, shade, shade, 255]),
        }
    }

    fn loaded_store(frame_count: u32) -> SequenceStore {
        let mut store = SequenceStore::new();
        let tickets = store
            .begin_load("seq", frame_count, ImageFormat::Webp)
            .unwrap();
        for t in &tickets {
            store.complete(t, Ok(solid(t.index.0 as u8)));
        }
        store
    }

    #[test]
    fn surface_renderer_skips_repeated_index() {
        let store = loaded_store(3);
        let viewport = Viewport::new(2, 2).unwrap();
        let mut renderer = SurfaceRenderer::new(viewport, VisualFilter::identity());

        assert_eq!(
            renderer.render(&store, FrameIndex(1)).unwrap(),
            RenderOutcome::Drawn
        );
        assert_eq!(
            renderer.render(&store, FrameIndex(1)).unwrap(),
            RenderOutcome::SkippedUnchanged
        );
        assert_eq!(renderer.draw_calls(), 1);
        assert_eq!(renderer.last_drawn(), Some(FrameIndex(1)));
    }

    #[test]
    fn surface_renderer_retains_previous_frame_when_missing() {
        let mut store = SequenceStore::new();
        let tickets = store.begin_load("seq", 2, ImageFormat::Webp).unwrap();
        store.complete(&tickets[0], Ok(solid(7)));

        let viewport = Viewport::new(1, 1).unwrap();
        let mut renderer = SurfaceRenderer::new(viewport, VisualFilter::identity());
        renderer.render(&store, FrameIndex(0)).unwrap();
        let before = renderer.surface().pixels().to_vec();

        assert_eq!(
            renderer.render(&store, FrameIndex(1)).unwrap(),
            RenderOutcome::SkippedMissing
        );
        assert_eq!(renderer.surface().pixels(), &before[..]);
        assert_eq!(renderer.last_drawn(), Some(FrameIndex(0)));

        // Once the frame lands, the same index draws.
        store.complete(&tickets[1], Ok(solid(9)));
        assert_eq!(
            renderer.render(&store, FrameIndex(1)).unwrap(),
            RenderOutcome::Drawn
        );
        assert_eq!(renderer.surface().pixels()[0], 9);
    }

    #[test]
    fn surface_renderer_guards_empty_store() {
        let store = SequenceStore::new();
        let viewport = Viewport::new(1, 1).unwrap();
        let mut renderer = SurfaceRenderer::new(viewport, VisualFilter::identity());
        assert_eq!(
            renderer.render(&store, FrameIndex(0)).unwrap(),
            RenderOutcome::SkippedMissing
        );
        assert_eq!(renderer.draw_calls(), 0);
    }

    #[test]
    fn resize_forces_a_redraw() {
        let store = loaded_store(2);
        let viewport = Viewport::new(2, 2).unwrap();
        let mut renderer = SurfaceRenderer::new(viewport, VisualFilter::identity());
        renderer.render(&store, FrameIndex(0)).unwrap();

        renderer.resize(Viewport::new(4, 4).unwrap());
        assert_eq!(
            renderer.render(&store, FrameIndex(0)).unwrap(),
            RenderOutcome::Drawn
        );
        assert_eq!(renderer.draw_calls(), 2);
    }

    #[test]
    fn swap_renderer_points_at_the_asset_path() {
        let store = loaded_store(81);
        let mut renderer = SwapRenderer::new(ImageFormat::Webp);

        assert_eq!(
            renderer.render(&store, FrameIndex(7)).unwrap(),
            RenderOutcome::Drawn
        );
        assert_eq!(renderer.current_src(), Some("seq/0007.webp"));
        assert_eq!(
            renderer.render(&store, FrameIndex(7)).unwrap(),
            RenderOutcome::SkippedUnchanged
        );
        assert_eq!(renderer.draw_calls(), 1);
    }

    #[test]
    fn swap_renderer_guards_empty_and_out_of_range() {
        let empty = SequenceStore::new();
        let mut renderer = SwapRenderer::new(ImageFormat::Webp);
        assert_eq!(
            renderer.render(&empty, FrameIndex(0)).unwrap(),
            RenderOutcome::SkippedMissing
        );

        let store = loaded_store(2);
        assert_eq!(
            renderer.render(&store, FrameIndex(2)).unwrap(),
            RenderOutcome::SkippedMissing
        );
    }
}
