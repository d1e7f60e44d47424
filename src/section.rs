use tracing::debug;

use crate::core::{DEFAULT_SCROLL_DISTANCE, FrameIndex, ScrollRegion, Viewport};
use crate::error::PinreelResult;
use crate::mapper::map_frame;
use crate::pin::{PinController, PinPhase, PinUpdate};
use crate::render::{FrameRenderer, RenderOutcome};
use crate::sequence::{FrameTicket, ImageFormat, SequenceStore};

/// Default number of frames in a sequence.
pub const DEFAULT_FRAME_COUNT: u32 = 81;

fn default_frame_count() -> u32 {
    DEFAULT_FRAME_COUNT
}

fn default_visual_filter() -> String {
    "none".to_string()
}

fn default_scroll_distance() -> f64 {
    DEFAULT_SCROLL_DISTANCE
}

/// Mount contract supplied by a section composer.
///
/// The composer owns naming, frame count, the color filter, and any overlay
/// content; it consumes nothing from the core except a mounted playback
/// surface.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SectionSpec {
    /// Sequence identifier; doubles as the asset directory name.
    pub sequence_name: String,
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
    /// CSS-filter-like expression applied to the frame surface.
    #[serde(default = "default_visual_filter")]
    pub visual_filter: String,
    /// Virtual travel consumed while the section stays pinned.
    #[serde(default = "default_scroll_distance")]
    pub scroll_distance: f64,
    #[serde(default)]
    pub image_format: ImageFormat,
    /// Overlay content layered above the frame surface; carried through
    /// uninterpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<serde_json::Value>,
}

impl SectionSpec {
    pub fn new(sequence_name: impl Into<String>) -> Self {
        Self {
            sequence_name: sequence_name.into(),
            frame_count: default_frame_count(),
            visual_filter: default_visual_filter(),
            scroll_distance: default_scroll_distance(),
            image_format: ImageFormat::default(),
            overlay: None,
        }
    }
}

/// Scroll-driven playback for one mounted section.
///
/// `current_frame` is mutated only by the mapper→renderer hand-off in
/// `on_scroll`/`refresh`; scroll and timer callbacks never write it
/// directly.
pub struct PlaybackEngine {
    store: SequenceStore,
    pin: PinController,
    renderer: Box<dyn FrameRenderer>,
    frame_count: u32,
    current_frame: FrameIndex,
    last_update: Option<PinUpdate>,
}

impl PlaybackEngine {
    pub fn new(
        store: SequenceStore,
        pin: PinController,
        renderer: Box<dyn FrameRenderer>,
        frame_count: u32,
    ) -> Self {
        Self {
            store,
            pin,
            renderer,
            frame_count,
            current_frame: FrameIndex(0),
            last_update: None,
        }
    }

    /// Scroll-driven update: pin state → progress → quantized index → draw
    /// if the index changed. Every call recomputes from the offset alone, so
    /// a newer update always supersedes a stale one.
    pub fn on_scroll(&mut self, offset: f64) -> PinreelResult<RenderOutcome> {
        let update = self.pin.update(offset);
        self.last_update = Some(update);
        let index = map_frame(update.progress, self.frame_count);
        let outcome = self.renderer.render(&self.store, index)?;
        if outcome == RenderOutcome::Drawn {
            self.current_frame = index;
        }
        Ok(outcome)
    }

    /// Re-attempt the draw for the last computed position; used after a
    /// frame load lands so a previously skipped draw can catch up.
    pub fn refresh(&mut self) -> PinreelResult<RenderOutcome> {
        let Some(update) = self.last_update else {
            return Ok(RenderOutcome::SkippedMissing);
        };
        let index = map_frame(update.progress, self.frame_count);
        let outcome = self.renderer.render(&self.store, index)?;
        if outcome == RenderOutcome::Drawn {
            self.current_frame = index;
        }
        Ok(outcome)
    }

    /// The last frame drawn.
    pub fn current_frame(&self) -> FrameIndex {
        self.current_frame
    }

    pub fn pin_phase(&self) -> PinPhase {
        self.pin.phase()
    }

    pub fn region(&self) -> ScrollRegion {
        self.pin.region()
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn store(&self) -> &SequenceStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SequenceStore {
        &mut self.store
    }

    pub fn renderer(&self) -> &dyn FrameRenderer {
        self.renderer.as_ref()
    }

    /// Re-evaluate against new pin parameters (layout change); the next
    /// update recomputes progress with no discontinuity beyond one
    /// recomputed frame.
    pub fn set_region(&mut self, region: ScrollRegion) {
        self.pin.set_region(region);
    }

    /// Restart loading with a new frame count, discarding the previous
    /// frames. Returns the fresh tickets.
    pub fn reload(
        &mut self,
        frame_count: u32,
        format: ImageFormat,
    ) -> PinreelResult<Vec<FrameTicket>> {
        let name = self
            .store
            .name()
            .map(str::to_owned)
            .ok_or_else(|| crate::error::PinreelError::sequence("no sequence to reload"))?;
        let tickets = self.store.begin_load(&name, frame_count, format)?;
        self.frame_count = frame_count;
        self.renderer.invalidate();
        Ok(tickets)
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.renderer.resize(viewport);
    }

    /// Halt participation: release every frame handle and invalidate
    /// outstanding tickets so in-flight completions are discarded.
    pub fn teardown(&mut self) {
        debug!(sequence = ?self.store.name(), "playback engine teardown");
        self.store.clear();
        self.last_update = None;
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("sequence", &self.store.name())
            .field("frame_count", &self.frame_count)
            .field("current_frame", &self.current_frame)
            .field("phase", &self.pin.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filter::VisualFilter;
    use crate::render::SurfaceRenderer;
    use crate::sequence::PreparedFrame;

    fn engine(frame_count: u32, loaded: bool) -> PlaybackEngine {
        let mut store = SequenceStore::new();
        let tickets = store
            .begin_load("seq", frame_count, ImageFormat::Webp)
            .unwrap();
        if loaded {
            for t in &tickets {
                store.complete(
                    t,
                    Ok(PreparedFrame {
                        width: 1,
                        height: 1,
                        rgba8_premul: Arc::new(vec![t.index.0 as u8, 0, 0, 255]),
                    }),
                );
            }
        }
        let region = ScrollRegion::new(0.0, 2000.0).unwrap();
        let viewport = Viewport::new(2, 2).unwrap();
        PlaybackEngine::new(
            store,
            PinController::new(region),
            Box::new(SurfaceRenderer::new(viewport, VisualFilter::identity())),
            frame_count,
        )
    }

    #[test]
    fn spec_defaults_match_the_mount_contract() {
        let spec: SectionSpec =
            serde_json::from_str(r#"{ "sequence_name": "Dahlia_frames" }"#).unwrap();
        assert_eq!(spec.frame_count, 81);
        assert_eq!(spec.visual_filter, "none");
        assert_eq!(spec.scroll_distance, 2000.0);
        assert_eq!(spec.image_format, ImageFormat::Webp);
        assert!(spec.overlay.is_none());
    }

    #[test]
    fn overlay_is_carried_uninterpreted() {
        let spec: SectionSpec = serde_json::from_str(
            r#"{ "sequence_name": "s", "overlay": { "title": "Silent Blooms", "cards": 6 } }"#,
        )
        .unwrap();
        assert_eq!(spec.overlay.unwrap()["title"], "Silent Blooms");
    }

    #[test]
    fn scroll_updates_current_frame_through_the_mapper() {
        let mut engine = engine(81, true);
        engine.on_scroll(1000.0).unwrap();
        assert_eq!(engine.current_frame(), FrameIndex(40));
        assert_eq!(engine.pin_phase(), PinPhase::Pinning);
    }

    #[test]
    fn missing_frame_keeps_current_frame_until_refresh() {
        let mut engine = engine(3, false);
        assert_eq!(
            engine.on_scroll(1000.0).unwrap(),
            RenderOutcome::SkippedMissing
        );
        assert_eq!(engine.current_frame(), FrameIndex(0));

        let tickets = engine.reload(3, ImageFormat::Webp).unwrap();
        engine.store_mut().complete(
            &tickets[1],
            Ok(PreparedFrame {
                width: 1,
                height: 1,
                rgba8_premul: Arc::new(vec![1, 0, 0, 255]),
            }),
        );
        assert_eq!(engine.refresh().unwrap(), RenderOutcome::Drawn);
        assert_eq!(engine.current_frame(), FrameIndex(1));
    }

    #[test]
    fn teardown_discards_inflight_completions() {
        let mut engine = engine(81, false);
        let tickets = engine.reload(81, ImageFormat::Webp).unwrap();
        for t in tickets.iter().take(30) {
            engine.store_mut().complete(
                t,
                Ok(PreparedFrame {
                    width: 1,
                    height: 1,
                    rgba8_premul: Arc::new(vec![0, 0, 0, 255]),
                }),
            );
        }
        assert_eq!(engine.store().loaded_count(), 30);

        engine.teardown();
        assert!(!engine.store_mut().complete(
            &tickets[31],
            Ok(PreparedFrame {
                width: 1,
                height: 1,
                rgba8_premul: Arc::new(vec![0, 0, 0, 255]),
            })
        ));
        assert_eq!(engine.store().loaded_count(), 0);
    }
}
