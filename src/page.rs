use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::core::{ScrollRegion, Viewport};
use crate::ease::Ease;
use crate::error::{PinreelError, PinreelResult};
use crate::filter::VisualFilter;
use crate::pin::PinController;
use crate::render::SurfaceRenderer;
use crate::scroll::{
    DEFAULT_SMOOTH_DURATION, NativeScroll, ScrollHub, SmoothScroll, SubscriberId,
};
use crate::section::{PlaybackEngine, SectionSpec};
use crate::sequence::{FrameTicket, PreparedFrame, SequenceStore};

fn default_smooth_duration() -> f64 {
    DEFAULT_SMOOTH_DURATION
}

/// Page-level smoothed-scroll configuration.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct SmoothOptions {
    /// Tween duration in seconds.
    #[serde(default = "default_smooth_duration")]
    pub duration: f64,
    #[serde(default)]
    pub ease: Ease,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_SMOOTH_DURATION,
            ease: Ease::OutExpo,
        }
    }
}

/// The single authoritative scroll strategy for a page.
///
/// Only one strategy is live at a time; every consumer reads the offset
/// through [`Page::scroll_offset`], never the backing state directly, so the
/// two strategies can never disagree on where the page is.
#[derive(Debug)]
pub enum ScrollDriver {
    Native(NativeScroll),
    Smoothed(SmoothScroll),
}

impl ScrollDriver {
    /// The authoritative offset (smoothed when the inertial engine drives).
    pub fn offset(&self) -> f64 {
        match self {
            Self::Native(native) => native.offset(),
            Self::Smoothed(smooth) => smooth.offset(),
        }
    }

    pub fn is_smoothed(&self) -> bool {
        matches!(self, Self::Smoothed(_))
    }

    fn set_limit(&mut self, limit: f64) {
        match self {
            Self::Native(native) => native.set_limit(limit),
            Self::Smoothed(smooth) => smooth.set_limit(limit),
        }
    }
}

/// Identifier for a mounted playback section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SectionId(u64);

struct MountedSection {
    id: SectionId,
    spec: SectionSpec,
    engine: Rc<RefCell<PlaybackEngine>>,
    subscription: SubscriberId,
}

/// One scrollable page of pinned playback sections.
///
/// Owns the scroll hub, the authoritative driver, and the document layout:
/// each mounted section contributes one viewport height plus its pinned
/// travel to the scrollable height, stacked in mount order.
pub struct Page {
    viewport: Viewport,
    hub: ScrollHub,
    driver: ScrollDriver,
    sections: Vec<MountedSection>,
    content_height: f64,
    next_section_id: u64,
}

impl Page {
    /// New page driven by native scroll. Sections mounted later fall back to
    /// native progress whenever no smoothed engine has been installed.
    pub fn new(viewport: Viewport) -> PinreelResult<Self> {
        Ok(Self {
            viewport,
            hub: ScrollHub::new(),
            driver: ScrollDriver::Native(NativeScroll::new(0.0)?),
            sections: Vec::new(),
            content_height: 0.0,
            next_section_id: 0,
        })
    }

    /// Replace the native driver with the momentum-smoothed engine, carrying
    /// the current offset over so consumers observe no jump.
    pub fn install_smooth(&mut self, options: SmoothOptions) -> PinreelResult<()> {
        let offset = self.driver.offset();
        let limit = self.scroll_limit();
        let mut smooth = SmoothScroll::with_easing(limit, options.ease, options.duration)?;
        smooth.jump_to(offset);
        self.driver = ScrollDriver::Smoothed(smooth);
        debug!(duration = options.duration, "smoothed scroll installed");
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The single source of truth for scroll position on this page.
    pub fn scroll_offset(&self) -> f64 {
        self.driver.offset()
    }

    pub fn is_smoothed(&self) -> bool {
        self.driver.is_smoothed()
    }

    /// Total document height contributed by mounted sections.
    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    fn scroll_limit(&self) -> f64 {
        (self.content_height - f64::from(self.viewport.height)).max(0.0)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.len()
    }

    /// Register an extra scroll consumer (overlay animations and the like).
    pub fn subscribe(&mut self, callback: impl FnMut(f64) + 'static) -> SubscriberId {
        self.hub.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Mount a playback section below the existing content.
    ///
    /// Frame loading starts immediately; the returned tickets are delivered
    /// back through [`Page::deliver_frame`] as assets finish decoding.
    #[tracing::instrument(skip(self), fields(sequence = %spec.sequence_name))]
    pub fn mount_section(
        &mut self,
        spec: SectionSpec,
    ) -> PinreelResult<(SectionId, Vec<FrameTicket>)> {
        let filter = VisualFilter::parse(&spec.visual_filter)?;
        let region = ScrollRegion::new(self.content_height, spec.scroll_distance)?;

        let mut store = SequenceStore::new();
        let tickets = store.begin_load(&spec.sequence_name, spec.frame_count, spec.image_format)?;

        let renderer = SurfaceRenderer::new(self.viewport, filter);
        let mut engine = PlaybackEngine::new(
            store,
            PinController::new(region),
            Box::new(renderer),
            spec.frame_count,
        );
        // Prime pin state and attempt the initial frame for the current
        // position (frame 0000 once it loads).
        engine.on_scroll(self.driver.offset())?;

        let engine = Rc::new(RefCell::new(engine));
        let subscription = {
            let engine = Rc::clone(&engine);
            self.hub.subscribe(move |offset| {
                let _ = engine.borrow_mut().on_scroll(offset);
            })
        };

        let id = SectionId(self.next_section_id);
        self.next_section_id += 1;
        self.sections.push(MountedSection {
            id,
            spec,
            engine,
            subscription,
        });

        self.content_height += f64::from(self.viewport.height) + region.scroll_distance;
        self.driver.set_limit(self.scroll_limit());
        debug!(section = id.0, "section mounted");
        Ok((id, tickets))
    }

    /// Apply a finished frame load for a section. Returns `false` when the
    /// section is gone or the completion was discarded (stale or failed).
    pub fn deliver_frame(
        &mut self,
        id: SectionId,
        ticket: &FrameTicket,
        frame: PinreelResult<PreparedFrame>,
    ) -> bool {
        let Some(section) = self.sections.iter().find(|s| s.id == id) else {
            debug!(section = id.0, "dropping frame for unmounted section");
            return false;
        };
        let mut engine = section.engine.borrow_mut();
        let applied = engine.store_mut().complete(ticket, frame);
        if applied {
            let _ = engine.refresh();
        }
        applied
    }

    /// Synchronously stop a section's participation: unsubscribe it, halt
    /// pinning, release its frames, and reflow the sections below it.
    pub fn unmount_section(&mut self, id: SectionId) -> bool {
        let Some(pos) = self.sections.iter().position(|s| s.id == id) else {
            return false;
        };
        let section = self.sections.remove(pos);
        self.hub.unsubscribe(section.subscription);
        section.engine.borrow_mut().teardown();
        self.relayout();
        debug!(section = id.0, "section unmounted");
        true
    }

    /// Tear the page down: stop the smoothed loop so it cannot run against a
    /// destroyed page, then unmount every section.
    pub fn unmount(&mut self) {
        if let ScrollDriver::Smoothed(smooth) = &mut self.driver {
            smooth.destroy();
        }
        for section in self.sections.drain(..) {
            self.hub.unsubscribe(section.subscription);
            section.engine.borrow_mut().teardown();
        }
        self.content_height = 0.0;
        debug!("page unmounted");
    }

    /// Route raw wheel/touch input through the authoritative driver.
    ///
    /// Under the native driver the hub is notified immediately; under the
    /// smoothed driver the input only moves the target and notifications
    /// follow from `tick` as the smoothed offset advances.
    pub fn wheel(&mut self, delta: f64, now: f64) {
        match &mut self.driver {
            ScrollDriver::Native(native) => {
                if native.scroll_by(delta) {
                    let offset = native.offset();
                    self.hub.notify(offset);
                }
            }
            ScrollDriver::Smoothed(smooth) => smooth.wheel(delta, now),
        }
    }

    /// Scroll to an absolute offset (animated under the smoothed driver).
    pub fn scroll_to(&mut self, offset: f64, now: f64) {
        match &mut self.driver {
            ScrollDriver::Native(native) => {
                if native.scroll_to(offset) {
                    let offset = native.offset();
                    self.hub.notify(offset);
                }
            }
            ScrollDriver::Smoothed(smooth) => smooth.scroll_to(offset, now),
        }
    }

    /// Jump to an absolute offset with no animation under either driver.
    pub fn jump_to(&mut self, offset: f64) {
        let changed = match &mut self.driver {
            ScrollDriver::Native(native) => native.scroll_to(offset),
            ScrollDriver::Smoothed(smooth) => {
                let before = smooth.offset();
                smooth.jump_to(offset);
                smooth.offset() != before
            }
        };
        if changed {
            let offset = self.driver.offset();
            self.hub.notify(offset);
        }
    }

    /// Display-refresh callback. Advances the smoothed engine and fans the
    /// new offset out exactly once; returns `true` while the engine still
    /// animates and the host should keep scheduling refreshes.
    pub fn tick(&mut self, now: f64) -> bool {
        let ScrollDriver::Smoothed(smooth) = &mut self.driver else {
            return false;
        };
        let before = smooth.offset();
        let animating = smooth.tick(now);
        let offset = smooth.offset();
        if offset != before {
            self.hub.notify(offset);
        }
        animating
    }

    /// Resize the playback viewport; surfaces reallocate and the document
    /// reflows.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for section in &self.sections {
            section.engine.borrow_mut().resize(viewport);
        }
        self.relayout();
    }

    /// Change a section's pinned travel in place; progress re-evaluates
    /// against the new distance on the next update.
    pub fn set_section_scroll_distance(
        &mut self,
        id: SectionId,
        scroll_distance: f64,
    ) -> PinreelResult<()> {
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PinreelError::validation("unknown section id"))?;
        // Validate before touching layout.
        ScrollRegion::new(0.0, scroll_distance)?;
        section.spec.scroll_distance = scroll_distance;
        self.relayout();
        Ok(())
    }

    /// Restart a section's sequence with a new frame count; previous frames
    /// are discarded and fresh tickets returned.
    pub fn reload_section(
        &mut self,
        id: SectionId,
        frame_count: u32,
    ) -> PinreelResult<Vec<FrameTicket>> {
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PinreelError::validation("unknown section id"))?;
        let tickets = section
            .engine
            .borrow_mut()
            .reload(frame_count, section.spec.image_format)?;
        section.spec.frame_count = frame_count;
        Ok(tickets)
    }

    pub fn section_spec(&self, id: SectionId) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.id == id).map(|s| &s.spec)
    }

    /// Shared handle to a section's engine (surface access, test probes).
    pub fn engine(&self, id: SectionId) -> Option<Rc<RefCell<PlaybackEngine>>> {
        self.sections
            .iter()
            .find(|s| s.id == id)
            .map(|s| Rc::clone(&s.engine))
    }

    pub fn section_region(&self, id: SectionId) -> Option<ScrollRegion> {
        self.sections
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.engine.borrow().region())
    }

    /// Recompute pin starts and the scrollable limit from mount order, then
    /// re-notify so every section re-evaluates progress against the new
    /// parameters at the unchanged offset.
    fn relayout(&mut self) {
        let mut height = 0.0;
        for section in &self.sections {
            let region = ScrollRegion {
                pin_start: height,
                scroll_distance: section.spec.scroll_distance,
            };
            section.engine.borrow_mut().set_region(region);
            height += f64::from(self.viewport.height) + region.scroll_distance;
        }
        self.content_height = height;
        self.driver.set_limit(self.scroll_limit());
        let offset = self.driver.offset();
        self.hub.notify(offset);
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("viewport", &self.viewport)
            .field("sections", &self.sections.len())
            .field("content_height", &self.content_height)
            .field("smoothed", &self.driver.is_smoothed())
            .finish()
    }
}
