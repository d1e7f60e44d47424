#![forbid(unsafe_code)]

pub mod core;
pub mod ease;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod page;
pub mod pin;
pub mod render;
pub mod scroll;
pub mod section;
pub mod sequence;
pub mod surface;

pub use crate::core::{
    DEFAULT_SCROLL_DISTANCE, FrameIndex, Point, Progress, Rect, ScrollRegion, Vec2, Viewport,
};
pub use ease::Ease;
pub use error::{PinreelError, PinreelResult};
pub use filter::{FilterOp, VisualFilter};
pub use mapper::map_frame;
pub use page::{Page, ScrollDriver, SectionId, SmoothOptions};
pub use pin::{PinController, PinPhase, PinUpdate};
pub use render::{FrameRenderer, RenderOutcome, SurfaceRenderer, SwapRenderer};
pub use scroll::{
    DEFAULT_SMOOTH_DURATION, NativeScroll, ScrollHub, SmoothScroll, SubscriberId,
};
pub use section::{DEFAULT_FRAME_COUNT, PlaybackEngine, SectionSpec};
pub use sequence::{
    DiskFrameLoader, FrameLoader, FrameTicket, ImageFormat, PreparedFrame, SequenceStore,
    decode_frame, frame_asset_path, load_blocking,
};
pub use surface::Surface;
