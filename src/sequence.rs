use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use crate::core::FrameIndex;
use crate::error::{PinreelError, PinreelResult};

/// Image container format for frame assets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Webp,
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn ext(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

/// Decoded frame in premultiplied RGBA8, row-major, tightly packed.
#[derive(Clone, Debug)]
pub struct PreparedFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode an encoded image into a premultiplied frame.
pub fn decode_frame(bytes: &[u8]) -> PinreelResult<PreparedFrame> {
    let dyn_img = image::load_from_memory(bytes).context("decode frame from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedFrame {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Normalize and validate a sequence name used as an asset directory.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub(crate) fn normalize_sequence_name(name: &str) -> PinreelResult<String> {
    let s = name.replace('\\', "/");
    if s.starts_with('/') {
        return Err(PinreelError::validation("sequence names must be relative"));
    }
    if s.is_empty() {
        return Err(PinreelError::validation("sequence name must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(PinreelError::validation(
                "sequence names must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(PinreelError::validation(
            "sequence name must contain a directory name",
        ));
    }

    Ok(out.join("/"))
}

/// Derive the asset path for one frame of a sequence.
///
/// Frame `i` of sequence `name` lives at `{name}/{i:04}.{ext}`. The
/// zero-padding width and name-as-directory convention are load-bearing.
pub fn frame_asset_path(name: &str, index: FrameIndex, format: ImageFormat) -> PinreelResult<String> {
    let name = normalize_sequence_name(name)?;
    Ok(format!("{name}/{:04}.{}", index.0, format.ext()))
}

/// One outstanding frame load, issued by [`SequenceStore::begin_load`].
///
/// Tickets are valid only against the store generation that issued them;
/// completions for older generations are discarded.
#[derive(Clone, Debug)]
pub struct FrameTicket {
    pub index: FrameIndex,
    pub path: String,
    generation: u64,
}

/// Holds the ordered frame slots for at most one live sequence.
///
/// All frames of a sequence begin loading the instant it is created; loads
/// complete independently and in arbitrary order. Re-invoking `begin_load`
/// or calling `clear` bumps the generation so stale completions never write
/// into the new sequence's storage.
#[derive(Debug, Default)]
pub struct SequenceStore {
    name: Option<String>,
    frames: Vec<Option<Arc<PreparedFrame>>>,
    generation: u64,
}

impl SequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start loading `frame_count` frames of `name`, discarding any previous
    /// sequence. Returns one ticket per frame, index order, all issued
    /// immediately.
    pub fn begin_load(
        &mut self,
        name: &str,
        frame_count: u32,
        format: ImageFormat,
    ) -> PinreelResult<Vec<FrameTicket>> {
        if frame_count == 0 {
            return Err(PinreelError::validation("frame_count must be > 0"));
        }
        let normalized = normalize_sequence_name(name)?;

        self.generation += 1;
        self.name = Some(normalized.clone());
        self.frames = vec![None; frame_count as usize];
        debug!(sequence = %normalized, frame_count, "sequence load started");

        (0..frame_count)
            .map(|i| {
                Ok(FrameTicket {
                    index: FrameIndex(i),
                    path: frame_asset_path(&normalized, FrameIndex(i), format)?,
                    generation: self.generation,
                })
            })
            .collect()
    }

    /// Apply a finished load. Returns `false` when the result was discarded:
    /// stale generation, out-of-range index, or a failed load (which is
    /// non-fatal and leaves the slot empty).
    pub fn complete(
        &mut self,
        ticket: &FrameTicket,
        frame: PinreelResult<PreparedFrame>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(path = %ticket.path, "discarding stale frame completion");
            return false;
        }
        let slot = ticket.index.0 as usize;
        if slot >= self.frames.len() {
            debug!(path = %ticket.path, "discarding out-of-range frame completion");
            return false;
        }
        match frame {
            Ok(frame) => {
                self.frames[slot] = Some(Arc::new(frame));
                true
            }
            Err(err) => {
                warn!(path = %ticket.path, error = %err, "frame load failed");
                false
            }
        }
    }

    /// Resolve a frame index to its image, or `None` when the frame has not
    /// finished loading or the index is out of bounds. Callers skip the draw
    /// on `None` rather than fail.
    pub fn resolve(&self, index: FrameIndex) -> Option<Arc<PreparedFrame>> {
        self.frames.get(index.0 as usize)?.clone()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn frame_count(&self) -> u32 {
        self.frames.len() as u32
    }

    pub fn loaded_count(&self) -> u32 {
        self.frames.iter().filter(|f| f.is_some()).count() as u32
    }

    pub fn is_fully_loaded(&self) -> bool {
        !self.frames.is_empty() && self.loaded_count() == self.frame_count()
    }

    /// Release every frame handle and invalidate outstanding tickets.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.name = None;
        self.frames.clear();
    }
}

/// Fetches encoded frame assets and decodes them.
pub trait FrameLoader {
    fn fetch(&self, path: &str) -> PinreelResult<PreparedFrame>;
}

/// Loads frame assets from a directory tree on disk.
#[derive(Clone, Debug)]
pub struct DiskFrameLoader {
    root: PathBuf,
}

impl DiskFrameLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FrameLoader for DiskFrameLoader {
    fn fetch(&self, path: &str) -> PinreelResult<PreparedFrame> {
        let full = self.root.join(path);
        let bytes = std::fs::read(&full)
            .with_context(|| format!("read frame asset '{}'", full.display()))?;
        decode_frame(&bytes)
    }
}

/// Drive every ticket to completion through `loader`, returning the number
/// of frames that applied. Individual failures are skipped, never fatal.
pub fn load_blocking(
    store: &mut SequenceStore,
    tickets: &[FrameTicket],
    loader: &dyn FrameLoader,
) -> u32 {
    let mut applied = 0;
    for ticket in tickets {
        if store.complete(ticket, loader.fetch(&ticket.path)) {
            applied += 1;
        }
    }
    applied
}
