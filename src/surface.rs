use crate::core::Viewport;
use crate::error::{PinreelError, PinreelResult};
use crate::sequence::PreparedFrame;

/// Viewport-sized premultiplied RGBA8 pixel buffer.
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            width: viewport.width,
            height: viewport.height,
            pixels: vec![0; viewport.pixel_count() * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Reallocate for a new viewport; contents become transparent black.
    pub fn resize(&mut self, viewport: Viewport) {
        self.width = viewport.width;
        self.height = viewport.height;
        self.pixels = vec![0; viewport.pixel_count() * 4];
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Draw `frame` scaled to fill the whole surface, preserving aspect
    /// ratio and center-cropping the overflow (cover semantics).
    ///
    /// Nearest-neighbor sampling; the source must be tightly packed RGBA8.
    pub fn blit_cover(&mut self, frame: &PreparedFrame) -> PinreelResult<()> {
        let src_len = frame.width as usize * frame.height as usize * 4;
        if frame.width == 0 || frame.height == 0 || frame.rgba8_premul.len() != src_len {
            return Err(PinreelError::render(
                "frame buffer does not match its declared dimensions",
            ));
        }

        let scale = f64::from(self.width) / f64::from(frame.width);
        let scale = scale.max(f64::from(self.height) / f64::from(frame.height));

        // Centered source window after cover-scaling.
        let src_x0 = (f64::from(frame.width) - f64::from(self.width) / scale) / 2.0;
        let src_y0 = (f64::from(frame.height) - f64::from(self.height) / scale) / 2.0;

        let src = &frame.rgba8_premul[..];
        for dy in 0..self.height {
            let sy = ((f64::from(dy) + 0.5) / scale + src_y0) as u32;
            let sy = sy.min(frame.height - 1);
            let src_row = (sy as usize * frame.width as usize) * 4;
            let dst_row = (dy as usize * self.width as usize) * 4;
            for dx in 0..self.width {
                let sx = ((f64::from(dx) + 0.5) / scale + src_x0) as u32;
                let sx = sx.min(frame.width - 1);
                let s = src_row + sx as usize * 4;
                let d = dst_row + dx as usize * 4;
                self.pixels[d..d + 4].copy_from_slice(&src[s..s + 4]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn frame_from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> PreparedFrame {
        PreparedFrame {
            width,
            height,
            rgba8_premul: Arc::new(pixels),
        }
    }

    fn viewport(w: u32, h: u32) -> Viewport {
        Viewport::new(w, h).unwrap()
    }

    #[test]
    fn single_pixel_frame_fills_surface() {
        let mut surface = Surface::new(viewport(2, 2));
        let frame = frame_from_pixels(1, 1, vec![10, 20, 30, 255]);
        surface.blit_cover(&frame).unwrap();
        for px in surface.pixels().chunks_exact(4) {
            assert_eq!(px, &[10, 20, 30, 255]);
        }
    }

    #[test]
    fn wide_frame_is_center_cropped() {
        // 4x1 frame into a 1x1 surface: cover keeps the middle columns.
        let mut surface = Surface::new(viewport(1, 1));
        let frame = frame_from_pixels(
            4,
            1,
            vec![
                1, 1, 1, 255, //
                2, 2, 2, 255, //
                3, 3, 3, 255, //
                4, 4, 4, 255,
            ],
        );
        surface.blit_cover(&frame).unwrap();
        let px = &surface.pixels()[..4];
        assert!(px[0] == 2 || px[0] == 3, "expected a middle column, got {px:?}");
    }

    #[test]
    fn blit_rejects_mismatched_buffers() {
        let mut surface = Surface::new(viewport(2, 2));
        let bad = frame_from_pixels(2, 2, vec![0; 7]);
        assert!(surface.blit_cover(&bad).is_err());
        let empty = frame_from_pixels(0, 0, vec![]);
        assert!(surface.blit_cover(&empty).is_err());
    }

    #[test]
    fn clear_and_resize_reset_pixels() {
        let mut surface = Surface::new(viewport(2, 1));
        let frame = frame_from_pixels(1, 1, vec![9, 9, 9, 255]);
        surface.blit_cover(&frame).unwrap();
        surface.clear();
        assert!(surface.pixels().iter().all(|&b| b == 0));

        surface.resize(viewport(3, 3));
        assert_eq!(surface.pixels().len(), 3 * 3 * 4);
        assert!(surface.pixels().iter().all(|&b| b == 0));
    }
}
