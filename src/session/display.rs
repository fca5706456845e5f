use crate::foundation::core::{PixelBuffer, PixelFormat, Rect};

/// On-screen target of published frames. Control thread only.
pub trait DisplaySurface {
    /// Layout bounds of the visible area, `None` while not attached to a live display.
    fn layout_bounds(&self) -> Option<Rect>;

    /// Resize the logical drawing region.
    fn resize(&mut self, width: u32, height: u32);

    /// Clear a rectangle to transparent.
    fn clear(&mut self, x: u32, y: u32, w: u32, h: u32);

    /// Copy a `w x h` block from `buffer` to `(x, y)`. Row `r` of the block starts at
    /// `buffer[offset + r * stride]`.
    #[allow(clippy::too_many_arguments)]
    fn blit(
        &mut self,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        format: PixelFormat,
        buffer: &[u32],
        offset: usize,
        stride: usize,
    );
}

/// Side length of the square a display of `bounds` can show.
pub fn max_render_size(bounds: Rect) -> u32 {
    let side = bounds.width().abs().max(bounds.height().abs()).round();
    if side.is_finite() && side > 0.0 {
        side.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Applies finished frames to a [`DisplaySurface`] in generation order.
#[derive(Clone, Debug, Default)]
pub struct DisplayPublisher {
    render_size: u32,
    last_generation: Option<u64>,
    published: u64,
}

impl DisplayPublisher {
    /// `max(width, height)` of the frame on screen, 0 before the first publish.
    pub fn render_size(&self) -> u32 {
        self.render_size
    }

    /// Chain generation of the frame on screen.
    pub fn last_generation(&self) -> Option<u64> {
        self.last_generation
    }

    /// Number of frames applied so far.
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Replace the displayed frame with `pixels`: resize, clear, one blit.
    ///
    /// Frames from a generation older than the one on screen are discarded (returns `false`).
    pub fn publish(
        &mut self,
        display: &mut dyn DisplaySurface,
        generation: u64,
        pixels: &PixelBuffer,
    ) -> bool {
        if let Some(last) = self.last_generation
            && generation < last
        {
            tracing::debug!(generation, last, "discarding stale frame");
            return false;
        }
        let (w, h) = (pixels.width, pixels.height);
        display.resize(w, h);
        display.clear(0, 0, w, h);
        display.blit(0, 0, w, h, PixelFormat::Argb32, &pixels.data, 0, w as usize);
        self.render_size = w.max(h);
        self.last_generation = Some(generation);
        self.published += 1;
        true
    }
}

/// Display backed by a pixel vector; used headless and in tests.
#[derive(Clone, Debug)]
pub struct MemoryDisplay {
    bounds: Option<Rect>,
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    blits: u64,
}

impl MemoryDisplay {
    /// Attached display whose visible area is `width x height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bounds: Some(Rect::new(0.0, 0.0, f64::from(width), f64::from(height))),
            width: 0,
            height: 0,
            pixels: Vec::new(),
            blits: 0,
        }
    }

    /// Display that is not attached yet.
    pub fn detached() -> Self {
        Self {
            bounds: None,
            ..Self::new(0, 0)
        }
    }

    /// Attach, detach or resize the visible area.
    pub fn set_layout_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    /// Current frame, `None` before anything was drawn.
    pub fn frame(&self) -> Option<PixelBuffer> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(PixelBuffer {
            width: self.width,
            height: self.height,
            data: self.pixels.clone(),
        })
    }

    /// Number of blits received.
    pub fn blit_count(&self) -> u64 {
        self.blits
    }
}

impl DisplaySurface for MemoryDisplay {
    fn layout_bounds(&self) -> Option<Rect> {
        self.bounds
    }

    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width as usize * height as usize];
        }
    }

    fn clear(&mut self, x: u32, y: u32, w: u32, h: u32) {
        let width = self.width as usize;
        for row in y..y.saturating_add(h).min(self.height) {
            let start = row as usize * width + x as usize;
            let end = row as usize * width + x.saturating_add(w).min(self.width) as usize;
            if let Some(span) = self.pixels.get_mut(start..end) {
                span.fill(0);
            }
        }
    }

    fn blit(
        &mut self,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        _format: PixelFormat,
        buffer: &[u32],
        offset: usize,
        stride: usize,
    ) {
        self.blits += 1;
        let width = self.width as usize;
        let cols = x.saturating_add(w).min(self.width).saturating_sub(x) as usize;
        for r in 0..h.min(self.height.saturating_sub(y)) as usize {
            let src_start = offset + r * stride;
            let Some(src) = buffer.get(src_start..src_start + cols) else {
                break;
            };
            let dst_start = (y as usize + r) * width + x as usize;
            if let Some(dst) = self.pixels.get_mut(dst_start..dst_start + cols) {
                dst.copy_from_slice(src);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/display.rs"]
mod tests;
