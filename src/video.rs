//! Video frame sources and the frame-parity pixel cache.
//!
//! Capture hardware and permission flows live outside this crate; anything
//! that can fill an RGBA buffer is a `FrameSource`. The cache refreshes on
//! even ticks and reuses the previous frame on odd ones to halve capture
//! cost, which is the only cross-frame mutable resource in the render loop.

use anyhow::{Context, anyhow};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct PixelFrame {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl PixelFrame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width * height * 4],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

pub trait FrameSource {
    fn size(&self) -> (usize, usize);
    fn capture_into(&mut self, frame: &mut PixelFrame) -> anyhow::Result<()>;
}

/// Two-frame-cycle cache: capture on even ticks, serve the cached frame on
/// odd ones. The first request always captures so consumers never see the
/// zeroed buffer.
pub struct FrameCache {
    frame: PixelFrame,
    mirror: bool,
    primed: bool,
}

impl FrameCache {
    pub fn new(source: &dyn FrameSource, mirror: bool) -> Self {
        let (w, h) = source.size();
        Self {
            frame: PixelFrame::new(w, h),
            mirror,
            primed: false,
        }
    }

    pub fn frame(
        &mut self,
        source: &mut dyn FrameSource,
        tick: u64,
    ) -> anyhow::Result<&PixelFrame> {
        if !self.primed || tick % 2 == 0 {
            source.capture_into(&mut self.frame)?;
            if self.mirror {
                mirror_horizontal(&mut self.frame);
            }
            self.primed = true;
        }
        Ok(&self.frame)
    }

    /// Serve whatever is cached without touching the source.
    pub fn cached(&self) -> &PixelFrame {
        &self.frame
    }

    pub fn primed(&self) -> bool {
        self.primed
    }
}

/// Reverse each row's pixel order, matching a front-camera selfie view.
pub fn mirror_horizontal(frame: &mut PixelFrame) {
    let w = frame.width;
    if w == 0 {
        return;
    }
    for row in frame.rgba.chunks_exact_mut(w * 4) {
        let mut lo = 0usize;
        let mut hi = w.saturating_sub(1);
        while lo < hi {
            for k in 0..4 {
                row.swap(lo * 4 + k, hi * 4 + k);
            }
            lo += 1;
            hi -= 1;
        }
    }
}

/// Deterministic procedural frames: a radial blob orbiting over a diagonal
/// gradient, with a little sparkle so consecutive frames differ.
pub struct TestPatternSource {
    width: usize,
    height: usize,
    t: f32,
}

impl TestPatternSource {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            t: 0.0,
        }
    }
}

impl FrameSource for TestPatternSource {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn capture_into(&mut self, frame: &mut PixelFrame) -> anyhow::Result<()> {
        let (w, h) = (self.width, self.height);
        if frame.width != w || frame.height != h {
            *frame = PixelFrame::new(w, h);
        }

        let cx = w as f32 / 2.0 + (self.t * 0.9).cos() * w as f32 * 0.25;
        let cy = h as f32 / 2.0 + (self.t * 1.3).sin() * h as f32 * 0.25;
        let radius = (w.min(h) as f32) * 0.22;

        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) * 4;
                let base = ((x + y) as f32 / (w + h) as f32 * 110.0) as u8;

                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                let blob = if d < radius {
                    (200.0 * (1.0 - d / radius)) as u8
                } else {
                    0
                };

                let sparkle = if fastrand::u8(..) > 252 { 40 } else { 0 };
                let v = base.saturating_add(blob).saturating_add(sparkle);
                frame.rgba[i] = v;
                frame.rgba[i + 1] = v;
                frame.rgba[i + 2] = v.saturating_add(base / 4);
                frame.rgba[i + 3] = 255;
            }
        }

        self.t += 1.0 / 30.0;
        Ok(())
    }
}

/// Cyclic playback of a headerless RGBA clip: `width * height * 4` bytes per
/// frame, frames back to back. `gen_test_clip` writes this format.
pub struct RawClipSource {
    width: usize,
    height: usize,
    data: Vec<u8>,
    frame_count: usize,
    next: usize,
}

impl RawClipSource {
    pub fn open(path: &Path, width: usize, height: usize) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("clip dimensions must be nonzero"));
        }
        let data = std::fs::read(path)
            .with_context(|| format!("read raw clip {}", path.display()))?;
        let frame_bytes = width * height * 4;
        if data.is_empty() || data.len() % frame_bytes != 0 {
            return Err(anyhow!(
                "clip {} is not a whole number of {}x{} RGBA frames ({} bytes)",
                path.display(),
                width,
                height,
                data.len()
            ));
        }
        let frame_count = data.len() / frame_bytes;
        Ok(Self {
            width,
            height,
            data,
            frame_count,
            next: 0,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

impl FrameSource for RawClipSource {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn capture_into(&mut self, frame: &mut PixelFrame) -> anyhow::Result<()> {
        if frame.width != self.width || frame.height != self.height {
            *frame = PixelFrame::new(self.width, self.height);
        }
        let frame_bytes = self.width * self.height * 4;
        let at = self.next * frame_bytes;
        frame.rgba.copy_from_slice(&self.data[at..at + frame_bytes]);
        self.next = (self.next + 1) % self.frame_count;
        Ok(())
    }
}
