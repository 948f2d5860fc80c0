//! The particle field and the per-frame depth mapping.
//!
//! One particle exists per source pixel, laid out in raster order. X and Y
//! are fixed at creation from the frame dimensions; only Z and the shared
//! tint mutate afterward. A stride (`density`) hides most particles by
//! parking them on the far plane instead of removing them, so the particle
//! count never changes across frames.

use crate::spectrum::BandEnergies;
use crate::video::PixelFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// What the depth mapper needs from a particle store. Backends that upload
/// positions elsewhere (GPU, protocol, test probe) implement this instead of
/// exposing their buffers.
pub trait DepthSurface {
    fn particle_count(&self) -> usize;
    fn set_z(&mut self, index: usize, z: f32);
    fn set_color(&mut self, rgb: [f32; 3]);
    /// Mark mutated positions for re-upload by the rendering backend.
    fn flush_dirty(&mut self);
}

pub struct ParticleField {
    positions: Vec<Vec3>,
    color: [f32; 3],
    width: usize,
    height: usize,
    dirty: bool,
}

impl ParticleField {
    /// Build the field from the first captured frame's dimensions, centered
    /// on the origin with Y up.
    pub fn from_frame_size(width: usize, height: usize) -> Self {
        let half_w = width as f32 / 2.0;
        let half_h = height as f32 / 2.0;
        let mut positions = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                positions.push(Vec3::new(x as f32 - half_w, half_h - y as f32, 0.0));
            }
        }
        Self {
            positions,
            color: [1.0, 1.0, 1.0],
            width,
            height,
            dirty: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Consume the dirty flag after the backend re-uploaded positions.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl DepthSurface for ParticleField {
    fn particle_count(&self) -> usize {
        self.positions.len()
    }

    fn set_z(&mut self, index: usize, z: f32) {
        if let Some(p) = self.positions.get_mut(index) {
            p.z = z;
        }
    }

    fn set_color(&mut self, rgb: [f32; 3]) {
        self.color = rgb;
    }

    fn flush_dirty(&mut self) {
        self.dirty = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthParams {
    /// Stride: only every `density`-th particle is depth-modulated.
    pub density: usize,
    /// Grayscale cut above which a particle snaps to the far plane. The
    /// inherited default sits above the byte range, which leaves that branch
    /// idle; values <= 255 re-arm it.
    pub threshold: f32,
    /// Far sentinel, past the camera's visible range.
    pub far_z: f32,
    /// Depth gain applied to gray * band energy.
    pub gain: f32,
}

impl Default for DepthParams {
    fn default() -> Self {
        Self {
            density: 2,
            threshold: 300.0,
            far_z: 10_000.0,
            gain: 5.0,
        }
    }
}

/// Map band energies and frame brightness onto particle depths.
///
/// The tint is written once per call. Pixel bytes are addressed at the full
/// frame resolution (`i * 4`) even under a stride; particles past the end of
/// a short buffer take the far sentinel instead of reading out of bounds.
pub fn map_depths(
    surface: &mut dyn DepthSurface,
    frame: &PixelFrame,
    energies: BandEnergies,
    params: &DepthParams,
) {
    surface.set_color(energies.tint());

    let density = params.density.max(1);
    let rgba = frame.rgba.as_slice();
    for i in 0..surface.particle_count() {
        if i % density != 0 {
            surface.set_z(i, params.far_z);
            continue;
        }

        let at = i * 4;
        let Some(px) = rgba.get(at..at + 3) else {
            surface.set_z(i, params.far_z);
            continue;
        };
        let gray = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;

        let z = if gray >= params.threshold {
            params.far_z
        } else if gray < params.threshold / 3.0 {
            gray * energies.bass * params.gain
        } else if gray < params.threshold / 2.0 {
            gray * energies.mid * params.gain
        } else {
            gray * energies.treble * params.gain
        };
        surface.set_z(i, z);
    }

    surface.flush_dirty();
}
