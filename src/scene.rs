//! Minimal point projection: the rendering-backend side of the field.
//!
//! Particles live in video-pixel units centered on the origin. The camera
//! sits on the +Z axis at `min(view_w, view_h)` looking at the origin with a
//! 45 degree vertical fov. Far-sentinel particles sit behind the camera and
//! are skipped, which is what hides stride-filtered points.

use crate::field::ParticleField;

const FOV_DEG: f32 = 45.0;
const NEAR: f32 = 0.1;

pub const BACKGROUND: [u8; 3] = [17, 17, 17];

pub struct PointProjector {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl PointProjector {
    pub fn new(width: usize, height: usize) -> Self {
        let mut p = Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        };
        p.resize(width, height);
        p
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width * height * 4, 0);
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Project the field into the RGBA buffer and return it.
    pub fn project(&mut self, field: &ParticleField) -> &[u8] {
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = BACKGROUND[0];
            px[1] = BACKGROUND[1];
            px[2] = BACKGROUND[2];
            px[3] = 255;
        }
        if self.width == 0 || self.height == 0 {
            return &self.pixels;
        }

        let camera_z = (self.width.min(self.height)).max(1) as f32;
        let focal = (self.height as f32 / 2.0) / (FOV_DEG.to_radians() / 2.0).tan();
        let cx = self.width as f32 / 2.0;
        let cy = self.height as f32 / 2.0;

        let [r, g, b] = field.color();
        let rgb = [
            (r.clamp(0.0, 1.0) * 255.0) as u8,
            (g.clamp(0.0, 1.0) * 255.0) as u8,
            (b.clamp(0.0, 1.0) * 255.0) as u8,
        ];

        // Source pixels rarely match the view, so scale the field into it.
        let fit = if field.width() > 0 && field.height() > 0 {
            (self.width as f32 / field.width() as f32)
                .min(self.height as f32 / field.height() as f32)
        } else {
            1.0
        };

        for p in field.positions() {
            let depth = camera_z - p.z;
            if depth <= NEAR {
                continue;
            }
            let sx = cx + p.x * fit * focal / depth;
            let sy = cy - p.y * fit * focal / depth;
            if sx < 0.0 || sy < 0.0 {
                continue;
            }
            let (xi, yi) = (sx as usize, sy as usize);
            if xi >= self.width || yi >= self.height {
                continue;
            }
            let at = (yi * self.width + xi) * 4;
            self.pixels[at] = rgb[0];
            self.pixels[at + 1] = rgb[1];
            self.pixels[at + 2] = rgb[2];
            self.pixels[at + 3] = 255;
        }

        &self.pixels
    }
}
