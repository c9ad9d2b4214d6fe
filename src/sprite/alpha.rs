//! Per-frame alpha masks for hit testing and ground inset estimation.

use image::RgbaImage;

use crate::constants::MAX_GROUND_INSET_RATIO;
use crate::sprite::descriptor::FrameRect;

/// The alpha channel of one frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl AlphaMask {
    /// Copies the alpha channel of `rect` out of `image`. Pixels outside the image read as
    /// transparent.
    pub fn from_image(image: &RgbaImage, rect: FrameRect) -> Option<Self> {
        if rect.width == 0 || rect.height == 0 {
            return None;
        }

        let mut alpha = Vec::with_capacity(rect.width as usize * rect.height as usize);
        for y in rect.y..rect.y.saturating_add(rect.height) {
            for x in rect.x..rect.x.saturating_add(rect.width) {
                alpha.push(image.get_pixel_checked(x, y).map_or(0, |pixel| pixel.0[3]));
            }
        }
        Some(Self {
            width: rect.width,
            height: rect.height,
            alpha,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        self.alpha[y * self.width as usize + x]
    }

    /// Samples the mask at normalized coordinates in `[0, 1)`, clamping to the edge pixels.
    pub fn sample(&self, u: f32, v: f32) -> u8 {
        let px = (u * self.width as f32).floor().clamp(0.0, (self.width - 1) as f32) as u32;
        let py = (v * self.height as f32).floor().clamp(0.0, (self.height - 1) as f32) as u32;
        self.alpha_at(px, py)
    }

    /// Transparent rows below the lowest opaque pixel, as a fraction of the height. `None` when
    /// the frame has no opaque pixel at all.
    pub fn bottom_inset_ratio(&self, threshold: u8) -> Option<f32> {
        let row_len = self.width as usize;
        let lowest_opaque = (0..self.height as usize)
            .rev()
            .find(|&y| self.alpha[y * row_len..(y + 1) * row_len].iter().any(|&a| a >= threshold))?;
        let inset = self.height as usize - 1 - lowest_opaque;
        Some(inset as f32 / self.height.max(1) as f32)
    }
}

/// The median bottom inset across frames, clamped to a small fraction of the frame height.
pub fn estimate_ground_inset<'a>(masks: impl IntoIterator<Item = &'a AlphaMask>, threshold: u8) -> f32 {
    let mut ratios: Vec<f32> = masks
        .into_iter()
        .filter_map(|mask| mask.bottom_inset_ratio(threshold))
        .collect();
    if ratios.is_empty() {
        return 0.0;
    }
    ratios.sort_by(f32::total_cmp);
    ratios[ratios.len() / 2].clamp(0.0, MAX_GROUND_INSET_RATIO)
}
