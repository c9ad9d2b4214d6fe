//! Immutable sprite profiles built from a descriptor and its decoded images.

use std::collections::HashMap;

use image::RgbaImage;
use smallvec::{smallvec, SmallVec};
use strum::{EnumCount, IntoEnumIterator};
use tracing::{debug, warn};

use crate::constants::DEFAULT_SPRITE_FPS;
use crate::error::SpriteError;
use crate::motion::MotionState;
use crate::sprite::alpha::{estimate_ground_inset, AlphaMask};
use crate::sprite::descriptor::{FrameRect, SpriteDescriptor};

/// Decodes the images a descriptor refers to. Paths are passed through exactly as written in
/// the descriptor.
pub trait ImageSource {
    fn load(&self, path: &str) -> Result<RgbaImage, SpriteError>;
}

/// The frame sequence and timing of one visual state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFrames {
    pub frames: SmallVec<[usize; 8]>,
    pub fps: f32,
    pub looping: bool,
}

impl StateFrames {
    fn fallback(state: MotionState) -> Self {
        let (fps, looping) = match state {
            MotionState::Idle => (2.0, true),
            MotionState::Walk => (8.0, true),
            MotionState::Jump => (10.0, false),
            MotionState::Fall => (10.0, true),
            MotionState::Drag => (6.0, true),
        };
        Self {
            frames: smallvec![0],
            fps,
            looping,
        }
    }
}

#[derive(Debug, Clone)]
struct ProfileFrame {
    image: usize,
    rect: FrameRect,
    emotion_id: Option<String>,
    mask: Option<AlphaMask>,
}

/// Everything needed to draw and hit-test one visual identity.
#[derive(Debug, Clone)]
pub struct SpriteProfile {
    key: String,
    images: Vec<RgbaImage>,
    frames: Vec<ProfileFrame>,
    states: [StateFrames; MotionState::COUNT],
    hit_alpha_threshold: u8,
    ground_inset_ratio: f32,
}

impl SpriteProfile {
    /// Loads every image the descriptor names. Images that fail to load are skipped; `None` is
    /// returned when nothing usable remains.
    pub fn load(descriptor: &SpriteDescriptor, source: &dyn ImageSource) -> Option<Self> {
        let atlas = descriptor.image.as_deref().and_then(|path| match source.load(path) {
            Ok(image) => Some(image),
            Err(error) => {
                warn!(path, %error, "Sprite atlas could not be loaded");
                None
            }
        });

        let frame_images = descriptor
            .frame_images
            .iter()
            .filter_map(|frame| match source.load(&frame.image) {
                Ok(image) => Some((frame.id.clone(), image)),
                Err(error) => {
                    warn!(path = %frame.image, %error, "Sprite frame could not be loaded");
                    None
                }
            })
            .collect();

        Self::from_images(descriptor, atlas, frame_images)
    }

    /// Builds a profile from already decoded images.
    ///
    /// Standalone frame images take precedence over the atlas; each becomes one full-image frame
    /// tagged with its emotion id. An atlas is cut by explicit rectangles when any fit inside
    /// it, otherwise by a uniform grid.
    pub fn from_images(
        descriptor: &SpriteDescriptor,
        atlas: Option<RgbaImage>,
        frame_images: Vec<(String, RgbaImage)>,
    ) -> Option<Self> {
        let frame_images: Vec<_> = frame_images
            .into_iter()
            .filter(|(_, image)| image.width() > 0 && image.height() > 0)
            .collect();

        let (images, frames): (Vec<RgbaImage>, Vec<ProfileFrame>) = if !frame_images.is_empty() {
            frame_images
                .into_iter()
                .enumerate()
                .map(|(index, (id, image))| {
                    let rect = FrameRect {
                        x: 0,
                        y: 0,
                        width: image.width(),
                        height: image.height(),
                    };
                    let frame = ProfileFrame {
                        image: index,
                        rect,
                        emotion_id: Some(id),
                        mask: AlphaMask::from_image(&image, rect),
                    };
                    (image, frame)
                })
                .unzip()
        } else {
            let atlas = atlas.filter(|image| image.width() > 0 && image.height() > 0)?;
            let frames = atlas_frames(descriptor, atlas.width(), atlas.height())
                .into_iter()
                .map(|rect| ProfileFrame {
                    image: 0,
                    rect,
                    emotion_id: None,
                    mask: AlphaMask::from_image(&atlas, rect),
                })
                .collect();
            (vec![atlas], frames)
        };

        let mut emotion_frames: HashMap<&str, usize> = HashMap::new();
        for (index, frame) in frames.iter().enumerate() {
            if let Some(id) = frame.emotion_id.as_deref() {
                emotion_frames.entry(id).or_insert(index);
            }
        }
        let states = resolve_states(descriptor, frames.len(), &emotion_frames);

        let threshold = descriptor.hit_alpha_threshold;
        let ground_inset_ratio = estimate_ground_inset(frames.iter().filter_map(|f| f.mask.as_ref()), threshold);

        debug!(
            key = %descriptor.name,
            frames = frames.len(),
            ground_inset_ratio,
            "Built sprite profile"
        );
        Some(Self {
            key: descriptor.name.clone(),
            images,
            frames,
            states,
            hit_alpha_threshold: threshold,
            ground_inset_ratio,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn state(&self, state: MotionState) -> &StateFrames {
        &self.states[state as usize]
    }

    pub fn emotion_id(&self, frame: usize) -> Option<&str> {
        self.frames.get(frame)?.emotion_id.as_deref()
    }

    /// The source image and rectangle to draw for `frame`.
    pub fn frame(&self, frame: usize) -> Option<(&RgbaImage, FrameRect)> {
        let frame = self.frames.get(frame)?;
        Some((self.images.get(frame.image)?, frame.rect))
    }

    pub fn hit_alpha_threshold(&self) -> u8 {
        self.hit_alpha_threshold
    }

    pub fn ground_inset_ratio(&self) -> f32 {
        self.ground_inset_ratio
    }

    /// Whether the pixel at normalized frame coordinates `(u, v)` is opaque enough to hit.
    ///
    /// Out-of-range frames sample frame 0; a frame without a mask counts as opaque.
    pub fn is_opaque_at(&self, frame: usize, u: f32, v: f32) -> bool {
        let mask = self.frames.get(frame).or_else(|| self.frames.first()).and_then(|f| f.mask.as_ref());
        match mask {
            Some(mask) => mask.sample(u, v) >= self.hit_alpha_threshold,
            None => true,
        }
    }
}

fn atlas_frames(descriptor: &SpriteDescriptor, width: u32, height: u32) -> Vec<FrameRect> {
    let explicit: Vec<FrameRect> = descriptor
        .frames
        .iter()
        .map(|frame| FrameRect {
            x: frame.x.min(width - 1),
            y: frame.y.min(height - 1),
            width: frame.width.clamp(1, width),
            height: frame.height.clamp(1, height),
        })
        .filter(|frame| frame.x + frame.width <= width && frame.y + frame.height <= height)
        .collect();
    if !explicit.is_empty() {
        return explicit;
    }

    let frame_width = descriptor.frame_width.unwrap_or(width);
    let frame_height = descriptor.frame_height.unwrap_or(height);
    let columns = (width / frame_width).max(1);
    let rows = (height / frame_height).max(1);
    let capacity = columns * rows;
    let count = descriptor.frame_count.map_or(capacity, |count| count.min(capacity));

    (0..count)
        .map(|index| FrameRect {
            x: (index % columns) * frame_width,
            y: (index / columns) * frame_height,
            width: frame_width,
            height: frame_height,
        })
        .collect()
}

/// `happy_2` falls back to `happy`; ids without a numeric suffix have no base.
fn base_emotion_id(id: &str) -> Option<&str> {
    let (base, suffix) = id.rsplit_once('_')?;
    (!suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit())).then_some(base)
}

fn resolve_states(
    descriptor: &SpriteDescriptor,
    frame_count: usize,
    emotion_frames: &HashMap<&str, usize>,
) -> [StateFrames; MotionState::COUNT] {
    let default_fps = descriptor.default_fps.unwrap_or(DEFAULT_SPRITE_FPS);
    let resolve_emotion = |id: &String| -> Option<usize> {
        emotion_frames
            .get(id.as_str())
            .or_else(|| base_emotion_id(id).and_then(|base| emotion_frames.get(base)))
            .copied()
    };

    let mut states = MotionState::ALL.map(StateFrames::fallback);

    for state in MotionState::iter() {
        let Some(spec) = descriptor.state(state) else {
            continue;
        };

        let direct: SmallVec<[usize; 8]> = spec.frames.iter().copied().filter(|&f| f < frame_count).collect();
        let frames = if !direct.is_empty() {
            direct
        } else {
            spec.emotions.iter().filter_map(resolve_emotion).collect()
        };
        if frames.is_empty() {
            continue;
        }

        let fallback_loop = states[state as usize].looping;
        states[state as usize] = StateFrames {
            frames,
            fps: spec.fps.unwrap_or(default_fps),
            looping: spec.looping.unwrap_or(fallback_loop),
        };
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_emotion_id() {
        assert_eq!(base_emotion_id("happy_2"), Some("happy"));
        assert_eq!(base_emotion_id("happy"), None);
        assert_eq!(base_emotion_id("sleep_x"), None);
        assert_eq!(base_emotion_id("very_happy_10"), Some("very_happy"));
    }
}
