//! Tolerant parsing of sprite descriptors.
//!
//! A descriptor is consumed as loose JSON: every field is optional and every malformed entry is
//! dropped on its own. Only a descriptor naming no image at all is rejected.

use serde_json::{Map, Value};
use strum::{EnumCount, IntoEnumIterator};
use tracing::{debug, warn};

use crate::constants::DEFAULT_HIT_ALPHA_THRESHOLD;
use crate::growth::Stage;
use crate::motion::MotionState;

/// A pixel rectangle inside a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One standalone frame image, tagged with an emotion id such as `happy_2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub id: String,
    pub image: String,
}

/// Frame list and timing requested for one visual state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSpec {
    pub frames: Vec<usize>,
    pub emotions: Vec<String>,
    pub fps: Option<f32>,
    pub looping: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDescriptor {
    pub version: f64,
    pub name: String,
    pub image: Option<String>,
    pub frame_images: Vec<FrameImage>,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub frame_count: Option<u32>,
    pub frames: Vec<FrameRect>,
    pub states: [Option<StateSpec>; MotionState::COUNT],
    pub default_fps: Option<f32>,
    pub hit_alpha_threshold: u8,
}

impl SpriteDescriptor {
    pub fn from_json_str(text: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::parse(&value),
            Err(error) => {
                warn!(%error, "Sprite descriptor is not valid JSON");
                None
            }
        }
    }

    /// Reads a descriptor, returning `None` when it names neither an atlas nor frame images.
    pub fn parse(raw: &Value) -> Option<Self> {
        let Value::Object(record) = raw else {
            warn!("Sprite descriptor is not an object");
            return None;
        };

        let image = read_trimmed(record.get("image"));
        let frame_images: Vec<FrameImage> = read_array(record, "frameImages")
            .filter_map(|item| {
                let item = item.as_object()?;
                Some(FrameImage {
                    id: read_trimmed(item.get("id"))?,
                    image: read_trimmed(item.get("image"))?,
                })
            })
            .collect();

        if image.is_none() && frame_images.is_empty() {
            warn!("Sprite descriptor names no images");
            return None;
        }

        let frames = read_array(record, "frames").filter_map(parse_rect).collect();

        let mut states: [Option<StateSpec>; MotionState::COUNT] = Default::default();
        if let Some(Value::Object(raw_states)) = record.get("states") {
            for state in MotionState::iter() {
                let key: &'static str = state.into();
                states[state as usize] = raw_states.get(key).and_then(parse_state);
            }
        }

        let descriptor = Self {
            version: read_finite(record.get("version")).unwrap_or(1.0),
            name: record.get("name").and_then(Value::as_str).unwrap_or("main").to_string(),
            image,
            frame_images,
            frame_width: read_dimension(record.get("frameWidth")),
            frame_height: read_dimension(record.get("frameHeight")),
            frame_count: read_dimension(record.get("frameCount")),
            frames,
            states,
            default_fps: read_finite(record.get("defaultFps")).map(|fps| fps.max(1.0) as f32),
            hit_alpha_threshold: read_finite(record.get("hitAlphaThreshold"))
                .map(|t| t.clamp(1.0, 255.0) as u8)
                .unwrap_or(DEFAULT_HIT_ALPHA_THRESHOLD),
        };
        debug!(name = %descriptor.name, frames = descriptor.frames.len(), frame_images = descriptor.frame_images.len(), "Parsed sprite descriptor");
        Some(descriptor)
    }

    pub fn state(&self, state: MotionState) -> Option<&StateSpec> {
        self.states[state as usize].as_ref()
    }

    /// A copy whose frame images point at the `stage` asset folder instead of the one they name.
    ///
    /// Only per-frame image sets have stage variants, so an atlas-only descriptor yields `None`.
    pub fn for_stage(&self, stage: Stage, name: String) -> Option<Self> {
        if self.frame_images.is_empty() {
            return None;
        }
        Some(Self {
            name,
            frame_images: self
                .frame_images
                .iter()
                .map(|frame| FrameImage {
                    id: frame.id.clone(),
                    image: remap_stage_path(&frame.image, stage),
                })
                .collect(),
            ..self.clone()
        })
    }
}

/// Replaces the first `/egg/`, `/baby/`, `/teen/` or `/adult/` segment of `path` with the folder
/// for `stage`. Paths without such a segment are returned unchanged.
pub fn remap_stage_path(path: &str, stage: Stage) -> String {
    let hit = Stage::iter()
        .filter_map(|candidate| {
            let segment = format!("/{}/", candidate.folder());
            path.find(&segment).map(|at| (at, segment.len()))
        })
        .min_by_key(|(at, _)| *at);

    match hit {
        Some((at, len)) => format!("{}/{}/{}", &path[..at], stage.folder(), &path[at + len..]),
        None => path.to_string(),
    }
}

fn read_array<'a>(record: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    record.get(key).and_then(Value::as_array).into_iter().flatten()
}

fn read_trimmed(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn read_finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn read_dimension(value: Option<&Value>) -> Option<u32> {
    read_finite(value).map(|n| n.floor().clamp(1.0, u32::MAX as f64) as u32)
}

fn parse_rect(value: &Value) -> Option<FrameRect> {
    let item = value.as_object()?;
    let x = read_finite(item.get("x"))?;
    let y = read_finite(item.get("y"))?;
    let width = read_finite(item.get("width"))?;
    let height = read_finite(item.get("height"))?;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(FrameRect {
        x: x.round().max(0.0) as u32,
        y: y.round().max(0.0) as u32,
        width: width.round().max(1.0) as u32,
        height: height.round().max(1.0) as u32,
    })
}

fn parse_state(value: &Value) -> Option<StateSpec> {
    let item = value.as_object()?;
    let frames: Vec<usize> = read_array(item, "frames")
        .filter_map(|frame| read_finite(Some(frame)))
        .filter(|frame| *frame >= 0.0)
        .map(|frame| frame.floor() as usize)
        .collect();
    let emotions: Vec<String> = read_array(item, "emotions")
        .filter_map(|emotion| read_trimmed(Some(emotion)))
        .collect();
    if frames.is_empty() && emotions.is_empty() {
        return None;
    }

    Some(StateSpec {
        frames,
        emotions,
        fps: read_finite(item.get("fps")).map(|fps| fps.max(1.0) as f32),
        looping: item.get("loop").and_then(Value::as_bool),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_stage_path() {
        assert_eq!(
            remap_stage_path("assets/cat/adult/happy_1.png", Stage::Egg),
            "assets/cat/egg/happy_1.png"
        );
        assert_eq!(remap_stage_path("assets/cat/teen/a.png", Stage::Baby), "assets/cat/baby/a.png");
        assert_eq!(remap_stage_path("adult.png", Stage::Teen), "adult.png");
    }
}
