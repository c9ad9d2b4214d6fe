#![allow(dead_code)]

use std::collections::HashMap;

use desktop_pet::clock::ManualClock;
use desktop_pet::config::Settings;
use desktop_pet::error::SpriteError;
use desktop_pet::simulation::Simulation;
use desktop_pet::sprite::{ImageSource, SpriteDescriptor, SpriteProfile, SpriteRegistry};
use desktop_pet::store::MemoryStore;
use image::{Rgba, RgbaImage};
use serde_json::{json, Value};
use time::macros::datetime;
use time::OffsetDateTime;

pub const VIEWPORT_WIDTH: f32 = 800.0;
pub const VIEWPORT_HEIGHT: f32 = 600.0;

pub fn start_time() -> OffsetDateTime {
    datetime!(2024-05-01 09:00 UTC)
}

pub fn settings() -> Settings {
    Settings {
        viewport_width: VIEWPORT_WIDTH,
        viewport_height: VIEWPORT_HEIGHT,
        seed: Some(7),
        ..Settings::default()
    }
}

/// A 10x10 frame whose left half is opaque and whose bottom two rows are transparent.
pub fn half_opaque_frame() -> RgbaImage {
    RgbaImage::from_fn(10, 10, |x, y| {
        if x < 5 && y < 8 {
            Rgba([200, 120, 40, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// A solid frame of the given size.
pub fn solid_frame(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
}

/// Builds a profile named `key` from per-emotion frames, with `states` as the descriptor's
/// state table.
pub fn emotion_profile(key: &str, ids: &[&str], states: Value) -> SpriteProfile {
    let frame_images: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "image": format!("/adult/{id}.png") }))
        .collect();
    let descriptor = SpriteDescriptor::parse(&json!({
        "name": key,
        "frameImages": frame_images,
        "states": states,
    }))
    .expect("descriptor names frame images");
    let images = ids.iter().map(|id| (id.to_string(), half_opaque_frame())).collect();
    SpriteProfile::from_images(&descriptor, None, images).expect("profile has frames")
}

/// Images served from memory, keyed by descriptor path.
#[derive(Default)]
pub struct MemoryImages {
    images: HashMap<String, RgbaImage>,
}

impl MemoryImages {
    pub fn with(mut self, path: &str, image: RgbaImage) -> Self {
        self.images.insert(path.to_string(), image);
        self
    }
}

impl ImageSource for MemoryImages {
    fn load(&self, path: &str) -> Result<RgbaImage, SpriteError> {
        self.images.get(path).cloned().ok_or_else(|| SpriteError::Read {
            path: path.into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not in memory"),
        })
    }
}

/// A simulation on an empty store with placeholder art, plus the clock driving it.
pub fn simulation() -> (Simulation<MemoryStore>, ManualClock) {
    simulation_with(MemoryStore::new(), SpriteRegistry::new())
}

pub fn simulation_with(store: MemoryStore, registry: SpriteRegistry) -> (Simulation<MemoryStore>, ManualClock) {
    let clock = ManualClock::new(start_time());
    let simulation = Simulation::load(store, Box::new(clock.clone()), registry, &settings());
    (simulation, clock)
}

/// Runs animation frames every 16 ms from `from` up to and including `to`.
pub fn run_frames(simulation: &mut Simulation<MemoryStore>, from: f64, to: f64) {
    let mut now = from;
    while now <= to {
        simulation.on_frame(now);
        now += 16.0;
    }
}
