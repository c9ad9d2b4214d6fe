//! Sprite descriptors, decoded profiles and per-frame alpha data.

pub mod alpha;
pub mod animation;
pub mod descriptor;
pub mod profile;
pub mod registry;

pub use alpha::AlphaMask;
pub use descriptor::{FrameRect, SpriteDescriptor};
pub use profile::{ImageSource, SpriteProfile, StateFrames};
pub use registry::{main_profile_key, SpriteRegistry};
