//! Fixed values shared across the pet engine.
//!
//! Anything a player might reasonably want to tune lives in [`crate::config::Tuning`] instead.

/// The version written into every growth save.
pub const SCHEMA_VERSION: u32 = 2;

/// Keys under which records are persisted.
pub mod storage {
    pub const GROWTH_KEY: &str = "desktop-pet-overlay-save";
    pub const ACTIVITY_KEY: &str = "desktop-pet-overlay-activity-exp-v1";
    pub const PETS_KEY: &str = "desktop-pet-overlay-characters-v1";
    pub const SIZE_LEVEL_KEY: &str = "desktop-pet-overlay-character-size-level-v1";
    pub const MOTION_POLICY_KEY: &str = "desktop-pet-overlay-main-motion-mode-v1";
    pub const DAILY_REPORT_KEY: &str = "desktop-pet-overlay-daily-report-v1";
}

/// Identifier of the primary pet instance.
pub const MAIN_PET_ID: &str = "main";

/// Sprite profile family used by the primary pet. Stage variants append `-egg`, `-baby`, etc.
pub const MAIN_SPRITE_PROFILE: &str = "main-cat";

/// Maximum number of buddy instances alongside the main pet.
pub const MAX_BUDDIES: usize = 8;

/// Placeholder glyphs handed out to buddies, in order.
pub const BUDDY_EMOJI_POOL: [&str; 6] = ["🐶", "🐰", "🦊", "🐼", "🐸", "🐵"];

/// Placeholder glyph for an instance whose record carried none.
pub const FALLBACK_EMOJI: &str = "🐾";

/// Rendered edge length of a pet at size level 1, in pixels.
pub const BASE_NODE_SIZE: f32 = 88.0;

/// Smallest rendered edge length, whatever the scale.
pub const MIN_NODE_SIZE: f32 = 24.0;

pub const SIZE_LEVEL_MIN: u8 = 1;
pub const SIZE_LEVEL_MAX: u8 = 10;

/// Scale applied at [`SIZE_LEVEL_MAX`]; levels in between interpolate linearly from 1.
pub const MAX_SCALE: f32 = 6.0;

/// Distance of the main pet's default spawn point from the right edge of the viewport.
pub const MAIN_DEFAULT_MARGIN_X: f32 = 48.0;

/// Upper bound for a profile's ground inset ratio.
pub const MAX_GROUND_INSET_RATIO: f32 = 0.35;

pub const DEFAULT_HIT_ALPHA_THRESHOLD: u8 = 12;
pub const DEFAULT_SPRITE_FPS: f32 = 8.0;

/// Largest simulated step per animation frame, in seconds.
pub const MAX_FRAME_STEP_SECS: f32 = 0.05;

/// Largest wall-clock gap the fixed-rate clock catches up on. Anything longer (a suspended
/// machine, a stalled host loop) counts as a pause and its missed ticks are dropped.
pub const MAX_CLOCK_STEP_SECS: u64 = 5;

/// Main pet decisions are pulled to at most this far in the future after a viewport change.
pub const REALIGN_DECISION_MS: f64 = 500.0;
