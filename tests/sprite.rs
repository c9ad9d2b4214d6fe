use desktop_pet::config::EmotionTuning;
use desktop_pet::emotion::{update_idle_expression, EmotionMode, EmotionState, MoodClock};
use desktop_pet::growth::{Stage, Stats};
use desktop_pet::motion::{Motion, MotionState};
use desktop_pet::pet::{PetInstance, PetKind};
use desktop_pet::sprite::{main_profile_key, SpriteDescriptor, SpriteProfile, SpriteRegistry};
use glam::Vec2;
use pretty_assertions::assert_eq;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::json;
use speculoos::prelude::*;

mod common;

fn frames_of(profile: &SpriteProfile, state: MotionState) -> Vec<usize> {
    profile.state(state).frames.to_vec()
}

#[test]
fn test_descriptor_without_images_is_rejected() {
    assert_that(&SpriteDescriptor::parse(&json!({ "name": "cat", "states": {} }))).is_none();
    assert_that(&SpriteDescriptor::parse(&json!([1, 2, 3]))).is_none();
    assert_that(&SpriteDescriptor::from_json_str("{ not json")).is_none();
}

#[test]
fn test_descriptor_drops_malformed_entries() {
    let descriptor = SpriteDescriptor::parse(&json!({
        "image": "  atlas.png  ",
        "frameImages": [{ "id": "happy" }, { "id": " ", "image": "x.png" }],
        "frames": [{ "x": 0, "y": 0, "width": 10, "height": 10 }, { "x": 0, "y": 0, "width": 0, "height": 4 }, "junk"],
        "hitAlphaThreshold": 900,
        "states": { "idle": { "frames": [-1, 2.7] }, "walk": {} },
    }))
    .unwrap();

    assert_that(&descriptor.image.as_deref()).is_equal_to(Some("atlas.png"));
    assert_that(&descriptor.frame_images.is_empty()).is_true();
    assert_that(&descriptor.frames.len()).is_equal_to(1);
    assert_that(&descriptor.hit_alpha_threshold).is_equal_to(255);
    assert_eq!(descriptor.state(MotionState::Idle).map(|spec| spec.frames.clone()), Some(vec![2]));
    assert_that(&descriptor.state(MotionState::Walk)).is_none();
    assert_that(&descriptor.name.as_str()).is_equal_to("main");
}

#[test]
fn test_atlas_is_cut_into_a_grid() {
    let descriptor = SpriteDescriptor::parse(&json!({
        "name": "strip",
        "image": "strip.png",
        "frameWidth": 10,
        "frameHeight": 10,
        "frameCount": 3,
        "states": { "walk": { "frames": [1, 2, 99], "fps": 12, "loop": false } },
    }))
    .unwrap();
    let profile = SpriteProfile::from_images(&descriptor, Some(common::solid_frame(40, 10)), Vec::new()).unwrap();

    assert_that(&profile.frame_count()).is_equal_to(3);
    assert_eq!(frames_of(&profile, MotionState::Walk), vec![1, 2]);
    assert_that(&profile.state(MotionState::Walk).fps).is_equal_to(12.0);
    assert_that(&profile.state(MotionState::Walk).looping).is_false();
    // States the descriptor leaves out fall back to the first frame.
    assert_eq!(frames_of(&profile, MotionState::Drag), vec![0]);
    let (_, rect) = profile.frame(2).unwrap();
    assert_that(&rect.x).is_equal_to(20);
}

#[test]
fn test_states_resolve_emotion_ids_with_base_fallback() {
    let profile = common::emotion_profile(
        "cat",
        &["neutral", "happy", "sleep"],
        json!({
            "idle": { "emotions": ["neutral", "happy_2", "missing"] },
            "fall": { "emotions": ["sleep"] },
        }),
    );

    assert_eq!(frames_of(&profile, MotionState::Idle), vec![0, 1]);
    assert_eq!(frames_of(&profile, MotionState::Fall), vec![2]);
    assert_that(&profile.emotion_id(1)).is_equal_to(Some("happy"));
}

#[test]
fn test_alpha_hit_test_and_ground_inset() {
    let profile = common::emotion_profile("cat", &["neutral"], json!({}));

    assert_that(&profile.is_opaque_at(0, 0.25, 0.5)).is_true();
    assert_that(&profile.is_opaque_at(0, 0.75, 0.5)).is_false();
    assert_that(&profile.is_opaque_at(0, 0.25, 0.95)).is_false();
    // Out-of-range frames sample frame zero.
    assert_that(&profile.is_opaque_at(42, 0.25, 0.5)).is_true();
    assert_that(&profile.ground_inset_ratio()).is_close_to(0.2, 1e-6);
}

#[test]
fn test_registry_derives_stage_profiles() {
    let descriptor = SpriteDescriptor::parse(&json!({
        "name": "main-cat",
        "frameImages": [
            { "id": "neutral", "image": "/cat/adult/neutral.png" },
            { "id": "happy", "image": "/cat/adult/happy.png" },
        ],
    }))
    .unwrap();
    let images = common::MemoryImages::default()
        .with("/cat/adult/neutral.png", common::half_opaque_frame())
        .with("/cat/adult/happy.png", common::half_opaque_frame())
        .with("/cat/egg/neutral.png", common::solid_frame(8, 8));

    let mut registry = SpriteRegistry::new();
    let loaded = registry.load_main(&descriptor, &images);

    assert_that(&loaded).is_equal_to(2);
    assert_that(&registry.get("main-cat").is_some()).is_true();
    assert_that(&registry.get(main_profile_key(Stage::Adult)).is_some()).is_true();
    let egg = registry.get(main_profile_key(Stage::Egg)).unwrap();
    assert_that(&egg.frame_count()).is_equal_to(1);
    assert_that(&registry.get(main_profile_key(Stage::Teen))).is_none();

    let main = PetInstance::main("🐣", Vec2::ZERO);
    assert_that(&registry.profile_for(&main, Stage::Teen)).is_none();
    assert_that(&registry.profile_for(&main, Stage::Egg).map(|p| p.key().to_string()))
        .is_equal_to(Some("main-cat-egg".to_string()));

    let buddy = PetInstance {
        id: "buddy-1".into(),
        kind: PetKind::Buddy,
        emoji: "🐶".into(),
        x: 0.0,
        y: 0.0,
        sprite_profile: Some("main-cat".into()),
    };
    assert_that(&registry.profile_for(&buddy, Stage::Egg).is_some()).is_true();
}

#[test]
fn test_broken_main_descriptor_registers_nothing() {
    let descriptor = SpriteDescriptor::parse(&json!({ "image": "/missing.png" })).unwrap();
    let mut registry = SpriteRegistry::new();

    assert_that(&registry.load_main(&descriptor, &common::MemoryImages::default())).is_equal_to(0);
    assert_that(&registry.is_empty()).is_true();
}

fn mood_profile() -> SpriteProfile {
    common::emotion_profile(
        "cat",
        &["neutral", "happy_1", "happy_2", "sleep", "dirty"],
        json!({ "idle": { "emotions": ["neutral", "happy_1", "happy_2", "sleep", "dirty"] } }),
    )
}

#[test]
fn test_emotion_pick_holds_until_switch_time() {
    let profile = mood_profile();
    let tuning = EmotionTuning::default();
    let mut rng = SmallRng::seed_from_u64(3);
    let mut state = EmotionState::default();

    let first = state.resolve(&profile, MotionState::Idle, EmotionMode::Happy, None, 0.0, &tuning, &mut rng);
    assert_that(&[1usize, 2].contains(&first)).is_true();

    let held = state.resolve(&profile, MotionState::Idle, EmotionMode::Happy, Some(first), 4000.0, &tuning, &mut rng);
    assert_that(&held).is_equal_to(first);

    let switched = state.resolve(&profile, MotionState::Idle, EmotionMode::Happy, Some(first), 5001.0, &tuning, &mut rng);
    assert_that(&switched).is_equal_to(3 - first);

    // A mood change forces a new pick from the matching frames.
    let dirty = state.resolve(&profile, MotionState::Idle, EmotionMode::Dirty, Some(switched), 5002.0, &tuning, &mut rng);
    assert_that(&dirty).is_equal_to(4);
}

#[test]
fn test_airborne_frame_is_locked() {
    let profile = mood_profile();
    let tuning = EmotionTuning::default();
    let mut rng = SmallRng::seed_from_u64(3);
    let mut state = EmotionState::default();

    let locked = state.resolve(&profile, MotionState::Jump, EmotionMode::Happy, Some(3), 0.0, &tuning, &mut rng);
    assert_that(&locked).is_equal_to(3);
    let still = state.resolve(&profile, MotionState::Fall, EmotionMode::Dirty, Some(3), 9000.0, &tuning, &mut rng);
    assert_that(&still).is_equal_to(3);

    let landed = state.resolve(&profile, MotionState::Idle, EmotionMode::Dirty, Some(3), 9100.0, &tuning, &mut rng);
    assert_that(&landed).is_equal_to(4);
    assert!(matches!(state, EmotionState::Grounded(_)));
}

#[test]
fn test_mood_priorities() {
    let tuning = EmotionTuning::default();
    let mut rng = SmallRng::seed_from_u64(5);
    let mut mood = MoodClock::new(0.0);
    let stats = Stats {
        hunger: 80.0,
        happiness: 95.0,
        cleanliness: 50.0,
        health: 40.0,
    };

    assert_that(&mood.mode(&stats, 10.0, &tuning, &mut rng)).is_equal_to(EmotionMode::Dirty);
    let clean = Stats { cleanliness: 90.0, ..stats };
    assert_that(&mood.mode(&clean, 10.0, &tuning, &mut rng)).is_equal_to(EmotionMode::Tired);
    let healthy = Stats { health: 90.0, ..clean };
    assert_that(&mood.mode(&healthy, 10.0, &tuning, &mut rng)).is_equal_to(EmotionMode::Happy);

    let plain = Stats { happiness: 70.0, ..healthy };
    assert_that(&mood.mode(&plain, 10.0, &tuning, &mut rng)).is_equal_to(EmotionMode::Neutral);
    let neglected = mood.mode(&plain, 60_000.0, &tuning, &mut rng);
    assert_that(&[EmotionMode::Sleep, EmotionMode::Neutral].contains(&neglected)).is_true();
    // Held until the next re-roll.
    assert_that(&mood.mode(&plain, 62_000.0, &tuning, &mut rng)).is_equal_to(neglected);

    mood.mark_interaction(70_000.0);
    assert_that(&mood.mode(&plain, 70_001.0, &tuning, &mut rng)).is_equal_to(EmotionMode::Neutral);
}

#[test]
fn test_idle_expression_rotates_for_buddies() {
    let profile = mood_profile();
    let tuning = EmotionTuning::default();
    let mut rng = SmallRng::seed_from_u64(9);
    let mut motion = Motion::new(0.0, &Default::default(), &tuning, &mut rng);

    update_idle_expression(&mut motion, Some(&profile), 0.0, &tuning, &mut rng);
    let first = motion.expression_frame.expect("idle buddy gets an expression");
    let next_at = motion.next_expression_at;

    update_idle_expression(&mut motion, Some(&profile), next_at - 1.0, &tuning, &mut rng);
    assert_that(&motion.expression_frame).is_equal_to(Some(first));

    update_idle_expression(&mut motion, Some(&profile), next_at, &tuning, &mut rng);
    assert_that(&(motion.expression_frame != Some(first))).is_true();

    motion.transition(MotionState::Walk, next_at);
    update_idle_expression(&mut motion, Some(&profile), next_at, &tuning, &mut rng);
    assert_that(&motion.expression_frame).is_none();

    motion.transition(MotionState::Idle, next_at);
    update_idle_expression(&mut motion, None, next_at, &tuning, &mut rng);
    assert_that(&motion.expression_frame).is_none();
}
