use std::collections::HashMap;
use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::growth::Stage;
use crate::pet::{PetInstance, PetKind};
use crate::sprite::descriptor::SpriteDescriptor;
use crate::sprite::profile::{ImageSource, SpriteProfile};

/// Profile key of the main pet at `stage`, always `MAIN_SPRITE_PROFILE` followed by the stage folder.
pub const fn main_profile_key(stage: Stage) -> &'static str {
    match stage {
        Stage::Egg => "main-cat-egg",
        Stage::Baby => "main-cat-baby",
        Stage::Teen => "main-cat-teen",
        Stage::Adult => "main-cat-adult",
    }
}

/// Loaded sprite profiles, shared by every instance that references them.
#[derive(Debug, Default, Clone)]
pub struct SpriteRegistry {
    profiles: HashMap<String, Arc<SpriteProfile>>,
}

impl SpriteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, profile: SpriteProfile) -> Arc<SpriteProfile> {
        let profile = Arc::new(profile);
        self.profiles.insert(profile.key().to_string(), Arc::clone(&profile));
        profile
    }

    pub fn get(&self, key: &str) -> Option<&Arc<SpriteProfile>> {
        self.profiles.get(key)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Loads the main pet's adult profile from `descriptor`, then derives the younger stages
    /// from the same descriptor by swapping the stage folder in each frame image path.
    ///
    /// The adult profile is also registered under the descriptor's own name so buddies can
    /// reference it. Returns how many stage profiles were registered.
    pub fn load_main(&mut self, descriptor: &SpriteDescriptor, source: &dyn ImageSource) -> usize {
        let Some(adult) = SpriteProfile::load(descriptor, source) else {
            warn!(name = %descriptor.name, "Main sprite could not be loaded, using placeholders");
            return 0;
        };
        self.register(adult.clone());
        self.register(adult.with_key(main_profile_key(Stage::Adult)));

        let mut loaded = 1;
        for stage in Stage::iter().filter(|stage| *stage != Stage::Adult) {
            let Some(stage_descriptor) = descriptor.for_stage(stage, main_profile_key(stage).to_string()) else {
                continue;
            };
            match SpriteProfile::load(&stage_descriptor, source) {
                Some(profile) => {
                    self.register(profile);
                    loaded += 1;
                }
                None => warn!(%stage, "Stage sprite could not be loaded"),
            }
        }
        info!(loaded, "Main sprite profiles registered");
        loaded
    }

    /// The profile an instance is drawn with.
    ///
    /// The main pet only ever uses its current stage's profile, so another stage's art never
    /// leaks in; buddies use the profile they name.
    pub fn profile_for(&self, pet: &PetInstance, stage: Stage) -> Option<&Arc<SpriteProfile>> {
        match pet.kind {
            PetKind::Main => self.get(main_profile_key(stage)),
            PetKind::Buddy => pet.sprite_profile.as_deref().and_then(|key| self.get(key)),
        }
    }
}
