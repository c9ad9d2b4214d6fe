//! The simulation context: every piece of pet state and the operations the host drives it with.
//!
//! A host creates one [`Simulation`] with [`Simulation::load`], feeds it wall-clock progress
//! ([`Simulation::advance_clock`]), animation frames ([`Simulation::on_frame`]) and pointer
//! input, and drains [`SimEvent`]s after each call. Every externally visible mutation is
//! persisted immediately; [`Simulation::shutdown`] writes the daily report and flushes the rest.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::Value;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use time::OffsetDateTime;
use tracing::{debug, info, trace, warn};

use crate::activity::{ActivityAccountant, InputKind, ManualGrant};
use crate::clock::Clock;
use crate::config::{Settings, Tuning};
use crate::constants::storage::{
    ACTIVITY_KEY, DAILY_REPORT_KEY, GROWTH_KEY, MOTION_POLICY_KEY, PETS_KEY, SIZE_LEVEL_KEY,
};
use crate::constants::{MAIN_DEFAULT_MARGIN_X, REALIGN_DECISION_MS, SIZE_LEVEL_MAX, SIZE_LEVEL_MIN};
use crate::emotion::{update_idle_expression, EmotionState, MoodClock};
use crate::error::StoreError;
use crate::events::{CheckinDenial, ExpSource, SimEvent};
use crate::growth::{Action, ActionOutcome, GrowthLedger, Stage, StageChange};
use crate::input::{PointerEvent, Region};
use crate::motion::drag::{DragGesture, DragRelease};
use crate::motion::{self, Bounds, Facing, Motion, MotionPolicy, MotionState};
use crate::pet::{size_for_level, size_level_from_value, PetInstance, PetRoster};
use crate::report::DailyReport;
use crate::scheduler::{FrameClock, Scheduler};
use crate::sprite::animation::{effective_fps, frame_at};
use crate::sprite::{SpriteProfile, SpriteRegistry};

/// The persisted records, each under its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
enum Record {
    Growth,
    Activity,
    Pets,
    SizeLevel,
    MotionPolicy,
    Report,
}

/// How one instance should be drawn this frame.
#[derive(Debug, Clone)]
pub enum Appearance {
    Sprite { profile: Arc<SpriteProfile>, frame: usize },
    /// No sprite profile is available; draw the glyph instead.
    Placeholder { glyph: String },
}

#[derive(Debug, Clone)]
pub struct Visual {
    pub position: Vec2,
    pub size: f32,
    pub facing: Facing,
    pub state: MotionState,
    pub appearance: Appearance,
}

pub struct Simulation<S> {
    store: S,
    clock: Box<dyn Clock>,
    rng: SmallRng,
    tuning: Tuning,
    ledger: GrowthLedger,
    activity: ActivityAccountant,
    roster: PetRoster,
    registry: SpriteRegistry,
    motions: HashMap<String, Motion>,
    last_frames: HashMap<String, usize>,
    emotion: EmotionState,
    mood: MoodClock,
    policy: MotionPolicy,
    size_level: u8,
    viewport: Vec2,
    scheduler: Scheduler,
    frame_clock: FrameClock,
    /// Latest animation timestamp seen, in milliseconds.
    anim_now: f64,
    drag: Option<DragGesture>,
    drag_lock: u32,
    click_through: bool,
    panel: Option<Region>,
    panel_visible: bool,
    hover: Option<Vec2>,
    capture: Option<bool>,
    report: Option<DailyReport>,
    events: VecDeque<SimEvent>,
}

impl<S: crate::store::KeyValueStore> Simulation<S> {
    /// Restores every record from `store`, catches up on offline decay and the activity day,
    /// and persists the normalized result.
    pub fn load(store: S, clock: Box<dyn Clock>, registry: SpriteRegistry, settings: &Settings) -> Self {
        let now = clock.now();
        let tuning = settings.tuning.clone();
        let (ledger, summary) = GrowthLedger::load(store.get(GROWTH_KEY).as_ref(), now, tuning.growth.clone());
        let activity = ActivityAccountant::load(store.get(ACTIVITY_KEY).as_ref(), now, tuning.activity.clone());
        let size_level = size_level_from_value(store.get(SIZE_LEVEL_KEY).as_ref());
        let policy = policy_from_value(store.get(MOTION_POLICY_KEY).as_ref());
        let report = DailyReport::from_value(store.get(DAILY_REPORT_KEY).as_ref());
        let viewport = Vec2::new(settings.viewport_width, settings.viewport_height);

        let stage = ledger.stage();
        let roster = {
            let size = size_for_level(size_level);
            let main_inset = registry
                .get(crate::sprite::main_profile_key(stage))
                .map_or(0.0, |profile| inset_px(profile, size));
            let ground = Bounds::new(viewport, size, main_inset, tuning.motion.ground_margin).ground_y;
            let x = (viewport.x - size - MAIN_DEFAULT_MARGIN_X).max(8.0);
            PetRoster::load(store.get(PETS_KEY).as_ref(), || {
                PetInstance::main(stage.face(), Vec2::new(x, ground))
            })
        };

        let rng = match settings.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };

        let mut simulation = Self {
            store,
            clock,
            rng,
            scheduler: Scheduler::new(&tuning.activity),
            tuning,
            ledger,
            activity,
            roster,
            registry,
            motions: HashMap::new(),
            last_frames: HashMap::new(),
            emotion: EmotionState::default(),
            mood: MoodClock::new(0.0),
            policy,
            size_level,
            viewport,
            frame_clock: FrameClock::new(),
            anim_now: 0.0,
            drag: None,
            drag_lock: 0,
            click_through: false,
            panel: None,
            panel_visible: false,
            hover: None,
            capture: None,
            report,
            events: VecDeque::new(),
        };

        simulation.sync_main_glyph();
        simulation.realign(0.0);
        info!(
            offline_minutes = summary.offline_minutes,
            pets = simulation.roster.len(),
            %policy,
            size_level,
            "Simulation loaded"
        );
        if let Err(error) = simulation.flush() {
            warn!(%error, "Could not persist the loaded state");
        }
        simulation
    }

    // ---- Persistence ----

    fn write(&mut self, record: Record) -> Result<(), StoreError> {
        let (key, value) = match record {
            Record::Growth => (GROWTH_KEY, self.ledger.save().to_value()?),
            Record::Activity => (ACTIVITY_KEY, self.activity.snapshot().to_value()?),
            Record::Pets => (PETS_KEY, self.roster.to_value()?),
            Record::SizeLevel => (SIZE_LEVEL_KEY, Value::from(self.size_level)),
            Record::MotionPolicy => (MOTION_POLICY_KEY, Value::from(self.policy.to_string())),
            Record::Report => match &self.report {
                Some(report) => (DAILY_REPORT_KEY, report.to_value()?),
                None => return self.store.remove(DAILY_REPORT_KEY),
            },
        };
        self.store.set(key, value)
    }

    /// Persists one record; failures are logged and the simulation carries on.
    fn persist(&mut self, record: Record) {
        if let Err(error) = self.write(record) {
            warn!(%record, %error, "Failed to persist record");
        }
    }

    /// Writes every record, returning the first failure after attempting all of them.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let mut first_error = None;
        for record in Record::iter() {
            if let Err(error) = self.write(record) {
                warn!(%record, %error, "Failed to persist record");
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Writes today's report and flushes everything. The simulation stays usable afterwards.
    pub fn shutdown(&mut self) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.activity.rollover(now);
        let report = DailyReport::build(self.ledger.save(), self.activity.snapshot(), now);
        info!(day = %report.day_key, "Daily report written");
        self.report = Some(report);
        self.frame_clock.restart();
        self.flush()
    }

    // ---- Fixed-rate clock ----

    /// Feeds elapsed wall-clock time to the fixed-rate scheduler and runs whatever came due.
    pub fn advance_clock(&mut self, elapsed: std::time::Duration) {
        let due = self.scheduler.advance(elapsed);
        for _ in 0..due.heartbeats {
            self.on_heartbeat();
        }
        for _ in 0..due.samples {
            self.on_sample();
        }
        for _ in 0..due.minutes {
            self.on_minute();
        }
    }

    /// One minute of growth decay.
    pub fn on_minute(&mut self) {
        let now = self.clock.now();
        self.ledger.tick(now);
        trace!(stats = ?self.ledger.stats(), "Growth tick");
        self.persist(Record::Growth);
    }

    /// One heartbeat of activity time.
    pub fn on_heartbeat(&mut self) {
        let now = self.clock.now();
        let rolled = self.activity.rollover(now);
        self.activity.heartbeat(now);
        if rolled {
            self.persist(Record::Activity);
        }
    }

    /// Converts the pending activity sample into passive EXP.
    pub fn on_sample(&mut self) {
        let now = self.clock.now();
        let sample = self.activity.take_sample(now);
        if sample.granted > 0 {
            let change = self.ledger.apply_exp_delta(i64::from(sample.granted), now);
            self.events.push_back(SimEvent::ExpGranted {
                source: ExpSource::Passive,
                exp: sample.granted,
            });
            self.note_stage_change(change);
            self.persist(Record::Growth);
        }
        self.persist(Record::Activity);
    }

    /// Counts one input event towards passive activity.
    pub fn record_input(&mut self, kind: InputKind) {
        let now = self.clock.now();
        self.activity.record_input(kind, now);
    }

    // ---- Animation frames ----

    /// Advances every instance by one animation frame, then resolves what each one shows.
    ///
    /// Motion runs for all instances before any frame is resolved, so hit tests made after this
    /// call always see this frame's positions.
    pub fn on_frame(&mut self, now_ms: f64) {
        let dt = self.frame_clock.advance(now_ms);
        self.anim_now = now_ms;
        self.step_all(dt, now_ms);
        self.resolve_all(now_ms);
    }

    /// Forgets the previous frame timestamp, so the next frame advances by zero.
    pub fn restart_frames(&mut self) {
        self.frame_clock.restart();
    }

    fn step_all(&mut self, dt: f32, now: f64) {
        let size = self.pet_size();
        let stage = self.ledger.stage();
        for pet in self.roster.iter_mut() {
            let profile = self.registry.profile_for(pet, stage);
            let inset = profile.map_or(0.0, |profile| inset_px(profile, size));
            let bounds = Bounds::new(self.viewport, size, inset, self.tuning.motion.ground_margin);
            let policy = if pet.is_main() { self.policy } else { MotionPolicy::Passive };

            let motion = ensure_motion(&mut self.motions, &pet.id, now, &self.tuning, &mut self.rng);
            let mut position = pet.position();
            motion::step(motion, &mut position, policy, &bounds, dt, now, &self.tuning.motion, &mut self.rng);
            pet.set_position(position);

            let expression_profile = if pet.is_main() { None } else { profile.map(Arc::as_ref) };
            update_idle_expression(motion, expression_profile, now, &self.tuning.emotion, &mut self.rng);
        }
    }

    fn resolve_all(&mut self, now: f64) {
        let stage = self.ledger.stage();
        for pet in self.roster.iter() {
            let Some(profile) = self.registry.profile_for(pet, stage) else {
                self.last_frames.remove(&pet.id);
                continue;
            };
            let motion = ensure_motion(&mut self.motions, &pet.id, now, &self.tuning, &mut self.rng);
            let runtime = profile.state(motion.state);

            let frame = match motion.expression_frame {
                Some(frame) if motion.state == MotionState::Idle && runtime.frames.contains(&frame) => frame,
                _ if pet.is_main() => {
                    let mode = self.mood.mode(self.ledger.stats(), now, &self.tuning.emotion, &mut self.rng);
                    let last_drawn = self.last_frames.get(&pet.id).copied();
                    self.emotion.resolve(
                        profile,
                        motion.state,
                        mode,
                        last_drawn,
                        now,
                        &self.tuning.emotion,
                        &mut self.rng,
                    )
                }
                _ => {
                    let fps = effective_fps(motion.state, runtime, motion.velocity.x, &self.tuning.emotion);
                    frame_at(runtime, motion.elapsed_in_state(now), fps)
                }
            };
            let frame = if frame < profile.frame_count() { frame } else { 0 };
            self.last_frames.insert(pet.id.clone(), frame);
        }
    }

    // ---- Pointer input ----

    pub fn handle_pointer(&mut self, event: PointerEvent, now_ms: f64) {
        if let Some(kind) = event.input_kind() {
            self.record_input(kind);
        }
        match event {
            PointerEvent::Down(point) => {
                self.pointer_down(point, now_ms);
            }
            PointerEvent::Move(point) => self.pointer_move(point, now_ms),
            PointerEvent::Up(_) => self.pointer_up(now_ms),
            PointerEvent::Cancel => self.pointer_cancel(now_ms),
        }
    }

    /// Starts a drag if `point` lands on an opaque pixel of an instance. Returns whether a drag
    /// started.
    pub fn pointer_down(&mut self, point: Vec2, now_ms: f64) -> bool {
        self.hover = Some(point);
        if self.click_through || self.drag.is_some() {
            return false;
        }
        let Some(pet_id) = self.pet_at(point).map(|pet| pet.id.clone()) else {
            return false;
        };
        if !self.is_opaque_at(&pet_id, point) {
            return false;
        }
        let Some(origin) = self.roster.get(&pet_id).map(PetInstance::position) else {
            return false;
        };

        self.mood.mark_interaction(now_ms);
        self.drag_lock = self.drag_lock.saturating_add(1);
        let motion = ensure_motion(&mut self.motions, &pet_id, now_ms, &self.tuning, &mut self.rng);
        motion.dragging = true;
        motion.transition(MotionState::Drag, now_ms);
        debug!(pet = %pet_id, "Drag started");
        self.drag = Some(DragGesture::begin(pet_id, point, origin, now_ms));
        self.sync_pointer_capture();
        true
    }

    pub fn pointer_move(&mut self, point: Vec2, now_ms: f64) {
        self.hover = Some(point);
        let Some(drag) = self.drag.as_mut() else {
            self.sync_pointer_capture();
            return;
        };
        let target = drag.update(point, now_ms, self.tuning.motion.drag_threshold);
        let pet_id = drag.pet_id().to_string();
        let bounds = self.bounds_for(&pet_id);
        if let (Some(pet), Some(bounds)) = (self.roster.get_mut(&pet_id), bounds) {
            pet.set_position(bounds.clamp(target));
        }
    }

    pub fn pointer_up(&mut self, now_ms: f64) {
        self.release_drag(now_ms);
    }

    /// Releases exactly like [`Simulation::pointer_up`].
    pub fn pointer_cancel(&mut self, now_ms: f64) {
        self.release_drag(now_ms);
    }

    /// The pointer left the playground.
    pub fn pointer_leave(&mut self) {
        self.hover = None;
        self.sync_pointer_capture();
    }

    fn release_drag(&mut self, now: f64) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        self.drag_lock = self.drag_lock.saturating_sub(1);
        let pet_id = drag.pet_id().to_string();
        let is_main = self.roster.get(&pet_id).is_some_and(PetInstance::is_main);
        let release = drag.finish();

        let motion = ensure_motion(&mut self.motions, &pet_id, now, &self.tuning, &mut self.rng);
        motion.dragging = false;
        match release {
            DragRelease::Tap => {
                motion.rest(now);
                self.roster.select(&pet_id);
                if is_main {
                    self.panel_visible = !self.panel_visible;
                    self.events.push_back(SimEvent::PanelToggled);
                }
                self.events.push_back(SimEvent::Tapped { pet_id });
            }
            DragRelease::Throw { velocity } => {
                if is_main && self.policy == MotionPolicy::Fixed {
                    motion.rest(now);
                    motion.next_decision_at = now + self.tuning.motion.fixed_drop_hold_ms;
                } else {
                    motion.velocity = velocity * self.tuning.motion.throw_damping;
                    motion.facing = Facing::from_velocity(motion.velocity.x);
                    let state = if motion.velocity.y < 0.0 {
                        MotionState::Jump
                    } else {
                        MotionState::Fall
                    };
                    motion.transition(state, now);
                    motion.landing_until = None;
                    motion.next_decision_at = now + self.tuning.motion.throw_decision_ms;
                }
                debug!(pet = %pet_id, ?velocity, "Drag finished");
                self.events.push_back(SimEvent::DragFinished { pet_id, velocity });
            }
        }
        self.persist(Record::Pets);
        self.sync_pointer_capture();
    }

    /// Re-evaluates pointer capture against the last known pointer position.
    pub fn pointer_hover(&mut self, point: Vec2) {
        self.hover = Some(point);
        self.sync_pointer_capture();
    }

    fn sync_pointer_capture(&mut self) {
        let capture = if self.click_through {
            false
        } else if self.drag_lock > 0 {
            true
        } else {
            self.hover.is_some_and(|point| self.should_capture_at(point))
        };
        if self.capture != Some(capture) {
            trace!(capture, "Pointer capture changed");
            self.capture = Some(capture);
            self.events.push_back(SimEvent::PointerCapture(capture));
        }
    }

    /// Whether input at `point` belongs to the pet window rather than whatever is beneath it.
    pub fn should_capture_at(&self, point: Vec2) -> bool {
        if self.click_through {
            return false;
        }
        if let Some(pet) = self.pet_at(point) {
            return self.is_opaque_at(&pet.id, point);
        }
        self.panel_visible && self.panel.is_some_and(|panel| panel.contains(point))
    }

    /// The top-most instance whose box contains `point`. Later instances draw on top.
    pub fn pet_at(&self, point: Vec2) -> Option<&PetInstance> {
        let size = self.pet_size();
        self.roster
            .iter()
            .rev()
            .find(|pet| Region::square(pet.position(), size).contains(point))
    }

    /// Whether `point` hits an opaque pixel of the frame last drawn for `pet_id`.
    ///
    /// Placeholders count as fully opaque within their box.
    pub fn is_opaque_at(&self, pet_id: &str, point: Vec2) -> bool {
        let Some(pet) = self.roster.get(pet_id) else {
            return false;
        };
        let facing = self.motions.get(pet_id).map_or(Facing::Right, |motion| motion.facing);
        let Some(uv) = Region::square(pet.position(), self.pet_size()).sprite_uv(point, facing) else {
            return false;
        };
        let Some(profile) = self.registry.profile_for(pet, self.ledger.stage()) else {
            return true;
        };
        let frame = self.last_frames.get(pet_id).copied().unwrap_or(0);
        profile.is_opaque_at(frame, uv.x, uv.y)
    }

    // ---- Commands ----

    pub fn apply_action(&mut self, action: Action) -> ActionOutcome {
        let now = self.clock.now();
        self.mood.mark_interaction(self.anim_now);
        let outcome = self.ledger.apply_action(action, now);
        match outcome {
            ActionOutcome::Applied {
                exp_gained,
                stage_change,
            } => {
                self.events.push_back(SimEvent::ExpGranted {
                    source: ExpSource::Action(action),
                    exp: exp_gained,
                });
                self.note_stage_change(stage_change);
                self.persist(Record::Growth);
            }
            ActionOutcome::Ineffective => self.events.push_back(SimEvent::ActionIneffective(action)),
        }
        outcome
    }

    /// The manual activity check-in.
    pub fn manual_checkin(&mut self) -> ManualGrant {
        let now = self.clock.now();
        self.mood.mark_interaction(self.anim_now);
        let grant = self.activity.grant_manual(now);
        match grant {
            ManualGrant::Granted { exp } => {
                let change = self.ledger.apply_exp_delta(i64::from(exp), now);
                self.events.push_back(SimEvent::ExpGranted {
                    source: ExpSource::Manual,
                    exp,
                });
                self.note_stage_change(change);
                self.persist(Record::Growth);
            }
            ManualGrant::CapReached => {
                debug!("Manual check-in refused, daily cap reached");
                self.events.push_back(SimEvent::CheckinDenied(CheckinDenial::CapReached));
            }
            ManualGrant::Cooldown { remaining } => {
                debug!(remaining_secs = remaining.whole_seconds(), "Manual check-in refused, cooling down");
                self.events.push_back(SimEvent::CheckinDenied(CheckinDenial::Cooldown(remaining)));
            }
        }
        self.persist(Record::Activity);
        grant
    }

    pub fn set_activity_enabled(&mut self, enabled: bool) {
        let now = self.clock.now();
        self.activity.set_enabled(enabled, now);
        self.persist(Record::Activity);
    }

    /// Changes how the main pet moves on its own.
    pub fn set_motion_policy(&mut self, policy: MotionPolicy) {
        if self.policy == policy {
            return;
        }
        info!(from = %self.policy, to = %policy, "Main motion policy changed");
        self.policy = policy;
        self.persist(Record::MotionPolicy);
    }

    /// Resizes every instance, keeping each one's bottom-centre where it was.
    pub fn set_size_level(&mut self, level: u8) {
        let level = level.clamp(SIZE_LEVEL_MIN, SIZE_LEVEL_MAX);
        if level == self.size_level {
            return;
        }

        let old_size = self.pet_size();
        self.size_level = level;
        let new_size = self.pet_size();
        if old_size != new_size {
            let stage = self.ledger.stage();
            for pet in self.roster.iter_mut() {
                let profile = self.registry.profile_for(pet, stage);
                let old_inset = profile.map_or(0.0, |profile| inset_px(profile, old_size));
                let new_inset = profile.map_or(0.0, |profile| inset_px(profile, new_size));
                let anchor = Vec2::new(pet.x + old_size / 2.0, pet.y + old_size - old_inset);
                let bounds = Bounds::new(self.viewport, new_size, new_inset, self.tuning.motion.ground_margin);
                pet.set_position(bounds.clamp(Vec2::new(
                    anchor.x - new_size / 2.0,
                    anchor.y - (new_size - new_inset),
                )));
            }
        }

        info!(level, size = new_size, "Character size changed");
        self.realign(self.anim_now);
        self.persist(Record::SizeLevel);
        self.persist(Record::Pets);
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        let viewport = Vec2::new(width, height).max(Vec2::ONE);
        if viewport == self.viewport {
            return;
        }
        debug!(width = viewport.x, height = viewport.y, "Viewport resized");
        self.viewport = viewport;
        self.realign(self.anim_now);
        self.persist(Record::Pets);
    }

    /// Clamps every instance into the viewport and puts grounded ones back on the ground line.
    fn realign(&mut self, now: f64) {
        let size = self.pet_size();
        let stage = self.ledger.stage();
        for pet in self.roster.iter_mut() {
            let profile = self.registry.profile_for(pet, stage);
            let inset = profile.map_or(0.0, |profile| inset_px(profile, size));
            let bounds = Bounds::new(self.viewport, size, inset, self.tuning.motion.ground_margin);
            let motion = ensure_motion(&mut self.motions, &pet.id, now, &self.tuning, &mut self.rng);
            let mut position = bounds.clamp(pet.position());

            if !motion.dragging {
                if !motion.state.is_airborne() {
                    position.y = bounds.ground_y;
                    motion.velocity.y = 0.0;
                } else if position.y >= bounds.ground_y {
                    position.y = bounds.ground_y;
                    motion.velocity.y = 0.0;
                    motion.landing_until = None;
                    motion.transition(MotionState::Idle, now);
                }

                if pet.is_main() {
                    motion.next_decision_at = motion.next_decision_at.min(now + REALIGN_DECISION_MS);
                    if self.policy == MotionPolicy::Fixed {
                        position.y = bounds.ground_y;
                        motion.rest(now);
                    }
                }
                let expression_profile = if pet.is_main() { None } else { profile.map(Arc::as_ref) };
                update_idle_expression(motion, expression_profile, now, &self.tuning.emotion, &mut self.rng);
            }
            pet.set_position(position);
        }
    }

    /// Adds a buddy and returns its id, or `None` when the roster is full.
    pub fn add_buddy(&mut self) -> Option<String> {
        let stamp = (self.clock.now().unix_timestamp_nanos() / 1_000_000) as i64;
        let size = self.pet_size();
        let stage = self.ledger.stage();
        let (viewport, margin) = (self.viewport, self.tuning.motion.ground_margin);
        let registry = &self.registry;
        let id = match self.roster.add_buddy(stamp) {
            Ok(buddy) => {
                let inset = registry
                    .profile_for(buddy, stage)
                    .map_or(0.0, |profile| inset_px(profile, size));
                let bounds = Bounds::new(viewport, size, inset, margin);
                buddy.set_position(bounds.clamp(buddy.position()));
                buddy.id.clone()
            }
            Err(_) => {
                info!("Buddy limit reached");
                self.events.push_back(SimEvent::BuddyLimitReached);
                return None;
            }
        };
        info!(pet = %id, "Buddy added");
        self.events.push_back(SimEvent::BuddyAdded { pet_id: id.clone() });
        self.persist(Record::Pets);
        Some(id)
    }

    /// Removes the selected buddy, or the newest one. Returns the removed id.
    pub fn remove_buddy(&mut self) -> Option<String> {
        let removed = self.roster.remove_buddy()?;
        self.motions.remove(&removed.id);
        self.last_frames.remove(&removed.id);
        if self.drag.as_ref().is_some_and(|drag| drag.pet_id() == removed.id) {
            self.drag = None;
            self.drag_lock = self.drag_lock.saturating_sub(1);
            self.sync_pointer_capture();
        }
        info!(pet = %removed.id, "Buddy removed");
        self.events.push_back(SimEvent::BuddyRemoved {
            pet_id: removed.id.clone(),
        });
        self.persist(Record::Pets);
        Some(removed.id)
    }

    pub fn select(&mut self, pet_id: &str) -> bool {
        self.roster.select(pet_id)
    }

    pub fn set_click_through(&mut self, enabled: bool) {
        self.click_through = enabled;
        self.sync_pointer_capture();
    }

    pub fn set_panel_region(&mut self, region: Option<Region>) {
        self.panel = region;
        self.sync_pointer_capture();
    }

    pub fn set_panel_visible(&mut self, visible: bool) {
        self.panel_visible = visible;
        self.sync_pointer_capture();
    }

    /// Starts over with a fresh egg.
    pub fn reset_growth(&mut self) {
        let now = self.clock.now();
        let change = self.ledger.reset(now);
        self.emotion = EmotionState::default();
        self.note_stage_change(change);
        self.persist(Record::Growth);
    }

    /// Takes back every point of EXP the activity channels granted.
    pub fn reset_activity_contribution(&mut self) {
        let now = self.clock.now();
        let delta = self.activity.reset_contribution(now);
        if delta != 0 {
            let change = self.ledger.apply_exp_delta(delta, now);
            self.events.push_back(SimEvent::ExpWithdrawn {
                exp: delta.unsigned_abs().min(u64::from(u32::MAX)) as u32,
            });
            self.note_stage_change(change);
            self.persist(Record::Growth);
        }
        self.persist(Record::Activity);
    }

    /// Returns the pending report's text and marks it viewed.
    pub fn open_report(&mut self) -> Option<String> {
        let report = self.report.as_mut().filter(|report| !report.viewed)?;
        report.viewed = true;
        let summary = report.summary.clone();
        self.persist(Record::Report);
        Some(summary)
    }

    fn note_stage_change(&mut self, change: Option<StageChange>) {
        let Some(change) = change else {
            return;
        };
        match change.to.transition_message().filter(|_| change.is_growth()) {
            Some(message) => info!(from = %change.from, to = %change.to, "Stage changed: {message}"),
            None => info!(from = %change.from, to = %change.to, "Stage changed"),
        }
        self.sync_main_glyph();
        self.events.push_back(change.into());
        self.persist(Record::Pets);
    }

    fn sync_main_glyph(&mut self) {
        let face = self.ledger.stage().face();
        if let Some(main) = self.roster.main_mut() {
            if main.emoji != face {
                main.emoji = face.to_string();
            }
        }
    }

    fn bounds_for(&self, pet_id: &str) -> Option<Bounds> {
        let pet = self.roster.get(pet_id)?;
        let size = self.pet_size();
        let inset = self
            .registry
            .profile_for(pet, self.ledger.stage())
            .map_or(0.0, |profile| inset_px(profile, size));
        Some(Bounds::new(self.viewport, size, inset, self.tuning.motion.ground_margin))
    }

    // ---- Queries ----

    pub fn drain_events(&mut self) -> impl Iterator<Item = SimEvent> + '_ {
        self.events.drain(..)
    }

    pub fn ledger(&self) -> &GrowthLedger {
        &self.ledger
    }

    pub fn activity(&self) -> &ActivityAccountant {
        &self.activity
    }

    pub fn pets(&self) -> &PetRoster {
        &self.roster
    }

    pub fn registry(&self) -> &SpriteRegistry {
        &self.registry
    }

    pub fn motion(&self, pet_id: &str) -> Option<&Motion> {
        self.motions.get(pet_id)
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn stage(&self) -> Stage {
        self.ledger.stage()
    }

    pub fn policy(&self) -> MotionPolicy {
        self.policy
    }

    pub fn size_level(&self) -> u8 {
        self.size_level
    }

    /// Rendered edge length of every instance.
    pub fn pet_size(&self) -> f32 {
        size_for_level(self.size_level)
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_capture(&self) -> Option<bool> {
        self.capture
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    /// The unviewed daily report, if any.
    pub fn pending_report(&self) -> Option<&DailyReport> {
        self.report.as_ref().filter(|report| !report.viewed)
    }

    /// How `pet_id` should be drawn, based on the most recent frame.
    pub fn visual(&self, pet_id: &str) -> Option<Visual> {
        let pet = self.roster.get(pet_id)?;
        let motion = self.motions.get(pet_id);
        let appearance = match self.registry.profile_for(pet, self.ledger.stage()) {
            Some(profile) => Appearance::Sprite {
                profile: Arc::clone(profile),
                frame: self.last_frames.get(pet_id).copied().unwrap_or(0),
            },
            None => Appearance::Placeholder {
                glyph: pet.emoji.clone(),
            },
        };
        Some(Visual {
            position: pet.position(),
            size: self.pet_size(),
            facing: motion.map_or(Facing::Right, |motion| motion.facing),
            state: motion.map_or(MotionState::Idle, |motion| motion.state),
            appearance,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }
}

/// The motion record of `id`, created with fresh defaults on first use.
fn ensure_motion<'a>(
    motions: &'a mut HashMap<String, Motion>,
    id: &str,
    now: f64,
    tuning: &Tuning,
    rng: &mut SmallRng,
) -> &'a mut Motion {
    motions
        .entry(id.to_string())
        .or_insert_with(|| Motion::new(now, &tuning.motion, &tuning.emotion, rng))
}

/// Ground inset of `profile` in pixels at rendered `size`.
fn inset_px(profile: &SpriteProfile, size: f32) -> f32 {
    (size * profile.ground_inset_ratio()).round()
}

/// Reads the persisted main motion policy; anything unrecognized means roaming.
fn policy_from_value(raw: Option<&Value>) -> MotionPolicy {
    raw.and_then(Value::as_str)
        .and_then(|text| text.parse().ok())
        .unwrap_or_default()
}
