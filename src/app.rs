use std::path::PathBuf;
use std::time::{Duration, Instant};

use directories::ProjectDirs;
use tracing::{debug, info, trace, warn};

use crate::asset::load_descriptor;
use crate::clock::SystemClock;
use crate::config::Settings;
use crate::error::{ConfigError, PetResult};
use crate::events::SimEvent;
use crate::formatter;
use crate::simulation::Simulation;
use crate::sprite::SpriteRegistry;
use crate::store::JsonFileStore;

/// Headless host: drives a [`Simulation`] on the system clock at a fixed frame rate.
pub struct App {
    pub simulation: Simulation<JsonFileStore>,
    loop_time: Duration,
    run_for: Option<Duration>,
    started: Instant,
    last_tick: Instant,
}

impl App {
    /// Opens the record store, loads the main sprite profile and restores the simulation.
    ///
    /// # Errors
    ///
    /// Returns an error when no data directory can be determined or the store cannot be opened.
    /// A missing or broken sprite descriptor is not an error; placeholders are drawn instead.
    pub fn new(settings: &Settings) -> PetResult<Self> {
        let data_dir = match &settings.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        let store = JsonFileStore::open(data_dir)?;

        let mut registry = SpriteRegistry::new();
        if let Some(path) = &settings.sprite_descriptor {
            match load_descriptor(path) {
                Ok((descriptor, source)) => {
                    registry.load_main(&descriptor, &source);
                }
                Err(error) => warn!(%error, "Sprite descriptor unavailable, drawing placeholders"),
            }
        }

        let simulation = Simulation::load(store, Box::new(SystemClock), registry, settings);
        let now = Instant::now();
        Ok(Self {
            simulation,
            loop_time: Duration::from_secs(1) / settings.frame_rate.max(1),
            run_for: settings.run_seconds.map(Duration::from_secs),
            started: now,
            last_tick: now,
        })
    }

    /// Runs one frame and sleeps off whatever remains of the frame budget.
    ///
    /// Returns `false` once the configured run time has elapsed.
    pub fn run(&mut self) -> bool {
        let start = Instant::now();
        let elapsed = start.duration_since(self.last_tick);
        self.last_tick = start;

        formatter::increment_frame();

        self.simulation.advance_clock(elapsed);
        let anim_ms = start.duration_since(self.started).as_secs_f64() * 1000.0;
        self.simulation.on_frame(anim_ms);
        for event in self.simulation.drain_events() {
            log_event(&event);
        }

        if self.run_for.is_some_and(|limit| start.duration_since(self.started) >= limit) {
            info!("Configured run time elapsed");
            return false;
        }

        let spent = start.elapsed();
        if spent < self.loop_time {
            spin_sleep::sleep(self.loop_time - spent);
        } else {
            trace!(behind = ?(spent - self.loop_time), "Frame over budget");
        }
        true
    }

    /// Writes the daily report and flushes every record.
    pub fn shutdown(&mut self) -> PetResult<()> {
        self.simulation.shutdown()?;
        if let Some(report) = self.simulation.pending_report() {
            info!(day = %report.day_key, "{}", report.summary);
        }
        Ok(())
    }
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("", "", "desktop-pet")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}

fn log_event(event: &SimEvent) {
    match event {
        SimEvent::StageChanged { .. } | SimEvent::BuddyAdded { .. } | SimEvent::BuddyRemoved { .. } => {
            info!(?event, "Simulation event")
        }
        _ => debug!(?event, "Simulation event"),
    }
}
