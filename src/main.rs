#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use desktop_pet::app::App;
use desktop_pet::config::load_settings;
use desktop_pet::formatter::FrameFormatter;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Runs the pet headless until the configured run time elapses.
///
/// An optional first argument names a JSON settings file; `DESKTOP_PET_*` environment variables
/// override it.
pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().event_format(FrameFormatter))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(ErrorLayer::default())
        .try_init()
        .context("Could not install the tracing subscriber")?;

    let settings_file = env::args().nth(1).map(PathBuf::from);
    let settings = load_settings(settings_file.as_deref());
    let mut app = App::new(&settings).context("Could not start the pet")?;

    info!(frame_rate = settings.frame_rate, run_seconds = ?settings.run_seconds, "Starting pet loop");
    while app.run() {}

    app.shutdown().context("Could not persist state on shutdown")?;
    info!("Shut down cleanly");
    Ok(())
}
