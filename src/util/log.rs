use std::{path::PathBuf, sync::Mutex};

use color_eyre::eyre::eyre;
use directories::ProjectDirs;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "MELODECK_LOG";
const LOG_FILE: &str = "melodeck.log";

pub fn data_dir() -> color_eyre::Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "melodeck", "melodeck")
        .ok_or_else(|| eyre!("failed to resolve data directory"))?;
    Ok(dirs.data_local_dir().to_path_buf())
}

/// Logs go to a file under the data directory; stdout belongs to the player.
pub fn initialize_logging() -> color_eyre::Result<()> {
    let directory = data_dir()?;
    std::fs::create_dir_all(&directory)?;
    let log_file = std::fs::File::create(directory.join(LOG_FILE))?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", env!("CARGO_CRATE_NAME"))));

    let file_subscriber = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(Mutex::new(log_file))
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}
