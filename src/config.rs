use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use lazy_static::lazy_static;
use semver::{Version, VersionReq};
use serde::Deserialize;

use crate::OptimizerError;

static WORKSPACE_BYTES_ENV: &str = "ENGINEFORGE_WORKSPACE_BYTES";
static CALIBRATION_SAMPLES_ENV: &str = "ENGINEFORGE_CALIBRATION_SAMPLES";
static VALIDATION_SAMPLES_ENV: &str = "ENGINEFORGE_VALIDATION_SAMPLES";
static MAX_STORE_LEN_ENV: &str = "ENGINEFORGE_MAX_STORE_LEN";

static DEFAULT_ENGINE_FILENAME: &str = "model.engine";

lazy_static! {
    /// Canonical engine filename per backend family. Engines are persisted
    /// next to the source model under this name; unknown families fall back
    /// to a generic one.
    pub static ref ENGINE_FILENAMES: HashMap<&'static str, &'static str> = {
        let mut filenames = HashMap::new();
        filenames.insert("nvidia", "nvidia_model.engine");
        filenames.insert("npu", "npu_model.engine");
        filenames
    };

    /// Toolkit versions the pipeline knows how to drive.
    static ref SUPPORTED_BACKEND_VERSIONS: VersionReq = VersionReq::parse(">=7.0.0").unwrap();
}

pub fn engine_file_name(family: &str) -> &'static str {
    ENGINE_FILENAMES.get(family).copied().unwrap_or(DEFAULT_ENGINE_FILENAME)
}

pub fn version_supported(version: &Version) -> bool {
    SUPPORTED_BACKEND_VERSIONS.matches(version)
}

/// Pipeline knobs. Defaults are embedded in the crate; a
/// `~/.engineforge/config` env file and `ENGINEFORGE_*` variables override
/// them per process.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Workspace memory budget handed to the builder, in bytes.
    pub workspace_bytes: u64,
    /// Calibration batches drawn from a caller-supplied store.
    pub calibration_samples: usize,
    /// Evaluation samples drawn by the accuracy gate.
    pub validation_samples: usize,
    /// Materialization cap for stores built from streaming sources.
    pub max_store_len: usize,
}

fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir()
        .map(|home| {
            let mut path = PathBuf::from(home);
            path.push(".engineforge/config");
            path
        })
        .filter(|p| p.exists())
}

fn load_config_file() -> Result<(), OptimizerError> {
    if let Some(path) = config_file_path() {
        dotenv::from_path(path)?;
        Ok(())
    } else {
        Err(OptimizerError::io_error(io::ErrorKind::NotFound, "config file not found"))
    }
}

fn env_override<T: std::str::FromStr>(name: &str, value: &mut T) -> Result<(), OptimizerError> {
    if let Ok(raw) = std::env::var(name) {
        *value = raw.parse().map_err(|_| {
            OptimizerError::InvalidConfiguration(format!("{} has an invalid value: {}", name, raw))
        })?;
    }
    Ok(())
}

impl Settings {
    /// Built-in defaults shipped with the crate.
    pub fn defaults() -> Settings {
        serde_yaml::from_str(include_str!("../configs/defaults.yml")).unwrap()
    }

    /// Defaults, then the optional config file, then process env vars.
    pub fn load() -> Result<Settings, OptimizerError> {
        // Read ~/.engineforge/config into the environment first, so its
        // entries are visible through the same ENGINEFORGE_* variables.
        match load_config_file() {
            Ok(_) => {}
            Err(OptimizerError::Io(_)) => {
                // the config file is optional
            }
            Err(e) => return Err(e),
        }
        let mut settings = Settings::defaults();
        env_override(WORKSPACE_BYTES_ENV, &mut settings.workspace_bytes)?;
        env_override(CALIBRATION_SAMPLES_ENV, &mut settings.calibration_samples)?;
        env_override(VALIDATION_SAMPLES_ENV, &mut settings.validation_samples)?;
        env_override(MAX_STORE_LEN_ENV, &mut settings.max_store_len)?;
        Ok(settings)
    }
}
