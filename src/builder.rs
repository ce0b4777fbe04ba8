use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use log::{debug, info};
use semver::Version;

use crate::profile::ShapeProfile;
use crate::quantize::{Calibrator, PrecisionFlags};
use crate::runtime::EngineRuntime;
use crate::OptimizerError;

/// Result of probing a compiler backend on the current host.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendStatus {
    /// Toolkit installed and a compatible accelerator device is present.
    Available { version: Version },
    /// Toolkit installed but no usable accelerator device was found.
    DeviceMissing(String),
    /// No toolkit installation was found.
    NotInstalled(String),
}

/// Outcome of importing a serialized graph into the network definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed,
    /// Every diagnostic the parser reported, verbatim.
    Failed(Vec<String>),
}

/// Everything the backend needs before parsing the graph: memory budget,
/// precision flags and the optional calibration feed.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderOptions {
    pub workspace_bytes: u64,
    pub flags: PrecisionFlags,
    pub calibrator: Option<Calibrator>,
    /// Per-tensor (min, max) activation ranges for data-free low precision.
    pub dynamic_ranges: Option<HashMap<String, (f32, f32)>>,
}

/// One in-flight engine build. Implementations wrap the vendor's
/// builder/network/config object graph; the network definition uses the
/// explicit-batch convention, so the graph itself carries the batch size.
pub trait BuildSession {
    fn configure(&mut self, options: &BuilderOptions) -> Result<(), OptimizerError>;
    fn parse_graph(&mut self, model: &Path) -> ParseOutcome;
    fn attach_profile(&mut self, profile: &ShapeProfile) -> Result<(), OptimizerError>;
    fn build(&mut self) -> Result<Bytes, OptimizerError>;
}

/// A native model-compiler toolkit, abstracted so the pipeline never depends
/// on vendor types.
pub trait CompilerBackend {
    /// Short identifier used for engine filenames and logs.
    fn family(&self) -> &str;
    fn probe(&self) -> BackendStatus;
    fn begin_build(&self) -> Result<Box<dyn BuildSession>, OptimizerError>;
    fn load_runtime(&self, engine: Bytes) -> Result<Box<dyn EngineRuntime>, OptimizerError>;
}

/// Pure capability query: whether `backend` can build engines on this host
/// with a supported toolkit version.
pub fn backend_available(backend: &dyn CompilerBackend) -> bool {
    match backend.probe() {
        BackendStatus::Available { version } => crate::config::version_supported(&version),
        _ => false,
    }
}

/// Drives one build from network definition to serialized engine on disk.
pub struct EngineBuilder<'a> {
    backend: &'a dyn CompilerBackend,
}

impl<'a> EngineBuilder<'a> {
    pub fn new(backend: &'a dyn CompilerBackend) -> EngineBuilder<'a> {
        EngineBuilder { backend }
    }

    /// Init, configure, parse, profile, build, persist. Each backend call is
    /// attempted exactly once; nothing is written to `engine_path` unless
    /// the build succeeds, and a prior engine at that path is overwritten.
    pub fn build_and_save(
        &self,
        model_path: &Path,
        engine_path: &Path,
        options: &BuilderOptions,
        profile: Option<&ShapeProfile>,
    ) -> Result<Bytes, OptimizerError> {
        let mut session = self.backend.begin_build()?;
        session.configure(options)?;
        match session.parse_graph(model_path) {
            ParseOutcome::Parsed => {}
            ParseOutcome::Failed(diagnostics) => {
                for diagnostic in &diagnostics {
                    debug!("graph parser: {}", diagnostic);
                }
                return Err(OptimizerError::GraphImport {
                    path: model_path.to_path_buf(),
                    diagnostics,
                });
            }
        }
        if let Some(profile) = profile {
            session.attach_profile(profile)?;
        }
        let engine = session.build()?;
        std::fs::write(engine_path, &engine)?;
        info!("engine serialized to {}", engine_path.display());
        Ok(engine)
    }
}
