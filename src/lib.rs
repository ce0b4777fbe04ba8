use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;
use uuid::Uuid;

mod builder;
mod config;
mod data;
mod optimize;
mod params;
mod profile;
mod quantize;
mod runtime;
mod transform;

pub use crate::builder::{
    backend_available, BackendStatus, BuildSession, BuilderOptions, CompilerBackend,
    EngineBuilder, ParseOutcome,
};
pub use crate::config::{engine_file_name, Settings};
pub use crate::data::{SampleRecord, SampleStore};
pub use crate::optimize::{FrameworkTag, MetricFn, OptimizeRequest, QuantizationMode};
pub use crate::params::{DynamicAxes, InputInfo, ModelParams, TensorData};
pub use crate::profile::{ProfileEntry, ShapeProfile};
pub use crate::quantize::{
    check_mode, precision_flags, relative_divergence, resolve_calibration, validate_engine,
    Calibrator, DivergenceMetric, GateReport, PrecisionFlags,
};
pub use crate::runtime::{EngineRuntime, GraphRuntime, Learner};
pub use crate::transform::{InputTransform, Normalize, Standardize, TransformPipeline};

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("IO Error: {0}")]
    Io(io::Error),
    #[error("Error parsing line: '{0}', error at line index: {1}")]
    ConfigParse(String, usize),
    #[error("{0}")]
    ConfigEnvVar(std::env::VarError),
    #[error("no compatible accelerator device is present: {0}")]
    NoDevice(String),
    #[error("compiler backend is not installed: {0}")]
    BackendMissing(String),
    #[error("compiler backend version {0} is not supported")]
    UnsupportedBackendVersion(String),
    #[error("invalid optimization configuration: {0}")]
    InvalidConfiguration(String),
    #[error("errors occurred while importing the model graph at {path:?}")]
    GraphImport { path: PathBuf, diagnostics: Vec<String> },
    #[error("engine build failed: {0}")]
    Build(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

impl OptimizerError {
    pub fn io_error(kind: io::ErrorKind, msg: &str) -> OptimizerError {
        OptimizerError::Io(io::Error::new(kind, msg.to_string()))
    }
}

impl From<dotenv::Error> for OptimizerError {
    fn from(e: dotenv::Error) -> Self {
        match e {
            dotenv::Error::Io(e) => OptimizerError::Io(e),
            dotenv::Error::LineParse(line, error_idx) => {
                OptimizerError::ConfigParse(line, error_idx)
            }
            dotenv::Error::EnvVar(e) => OptimizerError::ConfigEnvVar(e),
            _ => unreachable!(),
        }
    }
}

impl From<io::Error> for OptimizerError {
    fn from(e: io::Error) -> Self {
        OptimizerError::Io(e)
    }
}

/// Why an optimize call produced no learner without failing.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclineReason {
    /// Data-free low precision cannot be validated against a threshold on
    /// this engine family; the build is skipped entirely.
    UnsupportedModeCombination,
    /// The engine was built but its measured divergence exceeds the caller's
    /// threshold. The engine file stays on disk.
    AccuracyRejected { measured: f32, threshold: f32 },
}

/// Result of an optimize call: a runnable learner, or an explicit decline
/// callers may treat as "try another optimization strategy".
pub enum OptimizeOutcome {
    Produced(Learner),
    Declined(DeclineReason),
}

impl OptimizeOutcome {
    pub fn into_learner(self) -> Option<Learner> {
        match self {
            OptimizeOutcome::Produced(learner) => Some(learner),
            OptimizeOutcome::Declined(_) => None,
        }
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, OptimizeOutcome::Declined(_))
    }
}

/// Compiles serialized model graphs into validated, hardware-specific
/// inference engines through a pluggable compiler backend.
pub struct EngineOptimizer {
    backend: Box<dyn CompilerBackend>,
    graphs: Box<dyn GraphRuntime>,
    settings: Settings,
}

impl EngineOptimizer {
    pub fn new(
        backend: Box<dyn CompilerBackend>,
        graphs: Box<dyn GraphRuntime>,
    ) -> Result<EngineOptimizer, OptimizerError> {
        let settings = Settings::load()?;
        Ok(EngineOptimizer { backend, graphs, settings })
    }

    pub fn with_settings(
        backend: Box<dyn CompilerBackend>,
        graphs: Box<dyn GraphRuntime>,
        settings: Settings,
    ) -> EngineOptimizer {
        EngineOptimizer { backend, graphs, settings }
    }

    /// Whether the backend can build engines on this host. Callers should
    /// consult this before routing models to a hardware-specific path.
    pub fn available(&self) -> bool {
        backend_available(self.backend.as_ref())
    }

    /// Compile the model at `request.model_path` into an engine next to it,
    /// quantize per the requested mode, and validate the result against the
    /// original graph when a threshold is set.
    pub fn optimize(&self, request: OptimizeRequest) -> Result<OptimizeOutcome, OptimizerError> {
        let request_id = Uuid::new_v4();
        info!(
            "[{}] optimizing {} for {} with {} quantization",
            request_id.to_hyphenated(),
            request.model_path.display(),
            request.framework.as_str(),
            request.quantization.as_str()
        );

        match self.backend.probe() {
            BackendStatus::Available { version } => {
                if !config::version_supported(&version) {
                    return Err(OptimizerError::UnsupportedBackendVersion(version.to_string()));
                }
            }
            BackendStatus::DeviceMissing(reason) => return Err(OptimizerError::NoDevice(reason)),
            BackendStatus::NotInstalled(reason) => {
                return Err(OptimizerError::BackendMissing(reason))
            }
        }

        check_mode(request.quantization, request.accuracy_threshold)?;

        // The builder cannot threshold-validate data-free low precision on
        // this engine family; skip the build rather than fail.
        if request.quantization == QuantizationMode::DynamicDataFree
            && request.accuracy_threshold.is_some()
        {
            info!(
                "[{}] declined: data-free quantization cannot be threshold-validated",
                request_id.to_hyphenated()
            );
            return Ok(OptimizeOutcome::Declined(DeclineReason::UnsupportedModeCombination));
        }

        let engine_dir = request.model_path.parent().unwrap_or_else(|| Path::new("."));
        let engine_path = engine_dir.join(engine_file_name(self.backend.family()));

        let calibrator = resolve_calibration(
            request.quantization,
            request.reference_data.as_ref(),
            &request.params,
            self.settings.calibration_samples,
        )?;

        let input_names = self.graphs.input_names(&request.model_path)?;
        let output_names = self.graphs.output_names(&request.model_path)?;
        let profile = ShapeProfile::from_model(&request.params, &input_names);

        let options = BuilderOptions {
            workspace_bytes: self.settings.workspace_bytes,
            flags: precision_flags(request.quantization),
            calibrator,
            dynamic_ranges: request.dynamic_ranges.clone(),
        };
        let engine = EngineBuilder::new(self.backend.as_ref()).build_and_save(
            &request.model_path,
            &engine_path,
            &options,
            profile.as_ref(),
        )?;

        let runtime = self.backend.load_runtime(engine.clone())?;
        let learner = Learner::new(
            runtime,
            engine,
            engine_path,
            request.params.clone(),
            input_names,
            output_names,
            request.transforms,
            request.framework,
        );

        if request.quantization != QuantizationMode::None {
            if let Some(threshold) = request.accuracy_threshold {
                let (inputs, labels) = match request.reference_data.as_ref() {
                    Some(store) if !store.is_empty() => {
                        store.sample_pairs(self.settings.validation_samples, true)
                    }
                    _ => (vec![learner.inputs_example()?], vec![None]),
                };
                let mut references = Vec::with_capacity(inputs.len());
                for tuple in &inputs {
                    references.push(self.graphs.run(&request.model_path, tuple)?);
                }
                let default_metric: &DivergenceMetric = &relative_divergence;
                let metric = request.metric.as_deref().unwrap_or(default_metric);
                let report =
                    validate_engine(&learner, &inputs, &references, &labels, threshold, metric)?;
                if !report.passed() {
                    warn!(
                        "[{}] engine rejected by the accuracy gate",
                        request_id.to_hyphenated()
                    );
                    return Ok(OptimizeOutcome::Declined(DeclineReason::AccuracyRejected {
                        measured: report.worst,
                        threshold,
                    }));
                }
            }
        }

        Ok(OptimizeOutcome::Produced(learner))
    }
}
