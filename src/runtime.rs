use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::optimize::FrameworkTag;
use crate::params::{ModelParams, TensorData};
use crate::transform::TransformPipeline;
use crate::OptimizerError;

/// Executes the original, pre-optimization graph and resolves the tensor
/// names declared in the serialized model. Supplied by the graph toolkit.
pub trait GraphRuntime {
    fn input_names(&self, model: &Path) -> Result<Vec<String>, OptimizerError>;
    fn output_names(&self, model: &Path) -> Result<Vec<String>, OptimizerError>;
    fn run(&self, model: &Path, inputs: &[TensorData]) -> Result<Vec<TensorData>, OptimizerError>;
}

/// Executes a compiled engine. Supplied by the compiler backend.
pub trait EngineRuntime {
    fn infer(&self, inputs: &[TensorData]) -> Result<Vec<TensorData>, OptimizerError>;
}

/// Runnable wrapper bound to one compiled engine. Keeps the engine alive
/// for as long as it is referenced and applies the configured input
/// transforms on every call.
pub struct Learner {
    runtime: Box<dyn EngineRuntime>,
    engine: Bytes,
    engine_path: PathBuf,
    params: ModelParams,
    input_names: Vec<String>,
    output_names: Vec<String>,
    transforms: TransformPipeline,
    framework: FrameworkTag,
}

impl Learner {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        runtime: Box<dyn EngineRuntime>,
        engine: Bytes,
        engine_path: PathBuf,
        params: ModelParams,
        input_names: Vec<String>,
        output_names: Vec<String>,
        transforms: TransformPipeline,
        framework: FrameworkTag,
    ) -> Learner {
        Learner {
            runtime,
            engine,
            engine_path,
            params,
            input_names,
            output_names,
            transforms,
            framework,
        }
    }

    pub fn infer(&self, inputs: Vec<TensorData>) -> Result<Vec<TensorData>, OptimizerError> {
        let inputs = self.transforms.apply(inputs);
        self.runtime.infer(&inputs)
    }

    /// Zero-filled input tuple at the model's declared shapes.
    pub fn inputs_example(&self) -> Result<Vec<TensorData>, OptimizerError> {
        self.params.synthetic_inputs()
    }

    pub fn engine_path(&self) -> &Path {
        &self.engine_path
    }

    pub fn engine_size(&self) -> usize {
        self.engine.len()
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn framework(&self) -> FrameworkTag {
        self.framework
    }
}
