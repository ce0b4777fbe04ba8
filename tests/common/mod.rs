use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use semver::Version;

use engineforge::{
    BackendStatus, BuildSession, BuilderOptions, CompilerBackend, EngineRuntime, GraphRuntime,
    InputInfo, ModelParams, OptimizerError, ParseOutcome, ShapeProfile, TensorData,
};

/// Calls observed by the stubs across one optimize call.
#[derive(Default)]
pub struct Recorded {
    pub builds_started: usize,
    pub builds_finished: usize,
    pub options: Vec<BuilderOptions>,
    pub profiles: Vec<ShapeProfile>,
    pub reference_runs: usize,
}

fn full_output_shapes(params: &ModelParams) -> Vec<Vec<usize>> {
    params
        .output_sizes
        .iter()
        .map(|size| {
            let mut shape = vec![params.batch_size];
            shape.extend_from_slice(size);
            shape
        })
        .collect()
}

fn constant_outputs(shapes: &[Vec<usize>], value: f32) -> Vec<TensorData> {
    shapes
        .iter()
        .map(|shape| {
            let len = shape.iter().product();
            TensorData::new(shape.clone(), vec![value; len])
        })
        .collect()
}

/// In-memory compiler backend that records every builder interaction and
/// loads a runtime producing constant outputs.
pub struct StubBackend {
    pub status: BackendStatus,
    pub parse_diagnostics: Option<Vec<String>>,
    pub output_value: f32,
    output_shapes: Vec<Vec<usize>>,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl StubBackend {
    pub fn new(params: &ModelParams) -> StubBackend {
        StubBackend {
            status: available_status(),
            parse_diagnostics: None,
            output_value: 1.0,
            output_shapes: full_output_shapes(params),
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    pub fn with_status(mut self, status: BackendStatus) -> StubBackend {
        self.status = status;
        self
    }

    pub fn with_parse_failure(mut self, diagnostics: Vec<String>) -> StubBackend {
        self.parse_diagnostics = Some(diagnostics);
        self
    }

    pub fn with_output_value(mut self, value: f32) -> StubBackend {
        self.output_value = value;
        self
    }
}

struct StubSession {
    recorded: Arc<Mutex<Recorded>>,
    parse_diagnostics: Option<Vec<String>>,
}

impl BuildSession for StubSession {
    fn configure(&mut self, options: &BuilderOptions) -> Result<(), OptimizerError> {
        self.recorded.lock().unwrap().options.push(options.clone());
        Ok(())
    }

    fn parse_graph(&mut self, _model: &Path) -> ParseOutcome {
        match &self.parse_diagnostics {
            Some(diagnostics) => ParseOutcome::Failed(diagnostics.clone()),
            None => ParseOutcome::Parsed,
        }
    }

    fn attach_profile(&mut self, profile: &ShapeProfile) -> Result<(), OptimizerError> {
        self.recorded.lock().unwrap().profiles.push(profile.clone());
        Ok(())
    }

    fn build(&mut self) -> Result<Bytes, OptimizerError> {
        self.recorded.lock().unwrap().builds_finished += 1;
        Ok(Bytes::from_static(b"stub-engine"))
    }
}

struct StubRuntime {
    output_shapes: Vec<Vec<usize>>,
    value: f32,
}

impl EngineRuntime for StubRuntime {
    fn infer(&self, _inputs: &[TensorData]) -> Result<Vec<TensorData>, OptimizerError> {
        Ok(constant_outputs(&self.output_shapes, self.value))
    }
}

impl CompilerBackend for StubBackend {
    fn family(&self) -> &str {
        "stub"
    }

    fn probe(&self) -> BackendStatus {
        self.status.clone()
    }

    fn begin_build(&self) -> Result<Box<dyn BuildSession>, OptimizerError> {
        self.recorded.lock().unwrap().builds_started += 1;
        Ok(Box::new(StubSession {
            recorded: self.recorded.clone(),
            parse_diagnostics: self.parse_diagnostics.clone(),
        }))
    }

    fn load_runtime(&self, _engine: Bytes) -> Result<Box<dyn EngineRuntime>, OptimizerError> {
        Ok(Box::new(StubRuntime {
            output_shapes: self.output_shapes.clone(),
            value: self.output_value,
        }))
    }
}

/// Graph runtime whose reference outputs are constant tensors.
pub struct StubGraphRuntime {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub output_value: f32,
    output_shapes: Vec<Vec<usize>>,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl StubGraphRuntime {
    pub fn new(params: &ModelParams, recorded: Arc<Mutex<Recorded>>) -> StubGraphRuntime {
        StubGraphRuntime {
            inputs: (0..params.input_infos.len()).map(|i| format!("input_{}", i)).collect(),
            outputs: (0..params.output_sizes.len()).map(|i| format!("output_{}", i)).collect(),
            output_value: 1.0,
            output_shapes: full_output_shapes(params),
            recorded,
        }
    }
}

impl GraphRuntime for StubGraphRuntime {
    fn input_names(&self, _model: &Path) -> Result<Vec<String>, OptimizerError> {
        Ok(self.inputs.clone())
    }

    fn output_names(&self, _model: &Path) -> Result<Vec<String>, OptimizerError> {
        Ok(self.outputs.clone())
    }

    fn run(&self, _model: &Path, _inputs: &[TensorData]) -> Result<Vec<TensorData>, OptimizerError> {
        self.recorded.lock().unwrap().reference_runs += 1;
        Ok(constant_outputs(&self.output_shapes, self.output_value))
    }
}

pub fn available_status() -> BackendStatus {
    BackendStatus::Available { version: Version::parse("8.2.0").unwrap() }
}

/// Two-input model, fixed shapes, batch size 2.
pub fn static_params() -> ModelParams {
    ModelParams {
        batch_size: 2,
        input_infos: vec![
            InputInfo { size: vec![3, 4], min_sizes: None },
            InputInfo { size: vec![6], min_sizes: None },
        ],
        output_sizes: vec![vec![5]],
        dynamic_axes: None,
    }
}

/// Write a placeholder serialized model and return its path.
pub fn write_model(dir: &Path) -> PathBuf {
    let path = dir.join("net.onnx");
    std::fs::write(&path, b"serialized-graph").unwrap();
    path
}
