use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::data::SampleStore;
use crate::params::{ModelParams, TensorData};
use crate::quantize::DivergenceMetric;
use crate::transform::TransformPipeline;

/// Numeric-precision mode requested for the compiled engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QuantizationMode {
    None,
    HalfPrecision,
    StaticCalibrated,
    DynamicDataFree,
}

impl QuantizationMode {
    pub fn as_str(&self) -> &str {
        use QuantizationMode::*;
        match self {
            None => "none",
            HalfPrecision => "half",
            StaticCalibrated => "static",
            DynamicDataFree => "dynamic",
        }
    }
}

/// Framework the returned learner's interface is bound to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameworkTag {
    Torch,
    TensorFlow,
    Numpy,
}

impl FrameworkTag {
    pub fn as_str(&self) -> &str {
        use FrameworkTag::*;
        match self {
            Torch => "torch",
            TensorFlow => "tensorflow",
            Numpy => "numpy",
        }
    }
}

pub type MetricFn = Box<DivergenceMetric>;

/// One optimization request. Mandatory fields go through `new`; the rest
/// are chained.
pub struct OptimizeRequest {
    pub model_path: PathBuf,
    pub framework: FrameworkTag,
    pub params: ModelParams,
    pub transforms: TransformPipeline,
    pub accuracy_threshold: Option<f32>,
    pub quantization: QuantizationMode,
    pub metric: Option<MetricFn>,
    pub reference_data: Option<SampleStore>,
    /// Per-tensor (min, max) activation ranges for data-free low precision.
    pub dynamic_ranges: Option<HashMap<String, (f32, f32)>>,
}

impl OptimizeRequest {
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        framework: FrameworkTag,
        params: ModelParams,
    ) -> OptimizeRequest {
        OptimizeRequest {
            model_path: model_path.as_ref().to_path_buf(),
            framework,
            params,
            transforms: TransformPipeline::new(),
            accuracy_threshold: None,
            quantization: QuantizationMode::None,
            metric: None,
            reference_data: None,
            dynamic_ranges: None,
        }
    }

    pub fn quantization(mut self, mode: QuantizationMode) -> OptimizeRequest {
        self.quantization = mode;
        self
    }

    pub fn accuracy_threshold(mut self, threshold: f32) -> OptimizeRequest {
        self.accuracy_threshold = Some(threshold);
        self
    }

    pub fn transforms(mut self, transforms: TransformPipeline) -> OptimizeRequest {
        self.transforms = transforms;
        self
    }

    pub fn metric<F>(mut self, metric: F) -> OptimizeRequest
    where
        F: Fn(&TensorData, &TensorData, Option<&TensorData>) -> f32 + 'static,
    {
        self.metric = Some(Box::new(metric));
        self
    }

    pub fn reference_data(mut self, data: SampleStore) -> OptimizeRequest {
        self.reference_data = Some(data);
        self
    }

    pub fn dynamic_ranges(mut self, ranges: HashMap<String, (f32, f32)>) -> OptimizeRequest {
        self.dynamic_ranges = Some(ranges);
        self
    }
}
