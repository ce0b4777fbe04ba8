use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::OptimizerError;

/// Flat tensor buffer with its shape. The single interchange type used for
/// calibration batches, reference outputs and engine inputs/outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorData {
    /// # Panics
    /// Panics when `data.len()` does not match the element count implied by
    /// `shape`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> TensorData {
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "tensor data length does not match its shape"
        );
        TensorData { shape, data }
    }

    pub fn zeros(shape: Vec<usize>) -> TensorData {
        let len = shape.iter().product();
        TensorData { shape, data: vec![0.0; len] }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Declared shape of one input tensor, batch axis excluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    pub size: Vec<usize>,
    /// Minimum extents for dynamic non-batch axes, keyed by full-shape axis
    /// index. Axes without an entry default to a minimum of 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_sizes: Option<BTreeMap<usize, usize>>,
}

/// Which axes vary at runtime, per input and output tensor. Maps full-shape
/// axis index to the axis tag declared in the graph; axis 0 is the batch
/// axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicAxes {
    pub inputs: Vec<BTreeMap<usize, String>>,
    #[serde(default)]
    pub outputs: Vec<BTreeMap<usize, String>>,
}

/// Immutable description of a model's expected tensor shapes. Created once
/// by the caller before optimization and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    pub batch_size: usize,
    pub input_infos: Vec<InputInfo>,
    pub output_sizes: Vec<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_axes: Option<DynamicAxes>,
}

impl ModelParams {
    pub fn from_json(text: &str) -> Result<ModelParams, OptimizerError> {
        serde_json::from_str(text).map_err(|e| {
            OptimizerError::InvalidConfiguration(format!("malformed model params: {}", e))
        })
    }

    /// Full shape of the input at `index`, batch axis included.
    ///
    /// # Panics
    /// Panics when `index` is outside the declared inputs.
    pub fn full_input_shape(&self, index: usize) -> Vec<usize> {
        let info = &self.input_infos[index];
        let mut shape = Vec::with_capacity(info.size.len() + 1);
        shape.push(self.batch_size);
        shape.extend_from_slice(&info.size);
        shape
    }

    /// One zero-filled input tuple at the declared shapes, used when no
    /// representative data is available.
    pub fn synthetic_inputs(&self) -> Result<Vec<TensorData>, OptimizerError> {
        if self.input_infos.is_empty() {
            return Err(OptimizerError::InvalidConfiguration(
                "model params declare no input shapes, cannot derive default inputs".to_string(),
            ));
        }
        Ok((0..self.input_infos.len())
            .map(|i| TensorData::zeros(self.full_input_shape(i)))
            .collect())
    }
}
