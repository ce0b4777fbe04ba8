use crate::params::TensorData;

/// A stage applied to a model's input tuple before inference.
pub trait InputTransform {
    fn apply(&self, inputs: Vec<TensorData>) -> Vec<TensorData>;
}

/// Ordered chain of input transforms, applied by the learner on every call.
#[derive(Default)]
pub struct TransformPipeline {
    stages: Vec<Box<dyn InputTransform>>,
}

impl TransformPipeline {
    pub fn new() -> TransformPipeline {
        TransformPipeline { stages: Vec::new() }
    }

    pub fn with_stage<T: InputTransform + 'static>(mut self, stage: T) -> TransformPipeline {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn apply(&self, mut inputs: Vec<TensorData>) -> Vec<TensorData> {
        for stage in &self.stages {
            inputs = stage.apply(inputs);
        }
        inputs
    }
}

/// Scale every element by a fixed divisor, e.g. 255 for byte images.
pub struct Normalize {
    pub divisor: f32,
}

impl InputTransform for Normalize {
    fn apply(&self, mut inputs: Vec<TensorData>) -> Vec<TensorData> {
        for tensor in &mut inputs {
            for v in &mut tensor.data {
                *v /= self.divisor;
            }
        }
        inputs
    }
}

/// Subtract a mean and divide by a standard deviation.
pub struct Standardize {
    pub mean: f32,
    pub std: f32,
}

impl InputTransform for Standardize {
    fn apply(&self, mut inputs: Vec<TensorData>) -> Vec<TensorData> {
        for tensor in &mut inputs {
            for v in &mut tensor.data {
                *v = (*v - self.mean) / self.std;
            }
        }
        inputs
    }
}
