use log::{debug, warn};

use crate::data::SampleStore;
use crate::optimize::QuantizationMode;
use crate::params::{ModelParams, TensorData};
use crate::runtime::Learner;
use crate::OptimizerError;

/// Divisor guard for the default divergence metric.
const DIVERGENCE_EPS: f32 = 1e-5;

/// Builder precision flags implied by a quantization mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PrecisionFlags {
    pub half: bool,
    pub low_precision: bool,
}

pub fn precision_flags(mode: QuantizationMode) -> PrecisionFlags {
    match mode {
        QuantizationMode::None => PrecisionFlags::default(),
        QuantizationMode::HalfPrecision => PrecisionFlags { half: true, low_precision: false },
        QuantizationMode::StaticCalibrated | QuantizationMode::DynamicDataFree => {
            PrecisionFlags { half: false, low_precision: true }
        }
    }
}

/// Calibration feed handed to the backend during static quantization.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrator {
    pub batch_size: usize,
    pub batches: Vec<Vec<TensorData>>,
}

/// Reject incoherent mode/threshold combinations before any compilation
/// work starts.
pub fn check_mode(mode: QuantizationMode, threshold: Option<f32>) -> Result<(), OptimizerError> {
    if threshold.is_some() && mode == QuantizationMode::None {
        return Err(OptimizerError::InvalidConfiguration(
            "an accuracy threshold requires a quantization mode".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the calibration feed for static quantization: representative
/// batches sampled from the caller's store when one is supplied, a single
/// zero-filled tuple derived from the model params otherwise. Other modes
/// need no calibration.
pub fn resolve_calibration(
    mode: QuantizationMode,
    data: Option<&SampleStore>,
    params: &ModelParams,
    cap: usize,
) -> Result<Option<Calibrator>, OptimizerError> {
    if mode != QuantizationMode::StaticCalibrated {
        return Ok(None);
    }
    let batches = match data {
        Some(store) if !store.is_empty() => store.sample_inputs(cap, false),
        _ => vec![params.synthetic_inputs()?],
    };
    Ok(Some(Calibrator { batch_size: params.batch_size, batches }))
}

/// Divergence metric between one candidate and one reference output,
/// optionally consulting the sample's label.
pub type DivergenceMetric = dyn Fn(&TensorData, &TensorData, Option<&TensorData>) -> f32;

/// Default metric: mean elementwise relative difference. Shape disagreement
/// between candidate and reference diverges infinitely.
pub fn relative_divergence(
    candidate: &TensorData,
    reference: &TensorData,
    _label: Option<&TensorData>,
) -> f32 {
    if candidate.shape != reference.shape {
        return f32::INFINITY;
    }
    if candidate.data.is_empty() {
        return 0.0;
    }
    let total: f32 = candidate
        .data
        .iter()
        .zip(&reference.data)
        .map(|(&a, &b)| (a - b).abs() / (a.abs().max(b.abs()) + DIVERGENCE_EPS))
        .sum();
    total / candidate.data.len() as f32
}

/// Verdict of the accuracy gate for one engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateReport {
    pub worst: f32,
    pub threshold: f32,
}

impl GateReport {
    pub fn passed(&self) -> bool {
        self.worst <= self.threshold
    }
}

/// Run every sampled input through the candidate learner and compare its
/// outputs against the reference outputs under `metric`, keeping the worst
/// observed divergence.
pub fn validate_engine(
    learner: &Learner,
    inputs: &[Vec<TensorData>],
    references: &[Vec<TensorData>],
    labels: &[Option<TensorData>],
    threshold: f32,
    metric: &DivergenceMetric,
) -> Result<GateReport, OptimizerError> {
    let mut worst = 0.0f32;
    for (i, tuple) in inputs.iter().enumerate() {
        let candidate = learner.infer(tuple.clone())?;
        let label = labels.get(i).and_then(|l| l.as_ref());
        for (out, reference) in candidate.iter().zip(&references[i]) {
            let measured = metric(out, reference, label);
            debug!("accuracy gate: sample {} divergence {}", i, measured);
            worst = worst.max(measured);
        }
    }
    let report = GateReport { worst, threshold };
    if !report.passed() {
        warn!(
            "accuracy gate: measured divergence {} exceeds threshold {}",
            report.worst, report.threshold
        );
    }
    Ok(report)
}
