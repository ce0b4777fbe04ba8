use engineforge::{
    check_mode, precision_flags, relative_divergence, resolve_calibration, InputInfo, ModelParams,
    OptimizerError, QuantizationMode, SampleRecord, SampleStore, TensorData,
};

fn params() -> ModelParams {
    ModelParams {
        batch_size: 2,
        input_infos: vec![InputInfo { size: vec![3], min_sizes: None }],
        output_sizes: vec![vec![4]],
        dynamic_axes: None,
    }
}

fn store(n: usize) -> SampleStore {
    SampleStore::new(
        (0..n)
            .map(|i| SampleRecord {
                inputs: vec![TensorData::new(vec![2, 3], vec![i as f32; 6])],
                label: None,
            })
            .collect(),
    )
}

#[test]
fn precision_flags_follow_the_mode() {
    assert_eq!(precision_flags(QuantizationMode::None), Default::default());
    let half = precision_flags(QuantizationMode::HalfPrecision);
    assert!(half.half && !half.low_precision);
    let stat = precision_flags(QuantizationMode::StaticCalibrated);
    assert!(!stat.half && stat.low_precision);
    let dynamic = precision_flags(QuantizationMode::DynamicDataFree);
    assert!(!dynamic.half && dynamic.low_precision);
}

#[test]
fn a_threshold_requires_a_quantization_mode() {
    assert!(check_mode(QuantizationMode::None, None).is_ok());
    assert!(check_mode(QuantizationMode::HalfPrecision, Some(0.1)).is_ok());
    let err = check_mode(QuantizationMode::None, Some(0.1)).unwrap_err();
    assert!(matches!(err, OptimizerError::InvalidConfiguration(_)));
}

#[test]
fn only_static_quantization_needs_calibration() {
    for &mode in &[
        QuantizationMode::None,
        QuantizationMode::HalfPrecision,
        QuantizationMode::DynamicDataFree,
    ] {
        let calibrator = resolve_calibration(mode, None, &params(), 300).unwrap();
        assert!(calibrator.is_none());
    }
}

#[test]
fn static_calibration_samples_the_store_in_order() {
    let store = store(5);
    let calibrator = resolve_calibration(QuantizationMode::StaticCalibrated, Some(&store), &params(), 3)
        .unwrap()
        .unwrap();
    assert_eq!(calibrator.batch_size, 2);
    assert_eq!(calibrator.batches.len(), 3);
    assert_eq!(calibrator.batches[1][0].data, vec![1.0; 6]);
}

#[test]
fn static_calibration_falls_back_to_a_zero_batch() {
    let calibrator = resolve_calibration(QuantizationMode::StaticCalibrated, None, &params(), 300)
        .unwrap()
        .unwrap();
    assert_eq!(calibrator.batches.len(), 1);
    let batch = &calibrator.batches[0];
    assert_eq!(batch[0].shape, vec![2, 3]);
    assert!(batch[0].data.iter().all(|&v| v == 0.0));
}

#[test]
fn static_calibration_fails_without_any_input_shapes() {
    let bare = ModelParams {
        batch_size: 2,
        input_infos: vec![],
        output_sizes: vec![vec![4]],
        dynamic_axes: None,
    };
    let err = resolve_calibration(QuantizationMode::StaticCalibrated, None, &bare, 300).unwrap_err();
    assert!(matches!(err, OptimizerError::InvalidConfiguration(_)));
}

#[test]
fn identical_outputs_do_not_diverge() {
    let a = TensorData::new(vec![4], vec![1.0, -2.0, 0.5, 3.0]);
    assert_eq!(relative_divergence(&a, &a.clone(), None), 0.0);
}

#[test]
fn divergence_grows_with_the_gap() {
    let reference = TensorData::new(vec![2], vec![1.0, 1.0]);
    let near = TensorData::new(vec![2], vec![1.01, 1.0]);
    let far = TensorData::new(vec![2], vec![2.0, 1.0]);
    let small = relative_divergence(&near, &reference, None);
    let large = relative_divergence(&far, &reference, None);
    assert!(small > 0.0);
    assert!(large > small);
    // |2 - 1| / (2 + eps), averaged over two elements
    assert!((large - 0.25).abs() < 1e-3);
}

#[test]
fn shape_mismatch_diverges_infinitely() {
    let a = TensorData::new(vec![2], vec![1.0, 1.0]);
    let b = TensorData::new(vec![3], vec![1.0, 1.0, 1.0]);
    assert_eq!(relative_divergence(&a, &b, None), f32::INFINITY);
}
