use serde::Serialize;

use crate::params::ModelParams;

/// Shape range the compiled engine must support for one input tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEntry {
    pub input: String,
    pub min: Vec<usize>,
    pub opt: Vec<usize>,
    pub max: Vec<usize>,
}

/// Optimization profile attached to the builder when the model accepts
/// variable-size inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeProfile {
    pub entries: Vec<ProfileEntry>,
}

impl ShapeProfile {
    /// Derive the min/opt/max triple for every input, pairing the
    /// graph-declared input names with the model's axis metadata. The batch
    /// axis shrinks to `min(batch_size, 1)` when dynamic; other dynamic axes
    /// shrink to their declared minimum (default 1). The optimal and maximum
    /// shapes both equal the declared full shape.
    ///
    /// Returns `None` for models without dynamic axes; such engines are
    /// compiled for the single declared shape and no profile is attached.
    pub fn from_model(params: &ModelParams, input_names: &[String]) -> Option<ShapeProfile> {
        let dynamic = params.dynamic_axes.as_ref()?;
        let mut entries = Vec::new();
        for ((name, axes), info) in input_names
            .iter()
            .zip(&dynamic.inputs)
            .zip(&params.input_infos)
        {
            let mut opt = Vec::with_capacity(info.size.len() + 1);
            opt.push(params.batch_size);
            opt.extend_from_slice(&info.size);

            let mut min = Vec::with_capacity(opt.len());
            if axes.contains_key(&0) {
                min.push(params.batch_size.min(1));
            } else {
                min.push(params.batch_size);
            }
            for (offset, &extent) in info.size.iter().enumerate() {
                let axis = offset + 1;
                if axes.contains_key(&axis) {
                    let declared = info
                        .min_sizes
                        .as_ref()
                        .and_then(|sizes| sizes.get(&axis))
                        .copied();
                    min.push(declared.unwrap_or(1));
                } else {
                    min.push(extent);
                }
            }

            entries.push(ProfileEntry { input: name.clone(), min, opt: opt.clone(), max: opt });
        }
        Some(ShapeProfile { entries })
    }
}
