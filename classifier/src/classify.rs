use std::io::Write;

use tract_onnx::prelude::*;

use crate::errors::{ClassifyError, ClassifyResult};

/// The best scoring class of an output vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub probability: f32,
    pub label: String,
}

/// Index and value of the maximum. First occurrence wins, NaNs never do.
pub fn arg_max(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (ix, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.map(|(_, b)| v > b).unwrap_or(true) {
            best = Some((ix, v));
        }
    }
    best
}

/// Looks the arg-max of `output`, whatever its shape, up in `labels`.
pub fn best_class(output: &Tensor, labels: &[String]) -> ClassifyResult<Prediction> {
    let values = output.as_slice::<f32>().map_err(ClassifyError::Inference)?;
    let (index, probability) = arg_max(values).ok_or_else(|| {
        ClassifyError::Inference(anyhow::anyhow!(
            "No probability to pick from in output of shape {:?}",
            output.shape()
        ))
    })?;
    let label = labels
        .get(index)
        .ok_or(ClassifyError::UnknownClass { index, labels: labels.len() })?;
    Ok(Prediction { index, probability, label: label.clone() })
}

pub fn report(out: &mut dyn Write, prediction: &Prediction) -> std::io::Result<()> {
    writeln!(out, "Best class: #{} '{}'", prediction.index, prediction.label)?;
    writeln!(out, "Probability: {}%", prediction.probability * 100.0)?;
    out.flush()
}
