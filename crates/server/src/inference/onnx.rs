//! ONNX-exported classifier executed with tract

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array2, Array4};
use tract_onnx::prelude::*;

use super::classifier::{FractureClassifier, RawOutput};
use super::preprocess::INPUT_SIZE;
use super::InferenceError;

type Plan = TypedRunnableModel<TypedModel>;

/// Classifier backed by an optimized tract plan
pub struct OnnxClassifier {
    plan: Plan,
    output_names: Vec<String>,
}

impl OnnxClassifier {
    /// Load and optimize the model at `path` for a `(1, 128, 128, 3)` f32 input
    pub fn load(path: &Path) -> TractResult<Self> {
        let side = INPUT_SIZE as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, f32::fact([1, side, side, 3]).into())?
            .into_optimized()?
            .into_runnable()?;

        let model = plan.model();
        let output_names = model
            .outputs
            .iter()
            .map(|outlet| {
                model
                    .outlet_label(*outlet)
                    .unwrap_or(model.node(outlet.node).name.as_str())
                    .to_string()
            })
            .collect();

        Ok(Self { plan, output_names })
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

/// Flatten a tract output into `(batch, features)`
fn to_batch_rows(value: &Tensor) -> Result<Array2<f32>, InferenceError> {
    let view = value
        .to_array_view::<f32>()
        .map_err(|e| InferenceError::Model(format!("Non-f32 classifier output: {}", e)))?;

    let shape = view.shape();
    let (rows, cols) = match shape {
        [] => (1, 1),
        [n] => (1, *n),
        [batch, rest @ ..] => (*batch, rest.iter().product()),
    };

    Array2::from_shape_vec((rows, cols), view.iter().copied().collect())
        .map_err(|e| InferenceError::Model(format!("Unexpected output shape {:?}: {}", shape, e)))
}

impl FractureClassifier for OnnxClassifier {
    fn classify(&self, input: &Array4<f32>) -> Result<RawOutput, InferenceError> {
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_shape(input.shape(), &data)
            .map_err(|e| InferenceError::Model(format!("Invalid input tensor: {}", e)))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        let arrays = outputs
            .iter()
            .map(|value| to_batch_rows(value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(shape_outputs(&self.output_names, arrays))
    }
}

/// Choose the output shape from the graph's output names.
///
/// A `dense` output keys every output by name, a lone output is plain, and
/// anything else stays positional.
fn shape_outputs(names: &[String], mut arrays: Vec<Array2<f32>>) -> RawOutput {
    if names.iter().any(|name| name == "dense") {
        let keyed: HashMap<String, Array2<f32>> = names.iter().cloned().zip(arrays).collect();
        return RawOutput::Keyed(keyed);
    }

    if arrays.len() == 1 {
        return RawOutput::Plain(arrays.remove(0));
    }

    RawOutput::Sequence(arrays)
}
