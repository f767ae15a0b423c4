use std::collections::HashMap;

use ndarray::{Array2, Axis};
use spine_core::{AnalysisError, FractureClass, Prediction};

use super::InferenceError;

/// Output key whose logits are softmaxed into class probabilities
const DENSE_OUTPUT: &str = "dense";

/// Raw classifier output, in one of the shapes a saved model may return
#[derive(Debug, Clone)]
pub enum RawOutput {
    /// Named outputs; the `dense` entry holds logits
    Keyed(HashMap<String, Array2<f32>>),
    /// Positional outputs; the first holds probabilities
    Sequence(Vec<Array2<f32>>),
    /// A single probability array
    Plain(Array2<f32>),
}

impl RawOutput {
    /// Normalize the output into a `(batch, classes)` probability array
    pub fn into_probabilities(self) -> Result<Array2<f32>, AnalysisError> {
        match self {
            RawOutput::Keyed(mut outputs) => {
                let logits = outputs.remove(DENSE_OUTPUT).ok_or_else(|| {
                    let mut keys: Vec<_> = outputs.into_keys().collect();
                    keys.sort();
                    AnalysisError::UnrecognizedOutput(format!("keys [{}]", keys.join(", ")))
                })?;
                Ok(softmax(logits))
            }
            RawOutput::Sequence(outputs) => outputs.into_iter().next().ok_or_else(|| {
                AnalysisError::MalformedOutput("empty output sequence".to_string())
            }),
            RawOutput::Plain(probabilities) => Ok(probabilities),
        }
    }
}

/// Row-wise softmax
fn softmax(mut logits: Array2<f32>) -> Array2<f32> {
    for mut row in logits.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
    logits
}

/// A loaded image classifier.
///
/// Implementations take the preprocessed `(1, 128, 128, 3)` tensor and return
/// the model's raw output; shape normalization happens in [`predict`].
pub trait FractureClassifier: Send + Sync {
    fn classify(&self, input: &ndarray::Array4<f32>) -> Result<RawOutput, InferenceError>;
}

/// Run the classifier (or the fixed mock when none is loaded) and reduce
/// its output to a [`Prediction`].
pub fn predict(
    classifier: Option<&dyn FractureClassifier>,
    input: &ndarray::Array4<f32>,
) -> Result<Prediction, InferenceError> {
    let Some(classifier) = classifier else {
        tracing::debug!("Classifier unavailable, returning mock prediction");
        return Ok(Prediction::mock());
    };

    let probabilities = classifier.classify(input)?.into_probabilities()?;
    let row = probabilities.rows().into_iter().next().ok_or_else(|| {
        AnalysisError::MalformedOutput("classifier returned an empty batch".to_string())
    })?;

    if row.len() != FractureClass::COUNT {
        return Err(AnalysisError::MalformedOutput(format!(
            "expected {} classes, got {}",
            FractureClass::COUNT,
            row.len()
        ))
        .into());
    }

    let row: Vec<f32> = row.iter().copied().collect();
    Ok(Prediction::from_row(&row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array4, array};

    struct Fixed(RawOutput);

    impl FractureClassifier for Fixed {
        fn classify(&self, _input: &Array4<f32>) -> Result<RawOutput, InferenceError> {
            Ok(self.0.clone())
        }
    }

    fn input() -> Array4<f32> {
        Array4::zeros((1, 128, 128, 3))
    }

    #[test]
    fn missing_classifier_returns_mock() {
        let prediction = predict(None, &input()).unwrap();
        assert_eq!(prediction, Prediction::mock());
    }

    #[test]
    fn plain_output_is_used_as_is() {
        let output = RawOutput::Plain(array![[0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.6, 0.1]]);
        let prediction = predict(Some(&Fixed(output)), &input()).unwrap();
        assert_eq!(prediction.top.class, FractureClass::Jefferson);
        assert!((prediction.top.probability - 0.6).abs() < 1e-6);
    }

    #[test]
    fn sequence_output_takes_first_element() {
        let output = RawOutput::Sequence(vec![
            array![[0.0, 0.0, 0.9, 0.1, 0.0, 0.0, 0.0, 0.0]],
            array![[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
        ]);
        let prediction = predict(Some(&Fixed(output)), &input()).unwrap();
        assert_eq!(prediction.top.class, FractureClass::Burst);
    }

    #[test]
    fn keyed_dense_output_is_softmaxed() {
        let mut outputs = HashMap::new();
        outputs.insert(
            "dense".to_string(),
            array![[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0]],
        );
        let prediction = predict(Some(&Fixed(RawOutput::Keyed(outputs))), &input()).unwrap();

        let total: f64 = prediction.probabilities.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(prediction.top.class, FractureClass::Odontoid);
        assert!(prediction.top.probability > 0.7);
    }

    #[test]
    fn keyed_output_without_dense_is_rejected() {
        let mut outputs = HashMap::new();
        outputs.insert("logits".to_string(), Array2::zeros((1, 8)));
        let err = predict(Some(&Fixed(RawOutput::Keyed(outputs))), &input()).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Analysis(AnalysisError::UnrecognizedOutput(_))
        ));
    }

    #[test]
    fn wrong_class_count_is_rejected() {
        let output = RawOutput::Plain(array![[0.5, 0.5]]);
        assert!(predict(Some(&Fixed(output)), &input()).is_err());
    }

    #[test]
    fn uses_first_batch_row_only() {
        let output = RawOutput::Plain(array![
            [0.8, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        ]);
        let prediction = predict(Some(&Fixed(output)), &input()).unwrap();
        assert_eq!(prediction.top.class, FractureClass::NoFracture);
    }
}
