//! Per-request analysis result

use serde::Serialize;

use crate::error::AnalysisError;
use crate::fracture::{Prediction, ProbabilityMap, TopPrediction};
use crate::recommendation::{Recommendations, recommend};

/// Everything reported about one uploaded radiograph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub fracture_probabilities: ProbabilityMap,
    pub highest_probability_fracture: TopPrediction,
    pub overall_fracture_risk: f64,
    pub recommendations: Recommendations,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,
}

impl AnalysisResult {
    /// Assemble the result for a prediction, without a prescription
    pub fn from_prediction(prediction: &Prediction) -> Result<Self, AnalysisError> {
        let recommendations =
            recommend(prediction.top.class.label(), &prediction.probabilities)?;

        Ok(Self {
            fracture_probabilities: prediction.probabilities,
            highest_probability_fracture: prediction.top,
            overall_fracture_risk: prediction.probabilities.overall_risk(),
            recommendations,
            prescription: None,
        })
    }

    pub fn with_prescription(mut self, prescription: String) -> Self {
        self.prescription = Some(prescription);
        self
    }
}
