use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::AnalysisError;

/// Float32 rounding allowed past either end of `[0, 1]` before a value is
/// treated as malformed; values inside it are clamped onto the bound.
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Fracture classes predicted by the classifier, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FractureClass {
    #[serde(rename = "No fracture")]
    NoFracture,
    #[serde(rename = "Compression fracture")]
    Compression,
    #[serde(rename = "Burst fracture")]
    Burst,
    #[serde(rename = "Flexion teardrop fracture")]
    FlexionTeardrop,
    #[serde(rename = "Facet dislocation")]
    FacetDislocation,
    #[serde(rename = "Hangman's fracture")]
    Hangmans,
    #[serde(rename = "Jefferson fracture")]
    Jefferson,
    #[serde(rename = "Odontoid fracture")]
    Odontoid,
}

impl FractureClass {
    pub const COUNT: usize = 8;

    /// All classes indexed by their position in the classifier output
    pub const ALL: [FractureClass; Self::COUNT] = [
        FractureClass::NoFracture,
        FractureClass::Compression,
        FractureClass::Burst,
        FractureClass::FlexionTeardrop,
        FractureClass::FacetDislocation,
        FractureClass::Hangmans,
        FractureClass::Jefferson,
        FractureClass::Odontoid,
    ];

    /// Canonical display label
    pub fn label(self) -> &'static str {
        match self {
            FractureClass::NoFracture => "No fracture",
            FractureClass::Compression => "Compression fracture",
            FractureClass::Burst => "Burst fracture",
            FractureClass::FlexionTeardrop => "Flexion teardrop fracture",
            FractureClass::FacetDislocation => "Facet dislocation",
            FractureClass::Hangmans => "Hangman's fracture",
            FractureClass::Jefferson => "Jefferson fracture",
            FractureClass::Odontoid => "Odontoid fracture",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Look up a class by its exact (case-sensitive) label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.label() == label)
    }

    pub fn is_fracture(self) -> bool {
        self != FractureClass::NoFracture
    }
}

impl std::fmt::Display for FractureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Probability assigned to every fracture class.
///
/// Always holds exactly one entry per [`FractureClass`]. Values are whatever
/// the classifier produced; no renormalization is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityMap {
    values: [f64; FractureClass::COUNT],
}

impl ProbabilityMap {
    /// Build a map from a classifier output row, zipped positionally
    /// against the class table.
    pub fn from_row(row: &[f32]) -> Result<Self, AnalysisError> {
        if row.len() != FractureClass::COUNT {
            return Err(AnalysisError::MalformedOutput(format!(
                "expected {} class probabilities, got {}",
                FractureClass::COUNT,
                row.len()
            )));
        }

        let mut values = [0.0; FractureClass::COUNT];
        for (idx, &prob) in row.iter().enumerate() {
            let value = f64::from(prob);
            let bounds = -PROBABILITY_TOLERANCE..=1.0 + PROBABILITY_TOLERANCE;
            if !value.is_finite() || !bounds.contains(&value) {
                return Err(AnalysisError::MalformedOutput(format!(
                    "probability for {} is outside [0, 1]: {}",
                    FractureClass::ALL[idx],
                    value
                )));
            }
            values[idx] = value.clamp(0.0, 1.0);
        }

        Ok(Self { values })
    }

    /// Distribution reported when no classifier is loaded
    pub fn mock() -> Self {
        Self {
            values: [0.15, 0.35, 0.05, 0.10, 0.15, 0.08, 0.07, 0.05],
        }
    }

    pub fn get(&self, class: FractureClass) -> f64 {
        self.values[class.index()]
    }

    /// Probability for a label string; `None` for labels outside the class table
    pub fn get_label(&self, label: &str) -> Option<f64> {
        FractureClass::from_label(label).map(|class| self.get(class))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FractureClass, f64)> + '_ {
        FractureClass::ALL.into_iter().zip(self.values.iter().copied())
    }

    /// Sum of every probability except "No fracture"
    pub fn overall_risk(&self) -> f64 {
        self.iter()
            .filter(|(class, _)| class.is_fracture())
            .map(|(_, prob)| prob)
            .sum()
    }

    /// Class with the strictly greatest probability.
    ///
    /// Scanning starts from a zero probability and only a strictly greater
    /// value replaces the current pick, so ties keep the lowest index.
    /// Returns `None` when no class is above zero.
    pub fn top(&self) -> Option<TopPrediction> {
        let mut best: Option<TopPrediction> = None;
        let mut best_prob = 0.0;
        for (class, probability) in self.iter() {
            if probability > best_prob {
                best_prob = probability;
                best = Some(TopPrediction { class, probability });
            }
        }
        best
    }
}

impl Serialize for ProbabilityMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FractureClass::COUNT))?;
        for (class, prob) in self.iter() {
            map.serialize_entry(class.label(), &prob)?;
        }
        map.end()
    }
}

/// Highest-probability class of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopPrediction {
    pub class: FractureClass,
    pub probability: f64,
}

impl TopPrediction {
    /// Top class reported alongside [`ProbabilityMap::mock`]
    pub fn mock() -> Self {
        Self {
            class: FractureClass::Compression,
            probability: 0.35,
        }
    }

    /// Diagnosis sentence used in prompts and prescriptions
    pub fn diagnosis(&self) -> String {
        format!(
            "{} detected with {:.2}% confidence.",
            self.class,
            self.probability * 100.0
        )
    }
}

/// Classifier output reduced to a probability map and its top class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probabilities: ProbabilityMap,
    pub top: TopPrediction,
}

impl Prediction {
    /// Prediction used when the classifier is unavailable
    pub fn mock() -> Self {
        Self {
            probabilities: ProbabilityMap::mock(),
            top: TopPrediction::mock(),
        }
    }

    /// Reduce a classifier output row into a prediction
    pub fn from_row(row: &[f32]) -> Result<Self, AnalysisError> {
        let probabilities = ProbabilityMap::from_row(row)?;
        let top = probabilities.top().ok_or(AnalysisError::NoPositiveProbability)?;
        Ok(Self { probabilities, top })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_index() {
        for (idx, class) in FractureClass::ALL.into_iter().enumerate() {
            assert_eq!(class.index(), idx);
            assert_eq!(FractureClass::from_index(idx), Some(class));
            assert_eq!(FractureClass::from_label(class.label()), Some(class));
        }
        assert_eq!(FractureClass::from_index(8), None);
        assert_eq!(FractureClass::from_label("jefferson fracture"), None);
    }

    #[test]
    fn mock_prediction_matches_fixture() {
        let prediction = Prediction::mock();
        assert_eq!(prediction.top.class, FractureClass::Compression);
        assert_eq!(prediction.top.probability, 0.35);
        assert_eq!(prediction.probabilities.get(FractureClass::NoFracture), 0.15);
        assert_eq!(prediction.probabilities.get(FractureClass::Odontoid), 0.05);
        assert_eq!(prediction.probabilities.top(), Some(TopPrediction::mock()));
    }

    #[test]
    fn overall_risk_excludes_no_fracture() {
        let risk = ProbabilityMap::mock().overall_risk();
        assert!((risk - 0.85).abs() < 1e-9);
    }

    #[test]
    fn ties_keep_lowest_index() {
        let row = [0.1, 0.3, 0.3, 0.1, 0.05, 0.05, 0.05, 0.05];
        let prediction = Prediction::from_row(&row).unwrap();
        assert_eq!(prediction.top.class, FractureClass::Compression);
    }

    #[test]
    fn all_zero_row_has_no_top_class() {
        let row = [0.0; 8];
        let map = ProbabilityMap::from_row(&row).unwrap();
        assert_eq!(map.top(), None);
        assert!(matches!(
            Prediction::from_row(&row),
            Err(AnalysisError::NoPositiveProbability)
        ));
    }

    #[test]
    fn rejects_wrong_width_and_out_of_range_values() {
        assert!(matches!(
            ProbabilityMap::from_row(&[0.5; 7]),
            Err(AnalysisError::MalformedOutput(_))
        ));
        let mut row = [0.1; 8];
        row[3] = 1.5;
        assert!(ProbabilityMap::from_row(&row).is_err());
        row[3] = f32::NAN;
        assert!(ProbabilityMap::from_row(&row).is_err());
        row[3] = -0.01;
        assert!(ProbabilityMap::from_row(&row).is_err());
    }

    #[test]
    fn float_rounding_at_the_bounds_is_clamped() {
        let mut row = [0.0f32; 8];
        row[1] = 1.000_000_1;
        row[4] = -1e-7;
        let map = ProbabilityMap::from_row(&row).unwrap();
        assert_eq!(map.get(FractureClass::Compression), 1.0);
        assert_eq!(map.get(FractureClass::FacetDislocation), 0.0);
        assert_eq!(map.top().unwrap().class, FractureClass::Compression);
    }

    #[test]
    fn serializes_as_label_keyed_object() {
        let json = serde_json::to_value(ProbabilityMap::mock()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 8);
        assert_eq!(object["Hangman's fracture"], 0.08);
        assert_eq!(object["Compression fracture"], 0.35);
    }

    #[test]
    fn diagnosis_uses_two_decimal_percentage() {
        let top = TopPrediction {
            class: FractureClass::Burst,
            probability: 0.123456,
        };
        assert_eq!(top.diagnosis(), "Burst fracture detected with 12.35% confidence.");
        assert_eq!(
            TopPrediction::mock().diagnosis(),
            "Compression fracture detected with 35.00% confidence."
        );
    }
}
