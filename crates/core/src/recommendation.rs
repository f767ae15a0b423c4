//! Per-vertebra risk recommendations derived from the top fracture class
//!
//! Each region re-derives its severity from the same `(label, probability)`
//! pair with its own thresholds and label matches. Label matching is a
//! case-sensitive substring test against the canonical labels.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::fracture::{FractureClass, ProbabilityMap};

/// Severity tier reported for a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
}

/// Cervical region assessed by the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Atlas,
    Axis,
    Subaxial,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Atlas, Region::Axis, Region::Subaxial];

    pub fn label(self) -> &'static str {
        match self {
            Region::Atlas => "C1 (Atlas)",
            Region::Axis => "C2 (Axis)",
            Region::Subaxial => "C3-C7",
        }
    }
}

/// Severity and recommended action for one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionAssessment {
    pub severity: Severity,
    pub action: String,
}

impl RegionAssessment {
    fn new(severity: Severity, action: &str) -> Self {
        Self {
            severity,
            action: action.to_string(),
        }
    }
}

/// Assessments for all three cervical regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    #[serde(rename = "C1 (Atlas)")]
    pub atlas: RegionAssessment,

    #[serde(rename = "C2 (Axis)")]
    pub axis: RegionAssessment,

    #[serde(rename = "C3-C7")]
    pub subaxial: RegionAssessment,
}

impl Recommendations {
    pub fn get(&self, region: Region) -> &RegionAssessment {
        match region {
            Region::Atlas => &self.atlas,
            Region::Axis => &self.axis,
            Region::Subaxial => &self.subaxial,
        }
    }
}

/// Derive region recommendations for the top fracture label.
///
/// Fails with [`AnalysisError::UnknownClass`] when `label` is not one of the
/// canonical class labels (including the empty label).
pub fn recommend(
    label: &str,
    probabilities: &ProbabilityMap,
) -> Result<Recommendations, AnalysisError> {
    let p = probabilities
        .get_label(label)
        .ok_or_else(|| AnalysisError::UnknownClass(label.to_string()))?;
    let has_fracture = label != FractureClass::NoFracture.label();

    let atlas = if label.contains("Jefferson") || p > 0.7 {
        RegionAssessment::new(
            Severity::High,
            "Immediate immobilization required. Schedule CT scan and neurosurgical consultation.",
        )
    } else if has_fracture && p > 0.4 {
        RegionAssessment::new(
            Severity::Moderate,
            "Cervical collar recommended. Follow-up imaging in 1-2 weeks.",
        )
    } else {
        RegionAssessment::new(
            Severity::Low,
            "Monitor for symptoms. No immediate intervention required.",
        )
    };

    let axis = if label.contains("Hangman's") || label.contains("Odontoid") || p > 0.65 {
        RegionAssessment::new(
            Severity::High,
            "Halo vest or rigid collar immobilization. Neurosurgical evaluation recommended.",
        )
    } else if has_fracture && p > 0.3 {
        RegionAssessment::new(
            Severity::Moderate,
            "Rigid cervical collar. Limit movement and schedule follow-up imaging.",
        )
    } else {
        RegionAssessment::new(
            Severity::Low,
            "Rest and limited activity. Over-the-counter pain management if needed.",
        )
    };

    let subaxial = if label.contains("Burst") || label.contains("Flexion teardrop") || p > 0.6 {
        RegionAssessment::new(
            Severity::High,
            "Surgical consultation required. Monitor for neurological symptoms.",
        )
    } else if label.contains("Compression") || p > 0.35 {
        RegionAssessment::new(
            Severity::Moderate,
            "Cervical orthosis and pain management. Physical therapy after acute phase.",
        )
    } else {
        RegionAssessment::new(
            Severity::Low,
            "Conservative management with soft collar if symptomatic.",
        )
    };

    Ok(Recommendations {
        atlas,
        axis,
        subaxial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(class: FractureClass, p: f32) -> ProbabilityMap {
        let mut row = [0.0f32; FractureClass::COUNT];
        row[class.index()] = p;
        ProbabilityMap::from_row(&row).unwrap()
    }

    fn severities(recs: &Recommendations) -> Vec<Severity> {
        Region::ALL.iter().map(|r| recs.get(*r).severity).collect()
    }

    #[test]
    fn confident_jefferson_is_high_everywhere() {
        let probs = map_with(FractureClass::Jefferson, 0.8);
        let recs = recommend("Jefferson fracture", &probs).unwrap();
        assert_eq!(severities(&recs), vec![Severity::High; 3]);
    }

    #[test]
    fn no_fracture_is_low_everywhere() {
        let probs = map_with(FractureClass::NoFracture, 0.15);
        let recs = recommend("No fracture", &probs).unwrap();
        assert_eq!(severities(&recs), vec![Severity::Low; 3]);
        assert_eq!(
            recs.atlas.action,
            "Monitor for symptoms. No immediate intervention required."
        );
    }

    #[test]
    fn confident_no_fracture_still_trips_probability_thresholds() {
        let probs = map_with(FractureClass::NoFracture, 0.9);
        let recs = recommend("No fracture", &probs).unwrap();
        assert_eq!(severities(&recs), vec![Severity::High; 3]);
    }

    #[test]
    fn mock_compression_prediction() {
        let recs = recommend("Compression fracture", &ProbabilityMap::mock()).unwrap();
        assert_eq!(recs.atlas.severity, Severity::Low);
        assert_eq!(recs.axis.severity, Severity::Moderate);
        assert_eq!(recs.subaxial.severity, Severity::Moderate);
        assert_eq!(
            recs.axis.action,
            "Rigid cervical collar. Limit movement and schedule follow-up imaging."
        );
    }

    #[test]
    fn label_matches_override_low_probability() {
        let probs = map_with(FractureClass::Odontoid, 0.2);
        let recs = recommend("Odontoid fracture", &probs).unwrap();
        assert_eq!(
            severities(&recs),
            vec![Severity::Low, Severity::High, Severity::Low]
        );

        let probs = map_with(FractureClass::FlexionTeardrop, 0.2);
        let recs = recommend("Flexion teardrop fracture", &probs).unwrap();
        assert_eq!(recs.subaxial.severity, Severity::High);
        assert_eq!(recs.atlas.severity, Severity::Low);
    }

    #[test]
    fn moderate_band_between_thresholds() {
        let probs = map_with(FractureClass::FacetDislocation, 0.5);
        let recs = recommend("Facet dislocation", &probs).unwrap();
        assert_eq!(
            severities(&recs),
            vec![Severity::Moderate, Severity::Moderate, Severity::Moderate]
        );
    }

    #[test]
    fn unknown_or_empty_label_is_rejected() {
        let probs = ProbabilityMap::mock();
        assert!(matches!(
            recommend("", &probs),
            Err(AnalysisError::UnknownClass(_))
        ));
        assert!(recommend("burst fracture", &probs).is_err());
    }

    #[test]
    fn serializes_with_region_keys() {
        let recs = recommend("Burst fracture", &ProbabilityMap::mock()).unwrap();
        let json = serde_json::to_value(&recs).unwrap();
        assert_eq!(json["C3-C7"]["severity"], "High");
        assert_eq!(json["C1 (Atlas)"]["severity"], "Low");
        assert_eq!(json["C2 (Axis)"]["severity"], "Low");
    }
}
