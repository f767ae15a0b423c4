//! Prescription generation with a deterministic fallback

use spine_core::{
    GenerationParams, PatientContext, build_prompt, clean_prescription_text,
    fallback_prescription, validate_prescription,
};

use super::client::TextGenerator;

/// Where a prescription's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrescriptionSource {
    Generated,
    Fallback,
}

impl PrescriptionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PrescriptionSource::Generated => "generated",
            PrescriptionSource::Fallback => "fallback",
        }
    }
}

/// A composed prescription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prescription {
    pub text: String,
    pub source: PrescriptionSource,
}

impl Prescription {
    fn fallback(diagnosis: &str, patient: &PatientContext) -> Self {
        Self {
            text: fallback_prescription(diagnosis, patient),
            source: PrescriptionSource::Fallback,
        }
    }
}

/// Compose a prescription for `diagnosis`.
///
/// Generation errors and outputs missing a required section never fail the
/// request; they fall back to the fixed template.
pub async fn compose_prescription(
    generator: Option<&dyn TextGenerator>,
    diagnosis: &str,
    patient: &PatientContext,
) -> Prescription {
    let prescription = match generator {
        None => {
            tracing::info!("Language model not available, using fallback prescription");
            Prescription::fallback(diagnosis, patient)
        }
        Some(generator) => {
            let prompt = build_prompt(diagnosis, patient);
            match generator.generate(&prompt, &GenerationParams::default()).await {
                Ok(raw) => {
                    let cleaned = clean_prescription_text(&raw);
                    if validate_prescription(&cleaned) {
                        Prescription {
                            text: cleaned,
                            source: PrescriptionSource::Generated,
                        }
                    } else {
                        tracing::warn!("Generated prescription is missing required sections, using fallback");
                        Prescription::fallback(diagnosis, patient)
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Prescription generation failed, using fallback");
                    Prescription::fallback(diagnosis, patient)
                }
            }
        }
    };

    metrics::counter!(
        "analysis_prescriptions_total",
        "source" => prescription.source.as_str()
    )
    .increment(1);

    prescription
}
