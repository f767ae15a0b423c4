//! Prescription prompt, post-processing and fallback template

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Section markers every prescription must contain
pub const REQUIRED_SECTIONS: [&str; 3] = ["PRESCRIPTION", "RECOMMENDATIONS", "PRECAUTIONS"];

/// Diagnoses containing any of these select the high-severity template
pub const HIGH_SEVERITY_KEYWORDS: [&str; 4] =
    ["Jefferson", "Burst", "Flexion teardrop", "Facet dislocation"];

const DEFAULT_ALLERGIES: &str = "None reported";
const DEFAULT_MEDICAL_HISTORY: &str = "No significant history";

const RULE: &str = "═══════════════════════════════════════════════════════════";

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("blank line pattern is valid"));

/// Patient-reported context supplied with an upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    pub allergies: String,
    pub medical_history: String,
}

impl PatientContext {
    pub fn new(allergies: impl Into<String>, medical_history: impl Into<String>) -> Self {
        Self {
            allergies: allergies.into(),
            medical_history: medical_history.into(),
        }
    }

    /// Allergies, or "None reported" when blank
    pub fn allergies_text(&self) -> &str {
        if self.allergies.is_empty() {
            DEFAULT_ALLERGIES
        } else {
            &self.allergies
        }
    }

    /// Medical history, or "No significant history" when blank
    pub fn medical_history_text(&self) -> &str {
        if self.medical_history.is_empty() {
            DEFAULT_MEDICAL_HISTORY
        } else {
            &self.medical_history
        }
    }
}

/// Sampling configuration sent with every generation request.
///
/// Prompt truncation is left to the endpoint; a text-generation request has
/// no parameter for an input token cap. Padding uses the model's
/// end-of-sequence token, which is the pipeline default for causal models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_length: u32,
    pub min_length: u32,
    pub num_return_sequences: u32,
    pub no_repeat_ngram_size: u32,
    pub do_sample: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 512,
            min_length: 150,
            num_return_sequences: 1,
            no_repeat_ngram_size: 3,
            do_sample: true,
            temperature: 0.8,
            top_p: 0.92,
            top_k: 50,
        }
    }
}

/// Build the generation prompt for a diagnosis
pub fn build_prompt(diagnosis: &str, patient: &PatientContext) -> String {
    format!(
        "Generate a detailed medical prescription for the following:

PATIENT INFORMATION:
- Diagnosis: {diagnosis}
- Known Allergies: {allergies}
- Medical History: {history}

Please provide a structured prescription with the following sections:

[PRESCRIPTION]
List specific medications with dosages, frequency, and duration.

[RECOMMENDATIONS]
Provide clinical recommendations for treatment and follow-up.

[PRECAUTIONS]
List important warnings and signs to watch for.

Use formal medical language and be specific.",
        allergies = patient.allergies_text(),
        history = patient.medical_history_text(),
    )
}

/// Collapse runs of blank lines into one and trim the result
pub fn clean_prescription_text(text: &str) -> String {
    BLANK_LINES.replace_all(text, "\n\n").trim().to_string()
}

/// Check that all required sections are present (case-insensitive)
pub fn validate_prescription(text: &str) -> bool {
    let upper = text.to_uppercase();
    REQUIRED_SECTIONS
        .iter()
        .all(|section| upper.contains(section))
}

pub fn is_high_severity(diagnosis: &str) -> bool {
    HIGH_SEVERITY_KEYWORDS
        .iter()
        .any(|keyword| diagnosis.contains(keyword))
}

/// Deterministic prescription used when generation is unavailable or invalid
pub fn fallback_prescription(diagnosis: &str, patient: &PatientContext) -> String {
    let high_severity = is_high_severity(diagnosis);
    let allergies = patient.allergies_text();
    let medical_history = patient.medical_history_text();

    let mut out = format!(
        "
{RULE}
                    MEDICAL PRESCRIPTION
{RULE}

DIAGNOSIS: {diagnosis}

PATIENT ALLERGIES: {allergies}

MEDICAL HISTORY: {medical_history}

{RULE}
[PRESCRIPTION]
{RULE}

• Acetaminophen 500mg: Take orally every 6 hours as needed for pain relief
  (Maximum daily dose: 4000mg/24 hours)

• Cyclobenzaprine 5-10mg: Take orally at bedtime for muscle spasm relief
  (Do not exceed 30mg/day)

"
    );

    if high_severity {
        out.push_str(
            "• Oxycodone 5mg: Take orally every 4-6 hours for severe pain management
  (Use only as directed by physician)

",
        );
    }

    out.push_str(&format!(
        "• Cervical Orthosis (Collar): Wear as directed for immobilization
  Duration: Minimum 6-8 weeks or as advised by specialist

• Omeprazole 20mg: Take once daily before breakfast to protect stomach
  (Prophylaxis while on pain medications)

{RULE}
[RECOMMENDATIONS]
{RULE}

"
    ));

    if high_severity {
        out.push_str(
            "• URGENT: Immediate referral to orthopedic spine surgeon
• Neurosurgical consultation within 24-48 hours
• Complete bed rest with cervical spine precautions
• Avoid any neck movement or rotation
• MRI of cervical spine if not already performed
• CT scan with 3D reconstruction recommended
• ICU monitoring if neurological symptoms present
• Serial neurological examinations every 4 hours
",
        );
    } else {
        out.push_str(
            "• Follow-up with orthopedic specialist within 1 week
• Cervical spine X-rays (flexion/extension views) in 2 weeks
• Physical therapy consultation after acute phase (4-6 weeks)
• Gradual return to activities as tolerated
• Sleep with cervical pillow for proper neck support
• Apply ice packs for 15-20 minutes every 2-3 hours (first 48 hours)
• After 48 hours, alternate with heat therapy
",
        );
    }

    out.push_str(&format!(
        "
• Avoid driving until cleared by physician
• No heavy lifting (>5 lbs) for minimum 6 weeks
• Maintain proper posture at all times
• Keep follow-up appointments as scheduled

{RULE}
[PRECAUTIONS]
{RULE}

⚠️ SEEK IMMEDIATE EMERGENCY CARE IF YOU EXPERIENCE:

• Sudden onset of weakness in arms or legs
• Numbness or tingling in extremities
• Loss of bladder or bowel control
• Difficulty breathing or shortness of breath
• Severe headache with neck stiffness
• Increasing neck pain despite medications
• Dizziness, loss of balance, or coordination problems
• Changes in vision or speech
• Fever above 101°F (38.3°C)

⚠️ MEDICATION PRECAUTIONS:

• Do not consume alcohol while taking pain medications
• Avoid operating machinery or driving if drowsy
• Take medications with food to reduce stomach upset
• Do not exceed prescribed dosages
"
    ));

    if !allergies.is_empty() && !allergies.eq_ignore_ascii_case(DEFAULT_ALLERGIES) {
        out.push_str(&format!(
            "• ALERT: Patient has documented allergies to: {allergies}\n"
        ));
    }

    out.push_str(&format!(
        "
• Keep all medications out of reach of children
• Store in a cool, dry place away from direct sunlight

{RULE}
FOLLOW-UP SCHEDULE
{RULE}

• Week 1: Orthopedic consultation
• Week 2: Imaging follow-up
• Week 4-6: Re-evaluation and physical therapy assessment
• Week 12: Final assessment for return to full activities

{RULE}

This prescription is valid for 30 days from date of issue.

NOTE: This is a preliminary prescription based on AI-assisted analysis.
Final treatment plan should be confirmed by a licensed physician after
complete clinical examination and review of all imaging studies.

{RULE}
"
    ));

    out
}
