//! spine-core: Shared types and rules for cervical spine fracture analysis
//!
//! This crate holds the fracture class table, the per-vertebra
//! recommendation rules, the prescription prompt and fallback template,
//! and the response envelopes used by the server.

pub mod analysis;
pub mod error;
pub mod fracture;
pub mod outcome;
pub mod prescription;
pub mod recommendation;

pub use analysis::AnalysisResult;
pub use error::AnalysisError;
pub use fracture::{FractureClass, Prediction, ProbabilityMap, TopPrediction};
pub use outcome::{AnalyzeOutcome, ErrorOutcome, Status};
pub use prescription::{
    GenerationParams, PatientContext, build_prompt, clean_prescription_text,
    fallback_prescription, validate_prescription,
};
pub use recommendation::{Recommendations, Region, RegionAssessment, Severity, recommend};
