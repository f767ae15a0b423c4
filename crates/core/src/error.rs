use thiserror::Error;

/// Failures while turning a classifier output into an analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unknown dictionary structure in model output: {0}")]
    UnrecognizedOutput(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("No fracture class received a positive probability")]
    NoPositiveProbability,

    #[error("Unknown fracture class: {0}")]
    UnknownClass(String),
}
