use serde::{Deserialize, Serialize};

/// Status tag carried by every API response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Successful analysis response body
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeOutcome<T> {
    pub status: Status,
    pub file_url: String,
    pub analysis_results: T,
}

impl<T> AnalyzeOutcome<T> {
    pub fn success(file_url: impl Into<String>, analysis_results: T) -> Self {
        Self {
            status: Status::Success,
            file_url: file_url.into(),
            analysis_results,
        }
    }
}

/// Error response body: `{"status": "error", "error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorOutcome {
    pub status: Status,
    pub error: String,
}

impl ErrorOutcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let json = serde_json::to_value(ErrorOutcome::new("No file part")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "error", "error": "No file part"}));
    }

    #[test]
    fn success_envelope_shape() {
        let json = serde_json::to_value(AnalyzeOutcome::success("/uploads/a.png", 1)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["file_url"], "/uploads/a.png");
        assert_eq!(json["analysis_results"], 1);
    }
}
