//! Radiograph analysis endpoint

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Query, State, multipart::MultipartRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use spine_core::{AnalysisResult, AnalyzeOutcome, PatientContext};

use crate::ai::compose_prescription;
use crate::error::AppError;
use crate::inference::{predict, preprocess_image};
use crate::state::AppState;
use crate::storage::{UploadStore, allowed_file, secure_filename};

/// Query parameters for analysis
#[derive(Debug, Deserialize, Default)]
pub struct AnalyzeParams {
    pub include_prescription: Option<String>,
}

impl AnalyzeParams {
    fn include_prescription(&self) -> bool {
        self.include_prescription
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// Parts of the multipart form the handler cares about
#[derive(Default)]
struct AnalyzeForm {
    file: Option<(String, Bytes)>,
    patient: PatientContext,
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, AppError> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") if form.file.is_none() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some((filename, bytes));
            }
            Some("allergies") => {
                form.patient.allergies = field.text().await?.trim().to_string();
            }
            Some("medical_history") => {
                form.patient.medical_history = field.text().await?.trim().to_string();
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/analyze - Classify an uploaded radiograph
///
/// Stores the upload, runs preprocessing and classification on the blocking
/// pool, derives region recommendations and, when `include_prescription=true`,
/// composes a prescription.
pub async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let multipart = multipart.map_err(|_| AppError::BadRequest("No file part".to_string()))?;
    let form = read_form(multipart).await?;

    let (filename, bytes) = form
        .file
        .ok_or_else(|| AppError::BadRequest("No file part".to_string()))?;
    if filename.is_empty() {
        return Err(AppError::BadRequest("No selected file".to_string()));
    }

    let include_prescription = params.include_prescription();
    tracing::info!(
        filename = %filename,
        size = bytes.len(),
        include_prescription,
        "Received analysis request"
    );
    tracing::debug!(
        allergies = %form.patient.allergies,
        medical_history = %form.patient.medical_history,
        "Patient context"
    );

    if !allowed_file(&filename) {
        return Err(AppError::BadRequest("File type not allowed".to_string()));
    }

    let stored_name = secure_filename(&filename);
    if stored_name.is_empty() {
        return Err(AppError::BadRequest("No selected file".to_string()));
    }
    let path = state.uploads.save(&stored_name, &bytes).await?;

    let classifier = state.classifier.clone();
    let prediction = tokio::task::spawn_blocking(move || {
        let input = preprocess_image(&path)?;
        predict(classifier.as_deref(), &input)
    })
    .await??;

    let mut results = AnalysisResult::from_prediction(&prediction)?;
    tracing::info!(
        top_class = %prediction.top.class,
        probability = prediction.top.probability,
        overall_risk = results.overall_fracture_risk,
        "Analysis complete"
    );

    if include_prescription {
        let diagnosis = prediction.top.diagnosis();
        tracing::info!(diagnosis = %diagnosis, "Generating prescription");

        let prescription =
            compose_prescription(state.generator.as_deref(), &diagnosis, &form.patient).await;
        tracing::info!(source = prescription.source.as_str(), "Prescription composed");
        results = results.with_prescription(prescription.text);
    }

    Ok(Json(AnalyzeOutcome::success(
        UploadStore::url_for(&stored_name),
        results,
    )))
}
