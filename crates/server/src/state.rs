//! Shared application state

use std::sync::Arc;

use crate::ai::{TextGenerationClient, TextGenerator};
use crate::config::Config;
use crate::inference::{FractureClassifier, OnnxClassifier};
use crate::storage::UploadStore;

/// State shared by all handlers.
///
/// Model handles are resolved once at startup and never change; `None`
/// means the model failed to load or is not configured.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Option<Arc<dyn FractureClassifier>>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub uploads: UploadStore,
}

impl AppState {
    /// State with no models loaded
    pub fn new(uploads: UploadStore) -> Self {
        Self {
            classifier: None,
            generator: None,
            uploads,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FractureClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Load both models as configured, logging and skipping any that fail
    pub fn load(config: &Config) -> Self {
        let mut state = Self::new(UploadStore::new(config.upload_folder.clone()));

        match OnnxClassifier::load(&config.classifier_model_path) {
            Ok(classifier) => {
                tracing::info!(
                    path = %config.classifier_model_path.display(),
                    outputs = ?classifier.output_names(),
                    "Classifier loaded"
                );
                state = state.with_classifier(Arc::new(classifier));
            }
            Err(e) => {
                tracing::error!(
                    path = %config.classifier_model_path.display(),
                    error = %e,
                    "Error loading classifier, serving mock predictions"
                );
            }
        }

        match &config.language_model_url {
            Some(url) => {
                let client = TextGenerationClient::new(
                    url.clone(),
                    config.language_model_name.clone(),
                    config.language_model_token.clone(),
                    config.language_model_timeout,
                );
                tracing::info!(model = client.model(), url = %url, "Language model configured");
                state = state.with_generator(Arc::new(client));
            }
            None => {
                tracing::warn!("LANGUAGE_MODEL_URL not set, prescriptions use the fallback template");
            }
        }

        state
    }
}
