//! Client for a hosted causal language model text-generation endpoint

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spine_core::GenerationParams;
use thiserror::Error;

/// Errors from a text-generation backend
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Language model error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("No generated text in response")]
    Empty,
}

/// A loaded causal language model: prompt in, decoded sequence out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;
}

/// Client for a text-generation inference endpoint
#[derive(Clone)]
pub struct TextGenerationClient {
    http: reqwest::Client,
    url: String,
    model: String,
    token: Option<String>,
}

/// Request body: `{"inputs": ..., "parameters": {...}}`
#[derive(Serialize)]
struct ApiRequest<'a> {
    inputs: &'a str,
    parameters: ApiParameters,
    options: ApiOptions,
}

/// Sampling parameters in the endpoint's naming.
///
/// Only keys the pipeline forwards to `generate` as valid keyword arguments
/// belong here; unknown keys make the endpoint reject the whole request.
#[derive(Serialize)]
struct ApiParameters {
    /// Truncate over-long prompts to the model's context
    truncation: bool,
    max_length: u32,
    min_length: u32,
    num_return_sequences: u32,
    no_repeat_ngram_size: u32,
    do_sample: bool,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    /// Causal models decode the prompt together with the continuation
    return_full_text: bool,
}

impl From<&GenerationParams> for ApiParameters {
    fn from(params: &GenerationParams) -> Self {
        Self {
            truncation: true,
            max_length: params.max_length,
            min_length: params.min_length,
            num_return_sequences: params.num_return_sequences,
            no_repeat_ngram_size: params.no_repeat_ngram_size,
            do_sample: params.do_sample,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            return_full_text: true,
        }
    }
}

#[derive(Serialize)]
struct ApiOptions {
    wait_for_model: bool,
}

/// Generated sequence
#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Response is either a list of sequences or a single one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
}

/// Error detail returned by the endpoint
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

impl TextGenerationClient {
    /// Create a client for the endpoint at `url` serving `model`
    pub fn new(url: String, model: String, token: Option<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            url,
            model,
            token,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for TextGenerationClient {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let request = ApiRequest {
            inputs: prompt,
            parameters: params.into(),
            options: ApiOptions {
                wait_for_model: true,
            },
        };

        let mut builder = self.http.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(GenerationError::Api { status, message });
        }

        let text = match response.json::<ApiResponse>().await? {
            ApiResponse::Batch(sequences) => sequences.into_iter().next(),
            ApiResponse::Single(sequence) => Some(sequence),
        };

        text.map(|t| t.generated_text)
            .ok_or(GenerationError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_fixed_sampling_parameters() {
        let params = GenerationParams::default();
        let request = ApiRequest {
            inputs: "prompt",
            parameters: (&params).into(),
            options: ApiOptions {
                wait_for_model: true,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputs"], "prompt");
        assert_eq!(json["parameters"]["max_length"], 512);
        assert_eq!(json["parameters"]["min_length"], 150);
        assert_eq!(json["parameters"]["num_return_sequences"], 1);
        assert_eq!(json["parameters"]["no_repeat_ngram_size"], 3);
        assert_eq!(json["parameters"]["top_k"], 50);
        assert_eq!(json["parameters"]["do_sample"], true);
        assert_eq!(json["parameters"]["truncation"], true);
        assert_eq!(json["parameters"]["return_full_text"], true);
        assert!((json["parameters"]["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
        assert!((json["parameters"]["top_p"].as_f64().unwrap() - 0.92).abs() < 1e-6);
    }

    #[test]
    fn request_omits_keys_generate_would_reject() {
        let params = GenerationParams::default();
        let json = serde_json::to_value(ApiParameters::from(&params)).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(!keys.contains(&"pad_token"));
        assert!(!keys.contains(&"max_input_length"));

        let mut expected = vec![
            "do_sample",
            "max_length",
            "min_length",
            "no_repeat_ngram_size",
            "num_return_sequences",
            "return_full_text",
            "temperature",
            "top_k",
            "top_p",
            "truncation",
        ];
        let mut actual = keys.clone();
        expected.sort_unstable();
        actual.sort_unstable();
        assert_eq!(actual, expected);
    }

    #[test]
    fn parses_both_response_shapes() {
        let batch: ApiResponse =
            serde_json::from_str(r#"[{"generated_text": "a"}, {"generated_text": "b"}]"#).unwrap();
        assert!(matches!(batch, ApiResponse::Batch(ref v) if v[0].generated_text == "a"));

        let single: ApiResponse = serde_json::from_str(r#"{"generated_text": "c"}"#).unwrap();
        assert!(matches!(single, ApiResponse::Single(ref t) if t.generated_text == "c"));
    }
}
