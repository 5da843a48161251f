use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const INFERENCE_TIMEOUT: Duration = Duration::from_secs(60);
const WARM_UP_TEXT: &str = "Ada Lovelace worked with Charles Babbage in London.";

#[derive(Debug, Error)]
pub enum NerError {
    /// Request, body included, exceeded its timeout
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
}

/// One recognized named entity, with character offsets into the input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_group: String,
    pub score: f64,
    pub word: String,
    pub start: u64,
    pub end: u64,
}

/// Named-entity recognition over English text.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<Entity>, NerError>;
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    aggregation_strategy: &'static str,
}

/// Token-classification client for a Hugging Face style inference endpoint
/// (`POST {endpoint}/{model}`), with sub-word tokens grouped into entities.
pub struct InferenceNer {
    client: reqwest::Client,
    model_url: String,
    api_token: Option<SecretString>,
    timeout: Duration,
}

impl InferenceNer {
    /// Resolves the model endpoint and runs one warm-up request so the model
    /// is loaded before the first feed is processed.
    ///
    /// # Errors
    ///
    /// Returns the warm-up request's error. Callers treat this as fatal.
    pub async fn load(
        client: reqwest::Client,
        endpoint: &str,
        model: &str,
        api_token: Option<&str>,
    ) -> Result<Self, NerError> {
        let ner = Self {
            client,
            model_url: format!("{}/{}", endpoint.trim_end_matches('/'), model),
            api_token: api_token.map(|t| SecretString::from(t.to_owned())),
            timeout: INFERENCE_TIMEOUT,
        };

        let warm = ner.extract(WARM_UP_TEXT).await?;
        tracing::info!(model = %model, entities = warm.len(), "Loaded NER model");
        Ok(ner)
    }
}

#[async_trait]
impl EntityExtractor for InferenceNer {
    async fn extract(&self, text: &str) -> Result<Vec<Entity>, NerError> {
        let body = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                aggregation_strategy: "simple",
            },
        };

        let mut request = self.client.post(&self.model_url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let call = async {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(NerError::HttpStatus(response.status().as_u16()));
            }
            Ok(response.json().await?)
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| NerError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "dbmdz/bert-large-cased-finetuned-conll03-english";

    fn entities_json() -> serde_json::Value {
        serde_json::json!([
            {"entity_group": "PER", "score": 0.998, "word": "Ada Lovelace", "start": 0, "end": 12},
            {"entity_group": "LOC", "score": 0.9991, "word": "London", "start": 44, "end": 50}
        ])
    }

    #[tokio::test]
    async fn test_load_warms_up_and_extracts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{}", MODEL)))
            .and(body_partial_json(serde_json::json!({
                "parameters": {"aggregation_strategy": "simple"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(entities_json()))
            .expect(2)
            .mount(&server)
            .await;

        let ner = InferenceNer::load(reqwest::Client::new(), &server.uri(), MODEL, None)
            .await
            .unwrap();
        let entities = ner.extract("Ada Lovelace lived in London").await.unwrap();

        assert_eq!(
            entities[0],
            Entity {
                entity_group: "PER".into(),
                score: 0.998,
                word: "Ada Lovelace".into(),
                start: 0,
                end: 12,
            }
        );
        assert_eq!(entities.len(), 2);
    }

    #[tokio::test]
    async fn test_api_token_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer hf_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        InferenceNer::load(reqwest::Client::new(), &server.uri(), MODEL, Some("hf_token"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_load_fails_when_model_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = InferenceNer::load(reqwest::Client::new(), &server.uri(), MODEL, None).await;
        assert!(matches!(result, Err(NerError::HttpStatus(503))));
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let uri = crate::util::serve_stalled_body().await;
        let ner = InferenceNer {
            client: reqwest::Client::new(),
            model_url: format!("{}/{}", uri, MODEL),
            api_token: None,
            timeout: Duration::from_millis(300),
        };

        let started = std::time::Instant::now();
        let result = ner.extract("Ada Lovelace lived in London").await;
        assert!(matches!(result, Err(NerError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_entity_serializes_numbers() {
        let entity = Entity {
            entity_group: "ORG".into(),
            score: 0.5,
            word: "ACME".into(),
            start: 3,
            end: 7,
        };
        let value = serde_json::to_value(&entity).unwrap();
        assert!(value["score"].is_f64());
        assert!(value["start"].is_u64());
        assert_eq!(value["end"], 7);
    }
}
