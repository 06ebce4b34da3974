//! OCR using the Google Cloud Vision REST API (`images:annotate` with `TEXT_DETECTION`).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{OcrEngine, OcrError};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com";

/// OCR engine calling Cloud Vision with an API key.
pub struct VisionOcrEngine {
    http: reqwest::Client,
    annotate_url: Url,
    api_key: String,
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 1],
}

#[derive(Serialize)]
struct ImageContent {
    /// Base64 encoded image bytes
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnnotateResponse {
    responses: Vec<AnnotateImageResponse>,
    /// Top-level error, present on non-2xx responses
    error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TextAnnotation {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Status {
    code: i32,
    message: String,
}

impl VisionOcrEngine {
    pub fn new(mut endpoint: Url, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        // `join` replaces the last path segment unless the base ends with `/`
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        let annotate_url = endpoint.join("v1/images:annotate")?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            annotate_url,
            api_key,
        })
    }
}

/// Turn a decoded response body into extracted text or the service's error.
fn interpret(status: reqwest::StatusCode, body: AnnotateResponse) -> Result<String, OcrError> {
    if let Some(error) = body.error {
        return Err(OcrError::Service { message: error.message });
    }
    if !status.is_success() {
        return Err(OcrError::Service {
            message: format!("Vision API returned {status}"),
        });
    }

    let Some(response) = body.responses.into_iter().next() else {
        return Err(OcrError::Other(anyhow::anyhow!("Vision API returned no annotation for the image")));
    };

    match response.error {
        Some(error) if !error.message.is_empty() => {
            tracing::debug!(code = error.code, "Vision API rejected image");
            Err(OcrError::Service { message: error.message })
        }
        _ => Ok(response.full_text_annotation.map(|a| a.text).unwrap_or_default()),
    }
}

#[async_trait]
impl OcrEngine for VisionOcrEngine {
    fn name(&self) -> &'static str {
        "vision"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(bytes = image.len()))]
    async fn detect_text(&self, image: &[u8]) -> Result<String, OcrError> {
        let request = AnnotateRequest {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: [Feature { kind: "TEXT_DETECTION" }],
            }],
        };

        let response = self
            .http
            .post(self.annotate_url.clone())
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::Other(anyhow::anyhow!("Vision API request failed: {e}")))?;

        let status = response.status();
        let body: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Other(anyhow::anyhow!("Failed to decode Vision API response ({status}): {e}")))?;

        interpret(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_for(server: &MockServer) -> VisionOcrEngine {
        let endpoint = Url::parse(&server.uri()).unwrap();
        VisionOcrEngine::new(endpoint, "test-key".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_detect_text_returns_full_text_annotation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "requests": [{
                    "image": { "content": STANDARD.encode(b"png-bytes") },
                    "features": [{ "type": "TEXT_DETECTION" }]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [{
                    "textAnnotations": [{ "description": "HELLO\n" }],
                    "fullTextAnnotation": { "text": "HELLO\n" }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = engine_for(&server).detect_text(b"png-bytes").await.unwrap();
        assert_eq!(text, "HELLO\n");
    }

    #[tokio::test]
    async fn test_endpoint_path_prefix_is_kept_without_trailing_slash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vision/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [{ "fullTextAnnotation": { "text": "PROXIED" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        for endpoint in [format!("{}/vision", server.uri()), format!("{}/vision/", server.uri())] {
            let engine =
                VisionOcrEngine::new(Url::parse(&endpoint).unwrap(), "test-key".to_string(), Duration::from_secs(5)).unwrap();
            assert_eq!(engine.annotate_url.path(), "/vision/v1/images:annotate");
        }

        let endpoint = Url::parse(&format!("{}/vision", server.uri())).unwrap();
        let engine = VisionOcrEngine::new(endpoint, "test-key".to_string(), Duration::from_secs(5)).unwrap();
        assert_eq!(engine.detect_text(b"png-bytes").await.unwrap(), "PROXIED");
    }

    #[tokio::test]
    async fn test_detect_text_without_text_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "responses": [{}] })))
            .mount(&server)
            .await;

        let text = engine_for(&server).detect_text(b"blank").await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_per_image_error_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [{ "error": { "code": 3, "message": "Bad image data." } }]
            })))
            .mount(&server)
            .await;

        let err = engine_for(&server).detect_text(b"not-an-image").await.unwrap_err();
        match err {
            OcrError::Service { message } => assert_eq!(message, "Bad image data."),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_api_key_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = engine_for(&server).detect_text(b"png").await.unwrap_err();
        assert!(matches!(err, OcrError::Service { ref message } if message.starts_with("API key not valid")));
    }

    #[test]
    fn test_interpret_non_success_without_error_body() {
        let err = interpret(reqwest::StatusCode::BAD_GATEWAY, AnnotateResponse::default()).unwrap_err();
        assert!(matches!(err, OcrError::Service { ref message } if message.contains("502")));
    }
}
