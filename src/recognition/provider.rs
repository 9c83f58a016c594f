//! Client for the food recognition API (Calorie Mama compatible).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;

use super::dto::ScanImage;
use super::mapper::ProviderPayload;
use crate::error::RecognitionError;

#[async_trait]
pub trait RecognitionClient: Send + Sync {
    async fn recognize(&self, image: &ScanImage) -> Result<ProviderPayload, RecognitionError>;
}

#[derive(Clone)]
pub struct CalorieMamaClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl CalorieMamaClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("build recognition http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    error_detail: Option<String>,
}

#[async_trait]
impl RecognitionClient for CalorieMamaClient {
    async fn recognize(&self, image: &ScanImage) -> Result<ProviderPayload, RecognitionError> {
        let part = multipart::Part::bytes(image.body.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| RecognitionError::Http(e.to_string()))?;
        let form = multipart::Form::new().part("media", part);

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("user_key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| RecognitionError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .and_then(|d| d.error_detail)
                .unwrap_or_else(|| status.to_string());
            return Err(RecognitionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ProviderPayload>()
            .await
            .map_err(|e| RecognitionError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod provider_tests {
    use super::*;
    use bytes::Bytes;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn image() -> ScanImage {
        ScanImage {
            body: Bytes::from_static(b"\xff\xd8\xff\xe0fake-jpeg"),
            file_name: "lunch.jpg".into(),
            content_type: "image/jpeg".into(),
        }
    }

    fn client(server: &MockServer) -> CalorieMamaClient {
        let endpoint = format!("{}/v1/foodrecognition", server.uri());
        CalorieMamaClient::new(&endpoint, "test_key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_image_with_user_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/foodrecognition"))
            .and(query_param("user_key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "group": "Eggs", "items": [{ "name": "Omelette", "score": 90 }] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = client(&server).recognize(&image()).await.unwrap();
        let groups = payload.results.unwrap();
        assert_eq!(groups[0].items[0].name.as_deref(), Some("Omelette"));
    }

    #[tokio::test]
    async fn surfaces_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "code": 401, "errorDetail": "invalid user_key" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).recognize(&image()).await.unwrap_err();
        match err {
            RecognitionError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid user_key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_success_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client(&server).recognize(&image()).await.unwrap_err();
        assert!(matches!(err, RecognitionError::Decode(_)));
    }
}
