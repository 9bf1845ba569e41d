//! Client for the test generator backend's REST API.

use std::time::Duration;

use async_trait::async_trait;
use engine_logging::{engine_debug, engine_warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use testgen_core::{ExportRequest, LlmConfig, TestCase, TestCasePatch};
use thiserror::Error;

use crate::mock_data;
use crate::uploads::LoadedFile;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Failure reported by the API, already phrased for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, when the server answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub test_case_count: u32,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn health(&self) -> Result<StatusReply, ApiError>;
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;
    async fn create_project(&self, name: &str, description: &str) -> Result<Project, ApiError>;
    async fn get_config(&self) -> Result<LlmConfig, ApiError>;
    async fn save_config(&self, config: &LlmConfig) -> Result<Value, ApiError>;
    async fn test_connection(&self) -> Result<StatusReply, ApiError>;
    async fn upload_files(&self, project_id: &str, files: Vec<LoadedFile>)
        -> Result<Value, ApiError>;
    async fn list_test_cases(&self, project_id: &str) -> Result<Vec<TestCase>, ApiError>;
    async fn update_test_case(&self, id: &str, patch: &TestCasePatch) -> Result<Value, ApiError>;
    async fn delete_test_case(&self, id: &str) -> Result<Value, ApiError>;
    /// Returns the exported file body as produced by the backend.
    async fn export_test_cases(&self, request: &ExportRequest) -> Result<Vec<u8>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    /// Serve canned data when the backend cannot be reached.
    pub use_mock_fallback: bool,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            use_mock_fallback: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of one call before mock fallback is considered.
enum CallError {
    /// No HTTP exchange happened.
    Network(String),
    Api(ApiError),
}

impl From<CallError> for ApiError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Network(message) => ApiError::network(message),
            CallError::Api(err) => err,
        }
    }
}

pub struct HttpBackend {
    client: reqwest::Client,
    settings: ApiSettings,
}

impl HttpBackend {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::network(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.settings.base_url.trim_end_matches('/'))
    }

    async fn call_raw(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, CallError> {
        let url = reqwest::Url::parse(&self.url(endpoint))
            .map_err(|err| CallError::Network(format!("invalid API url: {err}")))?;
        engine_debug!("{method} {url}");
        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| CallError::Network(err.to_string()))?;
        read_body(response).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, CallError> {
        let bytes = self.call_raw(method, endpoint, body).await?;
        decode(&bytes)
    }

    /// Network failures fall back to `mock` when enabled; HTTP errors never do.
    fn or_mock<T>(
        &self,
        endpoint: &str,
        result: Result<T, CallError>,
        mock: impl FnOnce() -> T,
    ) -> Result<T, ApiError> {
        match result {
            Err(CallError::Network(reason)) if self.settings.use_mock_fallback => {
                engine_warn!("{endpoint} unreachable ({reason}); serving mock data");
                Ok(mock())
            }
            other => other.map_err(ApiError::from),
        }
    }
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, CallError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CallError::Network(err.to_string()))?;
    if status.is_success() {
        Ok(bytes.to_vec())
    } else {
        Err(CallError::Api(error_from_body(status, &bytes)))
    }
}

fn error_from_body(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));
    ApiError {
        status: Some(status.as_u16()),
        message,
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CallError> {
    serde_json::from_slice(bytes).map_err(|err| {
        CallError::Api(ApiError {
            status: None,
            message: format!("invalid response body: {err}"),
        })
    })
}

fn encode(value: &impl Serialize) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(value).map_err(|err| ApiError::network(err.to_string()))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn health(&self) -> Result<StatusReply, ApiError> {
        let result = self.call::<StatusReply>(Method::GET, "/health", None).await;
        self.or_mock("/health", result, mock_data::health)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let result = self.call::<Vec<Project>>(Method::GET, "/projects", None).await;
        self.or_mock("/projects", result, mock_data::projects)
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Project, ApiError> {
        let body = encode(&serde_json::json!({ "name": name, "description": description }))?;
        let result = self.call::<Project>(Method::POST, "/projects", Some(body)).await;
        self.or_mock("/projects", result, || {
            mock_data::created_project(chrono::Utc::now().to_rfc3339())
        })
    }

    async fn get_config(&self) -> Result<LlmConfig, ApiError> {
        let result = self.call::<LlmConfig>(Method::GET, "/config", None).await;
        self.or_mock("/config", result, mock_data::config)
    }

    async fn save_config(&self, config: &LlmConfig) -> Result<Value, ApiError> {
        let body = encode(config)?;
        let result = self.call::<Value>(Method::POST, "/config", Some(body)).await;
        self.or_mock("/config", result, mock_data::empty)
    }

    async fn test_connection(&self) -> Result<StatusReply, ApiError> {
        let result = self
            .call::<StatusReply>(Method::POST, "/config/test-connection", None)
            .await;
        self.or_mock("/config/test-connection", result, mock_data::connection)
    }

    async fn upload_files(
        &self,
        project_id: &str,
        files: Vec<LoadedFile>,
    ) -> Result<Value, ApiError> {
        let url = reqwest::Url::parse_with_params(&self.url("/upload"), &[("project_id", project_id)])
            .map_err(|err| ApiError::network(format!("invalid API url: {err}")))?;
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str(&file.mime_type)
                .map_err(|err| ApiError::network(err.to_string()))?;
            form = form.part("files", part);
        }
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| ApiError::network(err.to_string()))?;
        let bytes = read_body(response).await?;
        Ok(decode::<Value>(&bytes)?)
    }

    async fn list_test_cases(&self, project_id: &str) -> Result<Vec<TestCase>, ApiError> {
        let endpoint = format!("/projects/{project_id}/test-cases");
        let result = self.call::<Vec<TestCase>>(Method::GET, &endpoint, None).await;
        match result {
            Err(CallError::Network(reason)) if self.settings.use_mock_fallback => {
                engine_warn!("{endpoint} unreachable ({reason}); serving sample test cases");
                mock_data::test_cases().map_err(|err| ApiError::network(err.to_string()))
            }
            other => other.map_err(ApiError::from),
        }
    }

    async fn update_test_case(&self, id: &str, patch: &TestCasePatch) -> Result<Value, ApiError> {
        let body = encode(patch)?;
        let endpoint = format!("/test-cases/{id}");
        Ok(self.call::<Value>(Method::PUT, &endpoint, Some(body)).await?)
    }

    async fn delete_test_case(&self, id: &str) -> Result<Value, ApiError> {
        let endpoint = format!("/test-cases/{id}");
        Ok(self.call::<Value>(Method::DELETE, &endpoint, None).await?)
    }

    async fn export_test_cases(&self, request: &ExportRequest) -> Result<Vec<u8>, ApiError> {
        let body = encode(request)?;
        let url = reqwest::Url::parse(&self.url("/export"))
            .map_err(|err| ApiError::network(format!("invalid API url: {err}")))?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, request.format.mime_type())
            .body(body)
            .send()
            .await
            .map_err(|err| ApiError::network(err.to_string()))?;
        Ok(read_body(response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_message_wins() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            br#"{"message":"Project not found"}"#,
        );
        assert_eq!(err.message, "Project not found");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn status_is_used_without_message() {
        let err = error_from_body(StatusCode::INTERNAL_SERVER_ERROR, b"oops");
        assert_eq!(err.to_string(), "HTTP error 500");
    }
}
