use crate::engine::config::{ClientConfig, SessionContext};
use crate::engine::error::{FormflowError, Result};
use crate::engine::poll::status::{SubmittedTask, TaskProgress};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::{
    Client, RequestBuilder, Response,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Backend operations the poller depends on
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Submit a job and return its task id
    async fn submit(&self, path: &str, body: &Value) -> Result<String>;

    /// Fetch the current progress envelope of a task
    async fn fetch_progress(&self, task_id: &str) -> Result<TaskProgress>;
}

/// REST client for job submission and task status.
///
/// Every request carries the session's bearer token and, when set, the
/// organization header.
pub struct HttpTaskClient {
    client: Client,
    config: ClientConfig,
}

impl HttpTaskClient {
    pub fn new(config: ClientConfig, session: &SessionContext) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::try_from(format!("Bearer {}", session.token))
            .map_err(|e| FormflowError::Config(format!("Invalid bearer token: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        if let Some(org) = &session.org_slug {
            let name = HeaderName::try_from(config.org_header.as_str()).map_err(|e| {
                FormflowError::Config(format!(
                    "Invalid header name '{}': {e}",
                    config.org_header
                ))
            })?;
            let value = HeaderValue::try_from(org.as_str())
                .map_err(|e| FormflowError::Config(format!("Invalid org slug '{org}': {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| FormflowError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET a JSON document relative to the base URL
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.url(path);
        self.send_json(self.client.get(&url), &url).await
    }

    /// POST a JSON body relative to the base URL
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = self.config.url(path);
        self.send_json(self.client.post(&url).json(body), &url).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        debug!("Sending request to {url}");
        let response = request.send().await.map_err(map_transport_error)?;
        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Unexpected response shape from {url}: {e}");
            FormflowError::Deserialization(format!("Unexpected response from {url}: {e}"))
        })
    }
}

#[async_trait]
impl TaskBackend for HttpTaskClient {
    async fn submit(&self, path: &str, body: &Value) -> Result<String> {
        let submitted: SubmittedTask = self.post_json(path, body).await?;
        debug!("Submitted job to {path}, task id {}", submitted.task_id);
        Ok(submitted.task_id)
    }

    async fn fetch_progress(&self, task_id: &str) -> Result<TaskProgress> {
        let url = self.config.status_url(task_id);
        self.send_json(self.client.get(&url), &url).await
    }
}

fn map_transport_error(e: reqwest::Error) -> FormflowError {
    if e.is_timeout() {
        FormflowError::Timeout(format!("HTTP request timed out: {e}"))
    } else if e.is_connect() {
        FormflowError::http(0, format!("Connection error: {e}"))
    } else {
        FormflowError::http(
            e.status().map_or(0, |s| s.as_u16()),
            format!("HTTP request failed: {e}"),
        )
    }
}

/// Read the body of a 2xx response, or turn a non-2xx into an `Http` error
/// carrying the backend's `detail` message
async fn read_success_body(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| {
        FormflowError::http(status.as_u16(), format!("Failed to read response body: {e}"))
    })?;

    if status.is_success() {
        return Ok(body);
    }

    let message = error_detail(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });
    error!("Backend returned {status}: {message}");
    Err(FormflowError::http(status.as_u16(), message))
}

fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(
            error_detail(r#"{"detail": "Warehouse not configured"}"#),
            Some("Warehouse not configured".to_string())
        );
        assert_eq!(
            error_detail(r#"{"detail": [{"msg": "field required"}]}"#),
            Some(r#"[{"msg":"field required"}]"#.to_string())
        );
        assert_eq!(error_detail("<html>502</html>"), None);
        assert_eq!(error_detail(r#"{"error": "x"}"#), None);
    }

    #[test]
    fn test_client_rejects_invalid_session() {
        let config = ClientConfig::new("http://localhost:8002/api");
        assert!(HttpTaskClient::new(config.clone(), &SessionContext::new("tok\nen")).is_err());

        let mut bad_header = config.clone();
        bad_header.org_header = "bad header".to_string();
        let session = SessionContext::new("token").with_org("acme");
        assert!(HttpTaskClient::new(bad_header, &session).is_err());

        assert!(HttpTaskClient::new(config, &session).is_ok());
    }
}
