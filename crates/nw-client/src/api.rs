//! HTTP client for the NeverWrite API and presigned storage URLs.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use nw_models::{
    ErrorBody, MarkdownUrlRequest, MarkdownUrlResponse, UploadKey, UploadUrlRequest,
    UploadUrlResponse, UseFeatureResponse,
};

use crate::config::{parse_api_url, ClientConfig};
use crate::error::{ClientError, ClientResult};

/// Answer of the usage gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaStatus {
    /// Attempt recorded; `count` when the server reported it.
    Granted { count: Option<u32> },
    /// Free tier used up.
    Exceeded,
}

/// Remote operations one generation attempt needs.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Count one attempt against the session quota.
    async fn check_quota(&self) -> ClientResult<QuotaStatus>;

    /// Obtain a presigned PUT for `file_name`.
    async fn acquire_upload(
        &self,
        file_name: &str,
        mime_type: &str,
    ) -> ClientResult<UploadUrlResponse>;

    /// PUT the raw file bytes to a presigned URL.
    async fn upload(&self, upload_url: &str, mime_type: &str, bytes: Vec<u8>) -> ClientResult<()>;

    /// Obtain a read URL for the document of `stem`; `None` while not ready.
    async fn acquire_read(&self, stem: &str) -> ClientResult<Option<String>>;

    /// Download a generated document.
    async fn fetch_document(&self, url: &str) -> ClientResult<String>;
}

/// Client for the NeverWrite API.
///
/// API calls share a cookie store so the `sessionId` minted on first contact
/// is sent on every later call. Uploads go through a separate client without
/// cookies and with a longer timeout.
pub struct ApiClient {
    http: Client,
    upload_http: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = parse_api_url(&config.api_url)?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()?;

        let upload_http = Client::builder().timeout(config.upload_timeout).build()?;

        Ok(Self {
            http,
            upload_http,
            base_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(&ClientConfig::from_env())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }
}

/// Server-provided error message, falling back to the raw body.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(error) => error.message,
        Err(_) if !body.trim().is_empty() => body,
        Err(_) => status.to_string(),
    }
}

async fn into_status_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    ClientError::status(status, error_message(response).await)
}

#[async_trait]
impl GenerationBackend for ApiClient {
    async fn check_quota(&self) -> ClientResult<QuotaStatus> {
        let response = self.http.post(self.endpoint("api/use-feature")?).send().await?;

        if response.status() == StatusCode::FORBIDDEN {
            return Ok(QuotaStatus::Exceeded);
        }
        if !response.status().is_success() {
            return Err(into_status_error(response).await);
        }

        let count = match response.json::<UseFeatureResponse>().await {
            Ok(body) => {
                debug!(message = %body.message, "Usage recorded");
                body.count
            }
            Err(e) => {
                warn!("Unexpected use-feature body: {}", e);
                None
            }
        };
        Ok(QuotaStatus::Granted { count })
    }

    async fn acquire_upload(
        &self,
        file_name: &str,
        mime_type: &str,
    ) -> ClientResult<UploadUrlResponse> {
        let request = UploadUrlRequest {
            file_name: file_name.to_string(),
            file_type: mime_type.to_string(),
        };

        let response = self
            .http
            .post(self.endpoint("api/get-presigned-url")?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_status_error(response).await);
        }

        let body = response
            .json::<UploadUrlResponse>()
            .await
            .map_err(|e| ClientError::invalid_response(e.to_string()))?;
        if body.upload_url.is_empty() {
            return Err(ClientError::invalid_response("missing uploadURL"));
        }
        UploadKey::parse(&body.key).map_err(|e| ClientError::invalid_response(e.to_string()))?;
        Ok(body)
    }

    async fn upload(&self, upload_url: &str, mime_type: &str, bytes: Vec<u8>) -> ClientResult<()> {
        let size = bytes.len();
        let response = self
            .upload_http
            .put(upload_url)
            .header(CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_status_error(response).await);
        }

        debug!(bytes = size, "Upload completed");
        Ok(())
    }

    async fn acquire_read(&self, stem: &str) -> ClientResult<Option<String>> {
        let request = MarkdownUrlRequest {
            file_name: stem.to_string(),
        };

        let response = self
            .http
            .post(self.endpoint("api/get-generated-markdown-url")?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Document not available");
            return Ok(None);
        }

        match response.json::<MarkdownUrlResponse>().await {
            Ok(body) if !body.markdown_url.is_empty() => Ok(Some(body.markdown_url)),
            Ok(_) => Ok(None),
            Err(e) => Err(ClientError::invalid_response(e.to_string())),
        }
    }

    async fn fetch_document(&self, url: &str) -> ClientResult<String> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(into_status_error(response).await);
        }

        Ok(response.text().await?)
    }
}
