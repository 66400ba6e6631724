//! Elasticsearch 호환 `_bulk` 백엔드 (reqwest)

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use lapio_core::config::BackendConfig;

use super::backend::{BulkBackend, DeliveryError};
use super::response::BulkResponse;
use crate::error::IngestError;

/// 에러 응답 본문을 로그에 남길 때의 최대 길이
const MAX_ERROR_BODY_LEN: usize = 512;

/// Elasticsearch 호환 백엔드
#[derive(Debug, Clone)]
pub struct ElasticsearchBackend {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchBackend {
    /// 설정에서 HTTP 클라이언트를 구성합니다.
    pub fn new(config: &BackendConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| IngestError::Backend(format!("failed to build http client: {e}")))?;

        let username = (!config.username.is_empty()).then(|| config.username.clone());
        let password = (!config.password.is_empty()).then(|| config.password.clone());

        Ok(Self {
            client,
            base_url: config.host.trim_end_matches('/').to_owned(),
            username,
            password,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.username {
            Some(ref user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }
}

async fn status_error(response: reqwest::Response) -> DeliveryError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut cut = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    DeliveryError::Status { status, body }
}

impl BulkBackend for ElasticsearchBackend {
    async fn ping(&self) -> Result<(), DeliveryError> {
        let response = self
            .request(reqwest::Method::GET, "/")
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(format!("ping failed: {e}")))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn submit(&self, body: String) -> Result<BulkResponse, DeliveryError> {
        let response = self
            .request(reqwest::Method::POST, "/_bulk")
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        response
            .json::<BulkResponse>()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))
    }
}
