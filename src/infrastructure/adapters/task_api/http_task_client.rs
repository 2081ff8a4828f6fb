//! HTTP Task Client - 调用 CRM 后端接口
//!
//! 实现 TaskApiPort 与 ViewRefreshPort
//!
//! 鉴权:
//! - 同步类接口: `?api_token=...`
//! - 数据源接口: `Authorization: Bearer ...`

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use super::dto::{ApiEnvelope, BatchClearDto, SyncRequestDto, TaskStatusDto};
use crate::application::ports::{
    StopAck, SubmitOutcome, SubmitRequest, TaskApiError, TaskApiPort, ViewRefresh,
    ViewRefreshPort,
};
use crate::domain::feature::{AuthScheme, TaskFeature};
use crate::domain::task::{TaskId, TaskSnapshot};

/// HTTP Task 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTaskClientConfig {
    /// 后端基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 同步类接口的 api_token
    pub api_token: String,
    /// 数据源接口的登录 token
    pub session_token: Option<String>,
}

impl Default for HttpTaskClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            api_token: "crm-default-token".to_string(),
            session_token: None,
        }
    }
}

impl HttpTaskClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = token.into();
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

/// HTTP Task 客户端
pub struct HttpTaskClient {
    client: Client,
    config: HttpTaskClientConfig,
}

impl HttpTaskClient {
    pub fn new(config: HttpTaskClientConfig) -> Result<Self, TaskApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TaskApiError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder, feature: &TaskFeature) -> RequestBuilder {
        match feature.auth_scheme() {
            AuthScheme::ApiTokenQuery => builder.query(&[("api_token", &self.config.api_token)]),
            AuthScheme::Bearer => match &self.config.session_token {
                Some(token) => builder.bearer_auth(token),
                None => builder,
            },
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, TaskApiError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // FastAPI 的 HTTPException 把原因放在 detail 中
            let body = serde_json::from_str::<ApiEnvelope>(&body)
                .ok()
                .and_then(|env| env.message())
                .unwrap_or(body);
            return Err(TaskApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn envelope(&self, builder: RequestBuilder) -> Result<ApiEnvelope, TaskApiError> {
        self.send(builder)
            .await?
            .json::<ApiEnvelope>()
            .await
            .map_err(|e| TaskApiError::InvalidResponse(e.to_string()))
    }

    fn build_submit(
        &self,
        feature: &TaskFeature,
        request: &SubmitRequest,
    ) -> RequestBuilder {
        let builder = self.client.post(self.url(&feature.submit_path()));

        let builder = match feature {
            TaskFeature::CustomerSync { full } => builder.json(&SyncRequestDto {
                config: request.credentials.as_ref(),
                force: Some(*full),
            }),
            TaskFeature::GroupTagSync => builder.json(&serde_json::json!({})),
            TaskFeature::BatchClear { scope, .. } => builder.json(&BatchClearDto::from(*scope)),
            TaskFeature::ExcelImport { incremental, .. } => {
                builder.query(&[("incremental", incremental.to_string())])
            }
            _ if feature.sends_credentials() => builder.json(&SyncRequestDto {
                config: request.credentials.as_ref(),
                force: None,
            }),
            _ => builder,
        };

        self.authorize(builder, feature)
    }

    async fn excel_form(feature: &TaskFeature) -> Result<multipart::Form, TaskApiError> {
        let TaskFeature::ExcelImport { file, .. } = feature else {
            return Err(TaskApiError::Unsupported(format!("{} 不是导入作业", feature)));
        };

        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| TaskApiError::InvalidInput(format!("无法读取文件 {}: {}", file.display(), e)))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "import.xlsx".to_string());

        tracing::debug!(file = %file.display(), size = bytes.len(), "Uploading Excel file");

        Ok(multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(file_name)))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TaskApiError {
    if e.is_timeout() {
        TaskApiError::Timeout
    } else if e.is_connect() {
        TaskApiError::Network(format!("Cannot connect to backend: {}", e))
    } else {
        TaskApiError::Network(e.to_string())
    }
}

#[async_trait]
impl TaskApiPort for HttpTaskClient {
    async fn submit(
        &self,
        feature: &TaskFeature,
        request: &SubmitRequest,
    ) -> Result<SubmitOutcome, TaskApiError> {
        let mut builder = self.build_submit(feature, request);
        if matches!(feature, TaskFeature::ExcelImport { .. }) {
            builder = builder.multipart(Self::excel_form(feature).await?);
        }

        tracing::debug!(feature = %feature, path = %feature.submit_path(), "Submitting job");

        let envelope = self.envelope(builder).await?;
        if !envelope.is_ok() {
            return Err(envelope.rejection());
        }

        let message = envelope.message();
        match envelope.task_id() {
            Some(task_id) if feature.supports_polling() => {
                let task_id = TaskId::new(task_id)
                    .map_err(|e| TaskApiError::InvalidResponse(e.to_string()))?;
                Ok(SubmitOutcome::Accepted { task_id, message })
            }
            Some(task_id) => {
                // 没有状态接口可查，按同步完成处理
                tracing::debug!(feature = %feature, task_id = %task_id, "Task id ignored for inline job");
                Ok(SubmitOutcome::Finished { message })
            }
            None => Ok(SubmitOutcome::Finished { message }),
        }
    }

    async fn fetch_status(
        &self,
        feature: &TaskFeature,
        task_id: &TaskId,
    ) -> Result<TaskSnapshot, TaskApiError> {
        let path = feature
            .status_path(task_id)
            .ok_or_else(|| TaskApiError::Unsupported(format!("{}没有任务状态接口", feature.label())))?;

        let builder = self.authorize(self.client.get(self.url(&path)), feature);
        let envelope = self.envelope(builder).await?;
        if !envelope.is_ok() {
            return Err(envelope.rejection());
        }

        let data = envelope
            .data
            .ok_or_else(|| TaskApiError::InvalidResponse("missing data".to_string()))?;
        let dto: TaskStatusDto =
            serde_json::from_value(data).map_err(|e| TaskApiError::InvalidResponse(e.to_string()))?;

        dto.into_snapshot(task_id)
    }

    async fn request_stop(
        &self,
        feature: &TaskFeature,
        task_id: &TaskId,
    ) -> Result<StopAck, TaskApiError> {
        let path = feature
            .stop_path(task_id)
            .ok_or_else(|| TaskApiError::Unsupported(format!("{}不支持停止", feature.label())))?;

        let builder = self.authorize(self.client.post(self.url(&path)), feature);
        let envelope = match self.envelope(builder).await {
            Ok(envelope) => envelope,
            Err(TaskApiError::Http { status: 404, body }) => return Err(TaskApiError::Rejected(body)),
            Err(e) => return Err(e),
        };

        if !envelope.is_ok() {
            return Err(envelope.rejection());
        }

        Ok(StopAck {
            message: envelope.message(),
        })
    }
}

#[async_trait]
impl ViewRefreshPort for HttpTaskClient {
    async fn refresh(&self, feature: &TaskFeature) -> Result<ViewRefresh, TaskApiError> {
        let builder = self.authorize(self.client.get(self.url(&feature.refresh_path())), feature);
        let value: Value = self
            .send(builder)
            .await?
            .json()
            .await
            .map_err(|e| TaskApiError::InvalidResponse(e.to_string()))?;

        // 部分列表接口直接返回数组
        if let Value::Array(items) = &value {
            return Ok(ViewRefresh {
                total: Some(items.len() as u64),
            });
        }

        let envelope: ApiEnvelope = serde_json::from_value(value).unwrap_or_default();
        if envelope.success == Some(false) || envelope.code.map(|c| c != 0).unwrap_or(false) {
            return Err(envelope.rejection());
        }

        tracing::debug!(feature = %feature, total = ?envelope.total(), "View refreshed");
        Ok(ViewRefresh {
            total: envelope.total(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpTaskClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.api_token, "crm-default-token");
        assert!(config.session_token.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = HttpTaskClientConfig::new("http://crm.local:9000/")
            .with_timeout(5)
            .with_api_token("secret")
            .with_session_token("jwt");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.api_token, "secret");
        assert_eq!(config.session_token.as_deref(), Some("jwt"));
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let client = HttpTaskClient::new(HttpTaskClientConfig::new("http://crm.local/")).unwrap();
        assert_eq!(client.url("/api/sync/tags"), "http://crm.local/api/sync/tags");
    }
}
