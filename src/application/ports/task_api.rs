//! Task API Port - 后端任务接口抽象
//!
//! 定义提交 / 状态查询 / 停止三个调用，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::feature::{TaskFeature, WecomCredentials};
use crate::domain::task::{TaskId, TaskSnapshot};

/// Task API 错误
#[derive(Debug, Error)]
pub enum TaskApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 后端明确拒绝（`success == false` 或 `code != 0`）
    #[error("Rejected by backend: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// 本地输入无效（如导入文件无法读取），请求未发出
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TaskApiError {
    /// 轮询时可以忽略并在下一次继续的错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TaskApiError::Network(_)
                | TaskApiError::Timeout
                | TaskApiError::Http { .. }
                | TaskApiError::InvalidResponse(_)
        )
    }

    /// 面向用户的错误文本
    pub fn user_message(&self) -> String {
        match self {
            TaskApiError::Rejected(message) => message.clone(),
            TaskApiError::Http { status, body } => format!("({}): {}", status, body),
            TaskApiError::Network(_) | TaskApiError::Timeout => {
                "请检查网络连接和后端服务".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// 提交参数
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    /// 企业微信凭据；None 时后端使用已保存的配置
    pub credentials: Option<WecomCredentials>,
}

/// 提交结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 后端创建了异步任务
    Accepted {
        task_id: TaskId,
        message: Option<String>,
    },
    /// 后端已同步完成，无需轮询
    Finished { message: Option<String> },
}

/// 停止请求的确认
#[derive(Debug, Clone, PartialEq)]
pub struct StopAck {
    pub message: Option<String>,
}

/// Task API Port
#[async_trait]
pub trait TaskApiPort: Send + Sync {
    /// 提交作业
    async fn submit(
        &self,
        feature: &TaskFeature,
        request: &SubmitRequest,
    ) -> Result<SubmitOutcome, TaskApiError>;

    /// 查询任务状态
    async fn fetch_status(
        &self,
        feature: &TaskFeature,
        task_id: &TaskId,
    ) -> Result<TaskSnapshot, TaskApiError>;

    /// 请求停止任务（不等待任务真正停止）
    async fn request_stop(
        &self,
        feature: &TaskFeature,
        task_id: &TaskId,
    ) -> Result<StopAck, TaskApiError>;
}
