//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{RegistryError, TaskApiError};
use crate::domain::task::TaskDomainError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 提交被后端拒绝，未创建任务
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// 区域已有进行中的提交或轮询
    #[error("Surface busy: {0}")]
    SurfaceBusy(String),

    /// 区域没有正在运行的任务
    #[error("No active task on surface: {0}")]
    NoActiveTask(String),

    /// 作业不支持该操作
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// 用户取消了确认
    #[error("Cancelled by user")]
    Cancelled,

    /// 停止请求被拒绝
    #[error("Stop rejected: {0}")]
    StopRejected(String),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<RegistryError> for ApplicationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Busy(surface) => Self::SurfaceBusy(surface),
        }
    }
}

impl From<TaskDomainError> for ApplicationError {
    fn from(err: TaskDomainError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<TaskApiError> for ApplicationError {
    fn from(err: TaskApiError) -> Self {
        match err {
            TaskApiError::Unsupported(message) => Self::Unsupported(message),
            TaskApiError::InvalidInput(message) => Self::ValidationError(message),
            other => Self::ExternalServiceError(other.to_string()),
        }
    }
}
