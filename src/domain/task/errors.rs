//! Task Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskDomainError {
    #[error("无效的任务 ID: {0:?}")]
    InvalidTaskId(String),

    #[error("未知的任务状态: {0}")]
    UnknownStatus(String),
}
