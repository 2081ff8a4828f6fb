//! Task Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::TaskApiPort;
use crate::application::queries::GetTaskStatus;
use crate::domain::task::{ProgressView, TaskSnapshot};

// ============================================================================
// Response DTOs
// ============================================================================

/// 任务状态响应
#[derive(Debug, Clone)]
pub struct TaskStatusResponse {
    pub snapshot: TaskSnapshot,
    pub view: ProgressView,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetTaskStatus Handler
pub struct GetTaskStatusHandler {
    api: Arc<dyn TaskApiPort>,
}

impl GetTaskStatusHandler {
    pub fn new(api: Arc<dyn TaskApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, query: GetTaskStatus) -> Result<TaskStatusResponse, ApplicationError> {
        if !query.feature.supports_polling() {
            return Err(ApplicationError::Unsupported(format!(
                "{}没有任务状态接口",
                query.feature.label()
            )));
        }

        let snapshot = self.api.fetch_status(&query.feature, &query.task_id).await?;
        let view = ProgressView::project(&snapshot);

        Ok(TaskStatusResponse { snapshot, view })
    }
}
