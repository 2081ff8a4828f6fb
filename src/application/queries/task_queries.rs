//! Task Queries

use crate::domain::feature::TaskFeature;
use crate::domain::task::TaskId;

/// 查询一次任务状态（不轮询）
#[derive(Debug, Clone)]
pub struct GetTaskStatus {
    pub feature: TaskFeature,
    pub task_id: TaskId,
}
