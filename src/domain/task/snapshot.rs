//! Task Context - 任务状态快照
//!
//! 客户端只持有最近一次观察到的快照，权威状态在后端

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TaskCounters, TaskId, TaskStatus};

/// 后端用于标记用户取消的原因文本
pub const USER_STOP_REASON: &str = "用户手动停止";

/// 任务终态结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    Failed { reason: String },
    Stopped { reason: String },
}

impl TaskOutcome {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskOutcome::Completed => TaskStatus::Completed,
            TaskOutcome::Failed { .. } => TaskStatus::Failed,
            TaskOutcome::Stopped { .. } => TaskStatus::Stopped,
        }
    }
}

/// 一次轮询观察到的任务状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// 0-100
    pub progress: u8,
    pub message: Option<String>,
    pub counters: TaskCounters,
    pub error_message: Option<String>,
    /// 终态后才有值（秒）
    pub duration_secs: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl TaskSnapshot {
    pub fn new(task_id: TaskId, status: TaskStatus) -> Self {
        Self {
            task_id,
            status,
            progress: 0,
            message: None,
            counters: TaskCounters::default(),
            error_message: None,
            duration_secs: None,
            observed_at: Utc::now(),
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_counters(mut self, counters: TaskCounters) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_error(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 终态对应的结果，非终态返回 None
    pub fn outcome(&self) -> Option<TaskOutcome> {
        match self.status {
            TaskStatus::Completed => Some(TaskOutcome::Completed),
            TaskStatus::Failed => Some(TaskOutcome::Failed {
                reason: self.reason_or("未知错误"),
            }),
            TaskStatus::Stopped => Some(TaskOutcome::Stopped {
                reason: self.reason_or(USER_STOP_REASON),
            }),
            TaskStatus::Pending | TaskStatus::Running => None,
        }
    }

    /// 比较两次观察的业务内容（忽略观察时间）
    pub fn same_payload(&self, other: &TaskSnapshot) -> bool {
        self.task_id == other.task_id
            && self.status == other.status
            && self.progress == other.progress
            && self.counters == other.counters
            && self.error_message == other.error_message
            && self.duration_secs == other.duration_secs
    }

    fn reason_or(&self, fallback: &str) -> String {
        self.error_message
            .clone()
            .or_else(|| self.message.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// 归一化旧接口的取消表示
///
/// 客户同步接口用 `failed` + "用户手动停止" 表示取消
pub fn normalize_status(status: TaskStatus, error_message: Option<&str>) -> TaskStatus {
    match (status, error_message) {
        (TaskStatus::Failed, Some(reason)) if reason.trim() == USER_STOP_REASON => {
            TaskStatus::Stopped
        }
        _ => status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: TaskStatus) -> TaskSnapshot {
        TaskSnapshot::new(TaskId::new("t1").unwrap(), status)
    }

    #[test]
    fn test_outcome_only_for_terminal() {
        assert_eq!(snapshot(TaskStatus::Running).outcome(), None);
        assert_eq!(snapshot(TaskStatus::Pending).outcome(), None);
        assert_eq!(
            snapshot(TaskStatus::Completed).outcome(),
            Some(TaskOutcome::Completed)
        );
    }

    #[test]
    fn test_failed_reason_falls_back_to_message() {
        let mut s = snapshot(TaskStatus::Failed);
        s.message = Some("检查失败: db locked".to_string());
        assert_eq!(
            s.outcome(),
            Some(TaskOutcome::Failed {
                reason: "检查失败: db locked".to_string()
            })
        );
    }

    #[test]
    fn test_stopped_default_reason() {
        let s = snapshot(TaskStatus::Stopped);
        assert_eq!(
            s.outcome(),
            Some(TaskOutcome::Stopped {
                reason: USER_STOP_REASON.to_string()
            })
        );
    }

    #[test]
    fn test_legacy_stop_normalized() {
        assert_eq!(
            normalize_status(TaskStatus::Failed, Some("用户手动停止")),
            TaskStatus::Stopped
        );
        assert_eq!(
            normalize_status(TaskStatus::Failed, Some("invalid corpid")),
            TaskStatus::Failed
        );
        assert_eq!(normalize_status(TaskStatus::Running, None), TaskStatus::Running);
    }

    #[test]
    fn test_same_payload_ignores_observed_at() {
        let a = snapshot(TaskStatus::Completed);
        let mut b = a.clone();
        b.observed_at = a.observed_at + chrono::Duration::seconds(5);
        assert!(a.same_payload(&b));
        b.progress = 50;
        assert!(!a.same_payload(&b));
    }
}
