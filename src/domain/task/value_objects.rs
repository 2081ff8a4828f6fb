//! Task Context - Value Objects

use serde::{Deserialize, Serialize};

use super::TaskDomainError;

/// 后端分配的任务标识（不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Result<Self, TaskDomainError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::InvalidTaskId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskId {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 任务状态
///
/// 终态: `Completed` / `Failed` / `Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 等待执行
    Pending,
    /// 执行中
    Running,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
    /// 已停止（用户取消）
    Stopped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Stopped => "stopped",
        }
    }

    /// 解析后端返回的状态字符串
    ///
    /// 客户群同步使用 `cancelled` 表示用户取消，这里统一归为 `Stopped`
    pub fn parse(s: &str) -> Result<Self, TaskDomainError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "stopped" | "cancelled" | "canceled" => Ok(TaskStatus::Stopped),
            _ => Err(TaskDomainError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Stopped
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务计数器
///
/// 不变量:
/// - `total_count > 0` 时 `processed_count <= total_count`
/// - 终态后所有计数冻结
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounters {
    pub total_count: u64,
    pub processed_count: u64,
    pub added_count: u64,
    pub updated_count: u64,
    pub failed_count: u64,
}

impl TaskCounters {
    /// 已处理数是否超出总数
    pub fn exceeds_total(&self) -> bool {
        self.total_count > 0 && self.processed_count > self.total_count
    }

    /// 新增 + 更新 + 失败 是否等于已处理数
    ///
    /// 部分功能只统计新增/更新（不报告 processed），此时 processed 为 0 视为平衡；
    /// 三项之和溢出视为不平衡
    pub fn is_balanced(&self) -> bool {
        if self.processed_count == 0 {
            return true;
        }
        self.added_count
            .checked_add(self.updated_count)
            .and_then(|sum| sum.checked_add(self.failed_count))
            .is_some_and(|accounted| accounted == self.processed_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_rejects_blank() {
        assert!(TaskId::new("").is_err());
        assert!(TaskId::new("   ").is_err());
        assert_eq!(TaskId::new(" t1 ").unwrap().as_str(), "t1");
    }

    #[test]
    fn test_status_parse_aliases() {
        assert_eq!(TaskStatus::parse("cancelled").unwrap(), TaskStatus::Stopped);
        assert_eq!(TaskStatus::parse("Running").unwrap(), TaskStatus::Running);
        assert!(TaskStatus::parse("paused").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Stopped.is_terminal());
    }

    #[test]
    fn test_counter_balance() {
        let counters = TaskCounters {
            total_count: 100,
            processed_count: 30,
            added_count: 5,
            updated_count: 25,
            failed_count: 0,
        };
        assert!(counters.is_balanced());
        assert!(!counters.exceeds_total());

        let skewed = TaskCounters {
            processed_count: 120,
            ..counters
        };
        assert!(!skewed.is_balanced());
        assert!(skewed.exceeds_total());
    }

    #[test]
    fn test_counter_overflow_is_unbalanced() {
        let counters = TaskCounters {
            total_count: 10,
            processed_count: 10,
            added_count: u64::MAX,
            updated_count: 1,
            failed_count: 0,
        };
        assert!(!counters.is_balanced());
    }

    #[test]
    fn test_task_id_deserialize_validates() {
        let id: TaskId = serde_json::from_str("\" t1 \"").unwrap();
        assert_eq!(id.as_str(), "t1");
        assert!(serde_json::from_str::<TaskId>("\"  \"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"t1\"");
    }
}
