//! 后端响应 DTO
//!
//! 后端各接口的信封并不统一:
//! - 同步接口: `{success, task_id?, message?}`
//! - 状态接口: `{success, data}` / `{success: false, message}`
//! - 数据源接口: `{code, message}`
//! - FastAPI 异常: `{detail}`
//!
//! 这里统一归一化为 `ApiEnvelope`，其余代码只看 `is_ok()`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::ports::TaskApiError;
use crate::domain::feature::{ClearScope, WecomCredentials};
use crate::domain::task::{normalize_status, TaskCounters, TaskId, TaskSnapshot, TaskStatus};

/// 通用响应信封
#[derive(Debug, Default, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl ApiEnvelope {
    pub fn is_ok(&self) -> bool {
        self.success == Some(true) || self.code == Some(0)
    }

    /// 后端给出的说明文本（message 优先，其次 detail）
    pub fn message(&self) -> Option<String> {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| match &self.detail {
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
                None => None,
            })
    }

    /// 顶层或 data 中的 task_id
    pub fn task_id(&self) -> Option<String> {
        self.task_id
            .clone()
            .or_else(|| {
                self.data
                    .as_ref()
                    .and_then(|d| d.get("task_id"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .filter(|id| !id.trim().is_empty())
    }

    /// 列表总数（顶层 total 或 data.total）
    pub fn total(&self) -> Option<u64> {
        self.total.or_else(|| {
            self.data
                .as_ref()
                .and_then(|d| d.get("total"))
                .and_then(|v| v.as_u64())
        })
    }

    /// 拒绝原因
    pub fn rejection(&self) -> TaskApiError {
        TaskApiError::Rejected(self.message().unwrap_or_else(|| "未知错误".to_string()))
    }
}

/// 状态接口 `data` 字段
///
/// 客户同步使用 `*_count` 字段，群标签同步使用简写 `total` / `added` …
#[derive(Debug, Deserialize)]
pub struct TaskStatusDto {
    #[serde(default)]
    pub task_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "total")]
    pub total_count: Option<u64>,
    #[serde(default, alias = "processed")]
    pub processed_count: Option<u64>,
    #[serde(default, alias = "added")]
    pub added_count: Option<u64>,
    #[serde(default, alias = "updated")]
    pub updated_count: Option<u64>,
    #[serde(default, alias = "failed")]
    pub failed_count: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
}

impl TaskStatusDto {
    /// 转换为领域快照；响应缺少 task_id 时使用请求的 ID
    pub fn into_snapshot(self, requested: &TaskId) -> Result<TaskSnapshot, TaskApiError> {
        let raw_status = TaskStatus::parse(&self.status)
            .map_err(|e| TaskApiError::InvalidResponse(e.to_string()))?;

        let task_id = match self.task_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => TaskId::new(id).map_err(|e| TaskApiError::InvalidResponse(e.to_string()))?,
            None => requested.clone(),
        };

        let error_message = self
            .error_message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| {
                if matches!(raw_status, TaskStatus::Failed | TaskStatus::Stopped) {
                    self.message.clone()
                } else {
                    None
                }
            });
        let status = normalize_status(raw_status, error_message.as_deref());

        let progress = self
            .progress
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);

        let counters = TaskCounters {
            total_count: self.total_count.unwrap_or(0),
            processed_count: self.processed_count.unwrap_or(0),
            added_count: self.added_count.unwrap_or(0),
            updated_count: self.updated_count.unwrap_or(0),
            failed_count: self.failed_count.unwrap_or(0),
        };

        let mut snapshot = TaskSnapshot::new(task_id, status)
            .with_progress(progress)
            .with_counters(counters);
        snapshot.message = self.message.filter(|m| !m.trim().is_empty());
        snapshot.error_message = error_message;

        if status.is_terminal() {
            let duration = self.duration.or_else(|| match (self.start_time, self.end_time) {
                (Some(start), Some(end)) if end >= start => Some(end - start),
                _ => None,
            });
            snapshot.duration_secs = duration.filter(|d| d.is_finite() && *d >= 0.0);
        }

        Ok(snapshot)
    }
}

/// 同步作业请求体
#[derive(Debug, Serialize)]
pub struct SyncRequestDto<'a> {
    pub config: Option<&'a WecomCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
}

/// 批量清空请求体
#[derive(Debug, Serialize, PartialEq)]
pub struct BatchClearDto {
    pub clear_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl From<ClearScope> for BatchClearDto {
    fn from(scope: ClearScope) -> Self {
        match scope {
            ClearScope::OlderThanDays(days) => Self {
                clear_type: "by_time",
                days: Some(days),
            },
            ClearScope::All => Self {
                clear_type: "all",
                days: None,
            },
        }
    }
}
