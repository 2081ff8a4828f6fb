//! Task Context - 后端异步任务限界上下文
//!
//! 职责:
//! - 任务标识与状态机（pending → running → completed/failed/stopped）
//! - 状态快照与终态结果
//! - 进度投影与摘要文本

mod errors;
mod progress;
mod snapshot;
mod value_objects;

pub use errors::TaskDomainError;
pub use progress::{progress_bar, ProgressView, TaskSummary};
pub use snapshot::{normalize_status, TaskOutcome, TaskSnapshot, USER_STOP_REASON};
pub use value_objects::{TaskCounters, TaskId, TaskStatus};
