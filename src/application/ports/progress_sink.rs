//! Progress Sink Port - 进度呈现回调
//!
//! 轮询器每次应用新快照、遇到临时错误、结束时调用

use super::{PollReport, TaskApiError};
use crate::domain::task::{ProgressView, TaskId, TaskSnapshot};

pub trait ProgressSink: Send + Sync {
    /// 应用了一次新的状态快照
    fn on_progress(&self, surface: &str, snapshot: &TaskSnapshot, view: &ProgressView);

    /// 一次状态查询失败（轮询会继续）
    fn on_poll_error(&self, _surface: &str, _task_id: &TaskId, _error: &TaskApiError, _consecutive: u32) {}

    /// 轮询结束
    fn on_finished(&self, surface: &str, report: &PollReport);
}

/// 丢弃所有回调
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_progress(&self, _surface: &str, _snapshot: &TaskSnapshot, _view: &ProgressView) {}

    fn on_finished(&self, _surface: &str, _report: &PollReport) {}
}
