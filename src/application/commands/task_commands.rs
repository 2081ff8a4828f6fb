//! Task Commands - 任务提交 / 跟踪 / 停止命令

use crate::application::ports::{PollReport, SubmitRequest, ViewRefresh};
use crate::domain::feature::TaskFeature;
use crate::domain::task::TaskId;

/// 提交作业命令
#[derive(Debug, Clone)]
pub struct SubmitTaskCommand {
    pub feature: TaskFeature,
    pub request: SubmitRequest,
}

/// 提交作业响应
#[derive(Debug, Clone)]
pub struct SubmitTaskResponse {
    /// 后端创建的任务；同步完成的作业为 None
    pub task_id: Option<TaskId>,
    /// 轮询报告；未轮询时为 None
    pub report: Option<PollReport>,
    pub summary: String,
    /// 刷新后的列表信息；未刷新或刷新失败为 None
    pub refreshed: Option<ViewRefresh>,
}

/// 跟踪已存在的任务
#[derive(Debug, Clone)]
pub struct WatchTaskCommand {
    pub feature: TaskFeature,
    pub task_id: TaskId,
}

/// 跟踪响应
#[derive(Debug, Clone)]
pub struct WatchTaskResponse {
    pub report: PollReport,
    pub summary: String,
    pub refreshed: Option<ViewRefresh>,
}

/// 停止任务命令
///
/// `task_id` 为 None 时停止区域当前轮询的任务
#[derive(Debug, Clone)]
pub struct StopTaskCommand {
    pub feature: TaskFeature,
    pub task_id: Option<TaskId>,
}

/// 停止任务响应
#[derive(Debug, Clone)]
pub struct StopTaskResponse {
    pub task_id: TaskId,
    pub message: String,
}
