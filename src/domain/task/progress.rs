//! Task Context - 进度投影
//!
//! 纯投影：快照 -> 进度条百分比、阶段文本、计数；不含业务逻辑

use serde::Serialize;

use super::{TaskCounters, TaskOutcome, TaskSnapshot, TaskStatus};

/// 进度视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub status: TaskStatus,
    pub percent: u8,
    pub phase_text: String,
    pub counters: TaskCounters,
}

impl ProgressView {
    pub fn project(snapshot: &TaskSnapshot) -> Self {
        let phase_text = match snapshot.outcome() {
            Some(outcome) => TaskSummary::for_outcome(&outcome, snapshot),
            None => phase_text(snapshot),
        };

        Self {
            status: snapshot.status,
            percent: snapshot.progress.min(100),
            phase_text,
            counters: snapshot.counters,
        }
    }

    /// 呈现的进度不低于 floor（运行中进度回退时使用）
    pub fn with_floor(mut self, floor: u8) -> Self {
        self.percent = self.percent.max(floor.min(100));
        self
    }

    /// 终端进度条，如 `[######----]`
    pub fn bar(&self, width: usize) -> String {
        progress_bar(self.percent, width)
    }
}

/// 按百分比绘制进度条
pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (width * percent.min(100) as usize) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn phase_text(snapshot: &TaskSnapshot) -> String {
    let counters = &snapshot.counters;
    match snapshot.status {
        TaskStatus::Pending => "准备中...".to_string(),
        TaskStatus::Running if counters.total_count > 0 => format!(
            "正在处理：{} / {}",
            counters.processed_count, counters.total_count
        ),
        TaskStatus::Running => snapshot
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "同步中...".to_string()),
        _ => String::new(),
    }
}

/// 终态摘要文本
pub struct TaskSummary;

impl TaskSummary {
    pub fn for_outcome(outcome: &TaskOutcome, snapshot: &TaskSnapshot) -> String {
        match outcome {
            TaskOutcome::Completed => Self::completed(&snapshot.counters, snapshot.duration_secs),
            TaskOutcome::Failed { reason } => Self::failed(reason),
            TaskOutcome::Stopped { .. } => Self::stopped(&snapshot.counters),
        }
    }

    pub fn completed(counters: &TaskCounters, duration_secs: Option<f64>) -> String {
        let duration = duration_secs.unwrap_or(0.0).max(0.0).round() as u64;
        format!(
            "同步完成：新增{}个，更新{}个，耗时{}秒",
            counters.added_count, counters.updated_count, duration
        )
    }

    pub fn failed(reason: &str) -> String {
        format!("同步失败：{}", reason)
    }

    pub fn stopped(counters: &TaskCounters) -> String {
        format!(
            "同步已停止：已处理{}个（新增{}，更新{}）",
            counters.processed_count, counters.added_count, counters.updated_count
        )
    }

    pub fn timed_out(counters: &TaskCounters) -> String {
        format!(
            "任务仍在运行，请稍后查看（已处理{} / {}）",
            counters.processed_count, counters.total_count
        )
    }
}
