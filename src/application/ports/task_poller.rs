//! Task Poller Port - 任务状态轮询
//!
//! 状态机: Idle → Polling → {Completed, Failed, Stopped}
//! 另有客户端侧出口: TimedOut / Lost / Unreachable / Superseded

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::PollTicket;
use crate::domain::feature::TaskFeature;
use crate::domain::task::{TaskCounters, TaskId, TaskOutcome, TaskSnapshot, TaskSummary};

/// 轮询结束原因
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollOutcome {
    /// 观察到任务终态
    Finished(TaskOutcome),
    /// 超过最大轮询时长，任务可能仍在运行
    TimedOut,
    /// 后端不认识该任务
    Lost { message: String },
    /// 连续失败次数超过阈值
    Unreachable { last_error: String },
    /// 区域开始了新的轮询，或用户关闭了进度窗口
    Superseded,
}

/// 轮询报告
#[derive(Debug, Clone, Serialize)]
pub struct PollReport {
    pub task_id: TaskId,
    pub outcome: PollOutcome,
    pub last_snapshot: Option<TaskSnapshot>,
    /// 已收到的状态响应数（含失败）
    pub polls: u64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PollReport {
    /// 作业终态后需要刷新列表（失败/停止时后端可能已保存部分数据）
    pub fn should_refresh(&self) -> bool {
        matches!(self.outcome, PollOutcome::Finished(_))
    }

    pub fn task_outcome(&self) -> Option<&TaskOutcome> {
        match &self.outcome {
            PollOutcome::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        let counters = self
            .last_snapshot
            .as_ref()
            .map(|s| s.counters)
            .unwrap_or_default();

        match &self.outcome {
            PollOutcome::Finished(outcome) => match &self.last_snapshot {
                Some(snapshot) => TaskSummary::for_outcome(outcome, snapshot),
                None => fallback_summary(outcome, &counters),
            },
            PollOutcome::TimedOut => TaskSummary::timed_out(&counters),
            PollOutcome::Lost { message } => format!("获取同步状态失败：{}", message),
            PollOutcome::Unreachable { last_error } => {
                format!("无法获取任务状态，请检查网络连接：{}", last_error)
            }
            PollOutcome::Superseded => format!("已停止跟踪任务 {}", self.task_id),
        }
    }
}

fn fallback_summary(outcome: &TaskOutcome, counters: &TaskCounters) -> String {
    match outcome {
        TaskOutcome::Completed => TaskSummary::completed(counters, None),
        TaskOutcome::Failed { reason } => TaskSummary::failed(reason),
        TaskOutcome::Stopped { .. } => TaskSummary::stopped(counters),
    }
}

/// Task Poller Port
#[async_trait]
pub trait TaskPollerPort: Send + Sync {
    /// 轮询直到终态或客户端侧出口；返回时 ticket 已释放
    async fn watch(&self, feature: &TaskFeature, ticket: PollTicket) -> PollReport;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskStatus;

    fn report(outcome: PollOutcome, snapshot: Option<TaskSnapshot>) -> PollReport {
        PollReport {
            task_id: TaskId::new("t1").unwrap(),
            outcome,
            last_snapshot: snapshot,
            polls: 3,
            elapsed: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_refresh_only_after_terminal() {
        assert!(report(PollOutcome::Finished(TaskOutcome::Completed), None).should_refresh());
        assert!(report(
            PollOutcome::Finished(TaskOutcome::Failed {
                reason: "boom".to_string()
            }),
            None
        )
        .should_refresh());
        assert!(!report(PollOutcome::TimedOut, None).should_refresh());
        assert!(!report(PollOutcome::Superseded, None).should_refresh());
    }

    #[test]
    fn test_timed_out_summary_uses_last_counters() {
        let mut snapshot = TaskSnapshot::new(TaskId::new("t1").unwrap(), TaskStatus::Running);
        snapshot.counters.processed_count = 7;
        snapshot.counters.total_count = 50;
        assert_eq!(
            report(PollOutcome::TimedOut, Some(snapshot)).summary(),
            "任务仍在运行，请稍后查看（已处理7 / 50）"
        );
    }
}
