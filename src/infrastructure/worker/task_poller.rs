//! Task Poller - 后端任务状态轮询
//!
//! 固定间隔查询任务状态，直到:
//! - 观察到终态（completed / failed / stopped）
//! - 超过最大轮询时长
//! - 后端不再认识该任务
//! - 连续失败次数达到阈值
//! - 区域开始了新的轮询（取消令牌触发）
//!
//! 请求可能重叠，乱序到达的旧响应按序号丢弃

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use crate::application::ports::{
    PollOutcome, PollReport, PollTicket, ProgressSink, TaskApiError, TaskApiPort, TaskPollerPort,
};
use crate::domain::feature::TaskFeature;
use crate::domain::task::{ProgressView, TaskId, TaskSnapshot};

/// Poller 配置
#[derive(Debug, Clone)]
pub struct TaskPollerConfig {
    /// 轮询间隔
    pub interval: Duration,
    /// 最大轮询时长；None 表示不限
    pub max_duration: Option<Duration>,
    /// 连续失败阈值；0 表示不限
    pub max_consecutive_failures: u32,
}

impl Default for TaskPollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_duration: Some(Duration::from_secs(1800)),
            max_consecutive_failures: 0,
        }
    }
}

type StatusResult = (u64, Result<TaskSnapshot, TaskApiError>);

/// 单次轮询的可变状态
struct PollState {
    last_applied: u64,
    max_progress: u8,
    consecutive_failures: u32,
    polls: u64,
    last_snapshot: Option<TaskSnapshot>,
}

impl PollState {
    fn new() -> Self {
        Self {
            last_applied: 0,
            max_progress: 0,
            consecutive_failures: 0,
            polls: 0,
            last_snapshot: None,
        }
    }
}

/// 任务轮询器
pub struct TaskPoller {
    config: TaskPollerConfig,
    api: Arc<dyn TaskApiPort>,
    sink: Arc<dyn ProgressSink>,
}

impl TaskPoller {
    pub fn new(
        config: TaskPollerConfig,
        api: Arc<dyn TaskApiPort>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self { config, api, sink }
    }

    /// 处理一个状态响应；返回 Some 时轮询结束
    fn apply(
        &self,
        state: &mut PollState,
        surface: &str,
        task_id: &TaskId,
        seq: u64,
        result: Result<TaskSnapshot, TaskApiError>,
    ) -> Option<PollOutcome> {
        if seq <= state.last_applied {
            tracing::debug!(task_id = %task_id, seq, last_applied = state.last_applied, "Stale status discarded");
            return None;
        }
        state.polls += 1;

        match result {
            Ok(snapshot) => {
                state.last_applied = seq;
                state.consecutive_failures = 0;

                if snapshot.counters.exceeds_total() || !snapshot.counters.is_balanced() {
                    tracing::warn!(
                        task_id = %task_id,
                        counters = ?snapshot.counters,
                        "Inconsistent task counters"
                    );
                }

                let view = ProgressView::project(&snapshot).with_floor(state.max_progress);
                state.max_progress = view.percent;
                self.sink.on_progress(surface, &snapshot, &view);

                tracing::debug!(
                    task_id = %task_id,
                    status = %snapshot.status,
                    progress = view.percent,
                    "Task status"
                );

                let outcome = snapshot.outcome();
                state.last_snapshot = Some(snapshot);
                outcome.map(PollOutcome::Finished)
            }
            Err(TaskApiError::Rejected(message)) => {
                tracing::warn!(task_id = %task_id, message = %message, "Task unknown to backend");
                Some(PollOutcome::Lost { message })
            }
            Err(e) if e.is_transient() => {
                state.consecutive_failures += 1;
                self.sink
                    .on_poll_error(surface, task_id, &e, state.consecutive_failures);
                tracing::warn!(
                    task_id = %task_id,
                    error = %e,
                    consecutive = state.consecutive_failures,
                    "Status poll failed"
                );

                let limit = self.config.max_consecutive_failures;
                if limit > 0 && state.consecutive_failures >= limit {
                    Some(PollOutcome::Unreachable {
                        last_error: e.to_string(),
                    })
                } else {
                    None
                }
            }
            Err(e) => Some(PollOutcome::Lost {
                message: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl TaskPollerPort for TaskPoller {
    async fn watch(&self, feature: &TaskFeature, ticket: PollTicket) -> PollReport {
        let started = Instant::now();
        let surface = ticket.surface().to_string();
        let task_id = ticket.task_id().clone();
        let token = ticket.token().clone();

        tracing::info!(
            surface = %surface,
            task_id = %task_id,
            interval_ms = self.config.interval.as_millis() as u64,
            "Polling started"
        );

        let interval = self.config.interval;
        let mut ticker = tokio::time::interval_at(started + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let limit = self.config.max_duration;
        let deadline = tokio::time::sleep(limit.unwrap_or(Duration::from_secs(86_400)));
        tokio::pin!(deadline);

        let mut in_flight: JoinSet<StatusResult> = JoinSet::new();
        let mut state = PollState::new();
        let mut seq: u64 = 0;

        let outcome = loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break PollOutcome::Superseded,

                Some(joined) = in_flight.join_next() => {
                    match joined {
                        Ok((n, result)) => {
                            if let Some(outcome) = self.apply(&mut state, &surface, &task_id, n, result) {
                                break outcome;
                            }
                        }
                        Err(e) => {
                            tracing::error!(task_id = %task_id, error = %e, "Status request task panicked");
                        }
                    }
                }

                _ = &mut deadline, if limit.is_some() => break PollOutcome::TimedOut,

                _ = ticker.tick() => {
                    seq += 1;
                    let api = self.api.clone();
                    let feature = feature.clone();
                    let id = task_id.clone();
                    let n = seq;
                    in_flight.spawn(async move { (n, api.fetch_status(&feature, &id).await) });
                }
            }
        };

        // 未返回的请求随 JoinSet 一起中止
        in_flight.abort_all();

        let report = PollReport {
            task_id,
            outcome,
            last_snapshot: state.last_snapshot,
            polls: state.polls,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            surface = %surface,
            task_id = %report.task_id,
            outcome = ?report.outcome,
            polls = report.polls,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Polling finished"
        );

        self.sink.on_finished(&surface, &report);
        drop(ticket);
        report
    }
}
