//! Task Command Handlers
//!
//! - SubmitTaskHandler: 禁用触发按钮 → 提交 → 轮询 → 刷新列表 → 汇总
//! - WatchTaskHandler: 跟踪已存在的任务（不占用触发按钮）
//! - StopTaskHandler: 确认后请求停止，由轮询观察最终状态

use std::sync::Arc;

use crate::application::commands::{
    StopTaskCommand, StopTaskResponse, SubmitTaskCommand, SubmitTaskResponse, WatchTaskCommand,
    WatchTaskResponse,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ConfirmationPort, PollOutcome, PollReport, PollTicket, SubmitOutcome, SurfaceRegistryPort,
    TaskApiError, TaskApiPort, TaskPollerPort, TriggerGuard, ViewRefresh, ViewRefreshPort,
};
use crate::domain::feature::TaskFeature;
use crate::domain::task::TaskOutcome;

/// 停止前的确认提示
pub const STOP_CONFIRM_PROMPT: &str = "确定要停止同步吗？已同步的数据不会丢失。";

// ============================================================================
// SubmitTask
// ============================================================================

/// SubmitTask Handler
pub struct SubmitTaskHandler {
    api: Arc<dyn TaskApiPort>,
    poller: Arc<dyn TaskPollerPort>,
    registry: Arc<dyn SurfaceRegistryPort>,
    refresher: Arc<dyn ViewRefreshPort>,
}

impl SubmitTaskHandler {
    pub fn new(
        api: Arc<dyn TaskApiPort>,
        poller: Arc<dyn TaskPollerPort>,
        registry: Arc<dyn SurfaceRegistryPort>,
        refresher: Arc<dyn ViewRefreshPort>,
    ) -> Self {
        Self {
            api,
            poller,
            registry,
            refresher,
        }
    }

    pub async fn handle(
        &self,
        command: SubmitTaskCommand,
    ) -> Result<SubmitTaskResponse, ApplicationError> {
        let feature = command.feature;
        let surface = feature.surface();

        // 提交和轮询期间按钮保持禁用，任何出口都会随 guard 恢复
        let trigger = TriggerGuard::acquire(self.registry.clone(), surface.clone())?;

        tracing::info!(feature = %feature, surface = %surface, "Submitting job");

        let outcome = self
            .api
            .submit(&feature, &command.request)
            .await
            .map_err(|e| submission_error(&feature, e))?;

        match outcome {
            SubmitOutcome::Finished { message } => {
                drop(trigger);
                let refreshed = refresh_view(self.refresher.as_ref(), &feature).await;
                let summary = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("{}完成", feature.label()));

                tracing::info!(feature = %feature, summary = %summary, "Job finished inline");

                Ok(SubmitTaskResponse {
                    task_id: None,
                    report: None,
                    summary,
                    refreshed,
                })
            }
            SubmitOutcome::Accepted { task_id, message } => {
                tracing::info!(
                    feature = %feature,
                    task_id = %task_id,
                    message = message.as_deref().unwrap_or(""),
                    "Job accepted, start polling"
                );

                let ticket = PollTicket::attach(self.registry.clone(), surface, task_id.clone());
                let report = self.poller.watch(&feature, ticket).await;
                drop(trigger);

                let refreshed = if report.should_refresh() {
                    refresh_view(self.refresher.as_ref(), &feature).await
                } else {
                    None
                };
                let summary = report.summary();
                log_report(&feature, &report, &summary);

                Ok(SubmitTaskResponse {
                    task_id: Some(task_id),
                    report: Some(report),
                    summary,
                    refreshed,
                })
            }
        }
    }
}

fn submission_error(feature: &TaskFeature, err: TaskApiError) -> ApplicationError {
    tracing::warn!(feature = %feature, error = %err, "Job submission failed");
    match err {
        TaskApiError::Unsupported(message) => ApplicationError::Unsupported(message),
        TaskApiError::InvalidInput(message) => ApplicationError::ValidationError(message),
        other => ApplicationError::SubmissionRejected(other.user_message()),
    }
}

// ============================================================================
// WatchTask
// ============================================================================

/// WatchTask Handler - 重新跟踪后台任务
pub struct WatchTaskHandler {
    poller: Arc<dyn TaskPollerPort>,
    registry: Arc<dyn SurfaceRegistryPort>,
    refresher: Arc<dyn ViewRefreshPort>,
}

impl WatchTaskHandler {
    pub fn new(
        poller: Arc<dyn TaskPollerPort>,
        registry: Arc<dyn SurfaceRegistryPort>,
        refresher: Arc<dyn ViewRefreshPort>,
    ) -> Self {
        Self {
            poller,
            registry,
            refresher,
        }
    }

    pub async fn handle(
        &self,
        command: WatchTaskCommand,
    ) -> Result<WatchTaskResponse, ApplicationError> {
        let feature = command.feature;
        if !feature.supports_polling() {
            return Err(ApplicationError::Unsupported(format!(
                "{}没有任务状态接口",
                feature.label()
            )));
        }

        let ticket = PollTicket::attach(self.registry.clone(), feature.surface(), command.task_id);
        let report = self.poller.watch(&feature, ticket).await;

        let refreshed = if report.should_refresh() {
            refresh_view(self.refresher.as_ref(), &feature).await
        } else {
            None
        };
        let summary = report.summary();
        log_report(&feature, &report, &summary);

        Ok(WatchTaskResponse {
            report,
            summary,
            refreshed,
        })
    }
}

// ============================================================================
// StopTask
// ============================================================================

/// StopTask Handler
///
/// 只发出停止请求；任务的最终状态由仍在运行的轮询观察
pub struct StopTaskHandler {
    api: Arc<dyn TaskApiPort>,
    registry: Arc<dyn SurfaceRegistryPort>,
    confirmation: Arc<dyn ConfirmationPort>,
}

impl StopTaskHandler {
    pub fn new(
        api: Arc<dyn TaskApiPort>,
        registry: Arc<dyn SurfaceRegistryPort>,
        confirmation: Arc<dyn ConfirmationPort>,
    ) -> Self {
        Self {
            api,
            registry,
            confirmation,
        }
    }

    pub async fn handle(
        &self,
        command: StopTaskCommand,
    ) -> Result<StopTaskResponse, ApplicationError> {
        let feature = command.feature;
        let surface = feature.surface();

        let task_id = match command.task_id {
            Some(task_id) => task_id,
            None => self
                .registry
                .current_task(&surface)
                .ok_or_else(|| ApplicationError::NoActiveTask(surface.clone()))?,
        };

        if feature.stop_path(&task_id).is_none() {
            return Err(ApplicationError::Unsupported(format!(
                "{}不支持停止",
                feature.label()
            )));
        }

        if !self.confirmation.confirm(STOP_CONFIRM_PROMPT).await {
            tracing::debug!(task_id = %task_id, "Stop declined by user");
            return Err(ApplicationError::Cancelled);
        }

        let ack = self
            .api
            .request_stop(&feature, &task_id)
            .await
            .map_err(|e| match e {
                TaskApiError::Rejected(message) => ApplicationError::StopRejected(message),
                other => ApplicationError::from(other),
            })?;

        tracing::info!(feature = %feature, task_id = %task_id, "Stop requested");

        Ok(StopTaskResponse {
            task_id,
            message: ack
                .message
                .unwrap_or_else(|| "停止信号已发出，任务即将终止".to_string()),
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// 刷新失败不影响作业结果
async fn refresh_view(refresher: &dyn ViewRefreshPort, feature: &TaskFeature) -> Option<ViewRefresh> {
    match refresher.refresh(feature).await {
        Ok(refreshed) => Some(refreshed),
        Err(e) => {
            tracing::warn!(feature = %feature, error = %e, "View refresh failed");
            None
        }
    }
}

fn log_report(feature: &TaskFeature, report: &PollReport, summary: &str) {
    match &report.outcome {
        PollOutcome::Finished(TaskOutcome::Completed) => tracing::info!(
            feature = %feature,
            task_id = %report.task_id,
            polls = report.polls,
            "{}", summary
        ),
        PollOutcome::Finished(TaskOutcome::Stopped { .. }) | PollOutcome::Superseded => {
            tracing::info!(feature = %feature, task_id = %report.task_id, "{}", summary)
        }
        PollOutcome::TimedOut => tracing::warn!(
            feature = %feature,
            task_id = %report.task_id,
            elapsed_secs = report.elapsed.as_secs(),
            "{}", summary
        ),
        _ => tracing::error!(feature = %feature, task_id = %report.task_id, "{}", summary),
    }
}
