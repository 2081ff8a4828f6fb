//! Fake Task Client - 用于测试和演示的脚本化后端
//!
//! 不发起网络请求，按预先登记的脚本返回任务状态

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::application::ports::{
    StopAck, SubmitOutcome, SubmitRequest, TaskApiError, TaskApiPort, ViewRefresh,
    ViewRefreshPort,
};
use crate::domain::feature::TaskFeature;
use crate::domain::task::{TaskId, TaskSnapshot, TaskStatus, USER_STOP_REASON};

/// 一次状态查询的回应
#[derive(Debug, Clone)]
pub enum FakeReply {
    Status(TaskSnapshot),
    /// 模拟网络抖动
    NetworkError(String),
    /// 后端返回 `success == false`
    Lost(String),
}

/// 脚本中的一步
#[derive(Debug, Clone)]
pub struct FakeStep {
    pub delay: Duration,
    pub reply: FakeReply,
}

impl FakeStep {
    pub fn status(snapshot: TaskSnapshot) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: FakeReply::Status(snapshot),
        }
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: FakeReply::NetworkError(message.into()),
        }
    }

    pub fn lost(message: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: FakeReply::Lost(message.into()),
        }
    }

    /// 延迟返回（用于制造乱序响应）
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// 下一次提交的结果
#[derive(Debug, Clone)]
pub enum FakeSubmission {
    Accept { task_id: String, steps: Vec<FakeStep> },
    Reject(String),
    Finish(String),
}

#[derive(Debug, Default)]
struct FakeScript {
    steps: VecDeque<FakeStep>,
    last: Option<TaskSnapshot>,
    stop_requested: bool,
}

/// Fake Task Client
#[derive(Default)]
pub struct FakeTaskClient {
    submissions: Mutex<VecDeque<FakeSubmission>>,
    scripts: DashMap<String, FakeScript>,
    stop_requests: Mutex<Vec<String>>,
    status_calls: AtomicU64,
    refresh_calls: AtomicU64,
}

impl FakeTaskClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记下一次提交的结果
    pub async fn queue_submission(&self, submission: FakeSubmission) {
        self.submissions.lock().await.push_back(submission);
    }

    /// 为已存在的任务登记状态脚本
    pub fn script(&self, task_id: &str, steps: Vec<FakeStep>) {
        self.scripts.insert(
            task_id.to_string(),
            FakeScript {
                steps: steps.into(),
                ..Default::default()
            },
        );
    }

    pub async fn stop_requests(&self) -> Vec<String> {
        self.stop_requests.lock().await.clone()
    }

    pub fn status_calls(&self) -> u64 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// 取出下一步；脚本耗尽后重复最后一次快照，停止请求会把任务推到 stopped
    fn next_step(&self, task_id: &TaskId) -> Result<FakeStep, TaskApiError> {
        let mut script = self
            .scripts
            .get_mut(task_id.as_str())
            .ok_or_else(|| TaskApiError::Rejected("任务不存在".to_string()))?;

        let terminal = script.last.as_ref().map(|s| s.is_terminal()).unwrap_or(false);
        if script.stop_requested && !terminal {
            let base = script
                .last
                .clone()
                .or_else(|| {
                    script.steps.iter().find_map(|step| match &step.reply {
                        FakeReply::Status(snapshot) => Some(snapshot.clone()),
                        _ => None,
                    })
                })
                .unwrap_or_else(|| TaskSnapshot::new(task_id.clone(), TaskStatus::Running));
            let mut stopped = base.with_error(USER_STOP_REASON);
            stopped.status = TaskStatus::Stopped;
            script.last = Some(stopped.clone());
            return Ok(FakeStep::status(stopped));
        }

        match script.steps.pop_front() {
            Some(step) => {
                if let FakeReply::Status(snapshot) = &step.reply {
                    script.last = Some(snapshot.clone());
                }
                Ok(step)
            }
            None => match &script.last {
                Some(last) => Ok(FakeStep::status(last.clone())),
                None => Ok(FakeStep::status(TaskSnapshot::new(
                    task_id.clone(),
                    TaskStatus::Pending,
                ))),
            },
        }
    }
}

#[async_trait]
impl TaskApiPort for FakeTaskClient {
    async fn submit(
        &self,
        feature: &TaskFeature,
        _request: &SubmitRequest,
    ) -> Result<SubmitOutcome, TaskApiError> {
        let submission = self.submissions.lock().await.pop_front();
        tracing::debug!(feature = %feature, submission = ?submission, "FakeTaskClient: submit");

        match submission {
            Some(FakeSubmission::Reject(message)) => Err(TaskApiError::Rejected(message)),
            Some(FakeSubmission::Finish(message)) => Ok(SubmitOutcome::Finished {
                message: Some(message),
            }),
            Some(FakeSubmission::Accept { task_id, steps }) => {
                let id = TaskId::new(task_id)
                    .map_err(|e| TaskApiError::InvalidResponse(e.to_string()))?;
                self.script(id.as_str(), steps);
                Ok(SubmitOutcome::Accepted {
                    task_id: id,
                    message: Some("同步任务已启动".to_string()),
                })
            }
            None if feature.supports_polling() => {
                let id = TaskId::new(format!("fake-{}", uuid::Uuid::new_v4()))
                    .map_err(|e| TaskApiError::InvalidResponse(e.to_string()))?;
                self.script(id.as_str(), Vec::new());
                Ok(SubmitOutcome::Accepted {
                    task_id: id,
                    message: None,
                })
            }
            None => Ok(SubmitOutcome::Finished { message: None }),
        }
    }

    async fn fetch_status(
        &self,
        _feature: &TaskFeature,
        task_id: &TaskId,
    ) -> Result<TaskSnapshot, TaskApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step(task_id)?;

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }

        match step.reply {
            FakeReply::Status(mut snapshot) => {
                snapshot.observed_at = chrono::Utc::now();
                Ok(snapshot)
            }
            FakeReply::NetworkError(message) => Err(TaskApiError::Network(message)),
            FakeReply::Lost(message) => Err(TaskApiError::Rejected(message)),
        }
    }

    async fn request_stop(
        &self,
        _feature: &TaskFeature,
        task_id: &TaskId,
    ) -> Result<StopAck, TaskApiError> {
        self.stop_requests.lock().await.push(task_id.to_string());

        let mut script = self
            .scripts
            .get_mut(task_id.as_str())
            .ok_or_else(|| TaskApiError::Rejected("任务不存在".to_string()))?;

        if script.last.as_ref().map(|s| s.is_terminal()).unwrap_or(false) {
            return Err(TaskApiError::Rejected(
                "无法停止任务（任务不存在或已结束）".to_string(),
            ));
        }

        script.stop_requested = true;
        Ok(StopAck {
            message: Some("停止信号已发出，任务即将终止".to_string()),
        })
    }
}

#[async_trait]
impl ViewRefreshPort for FakeTaskClient {
    async fn refresh(&self, _feature: &TaskFeature) -> Result<ViewRefresh, TaskApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ViewRefresh::default())
    }
}
