//! Surface Registry Port - 界面区域状态
//!
//! 每个界面区域（客户列表、客户群、标签……）持有:
//! - 触发按钮是否禁用（防止重复提交）
//! - 当前正在轮询的任务 ID 与取消令牌
//!
//! 具体实现在 infrastructure/memory 层

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::task::TaskId;

/// Surface Registry 错误
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Surface busy: {0}")]
    Busy(String),
}

/// Surface Registry Port
pub trait SurfaceRegistryPort: Send + Sync {
    /// 禁用触发按钮；已禁用时返回 Busy
    fn acquire_trigger(&self, surface: &str) -> Result<(), RegistryError>;

    /// 恢复触发按钮
    fn release_trigger(&self, surface: &str);

    fn is_trigger_enabled(&self, surface: &str) -> bool;

    /// 登记新的轮询；同一区域已有的轮询会先被取消
    fn attach(&self, surface: &str, task_id: &TaskId) -> (Uuid, CancellationToken);

    /// 注销轮询；只有 run_id 匹配时才清除，返回是否清除
    fn detach(&self, surface: &str, run_id: Uuid) -> bool;

    /// 区域当前轮询的任务
    fn current_task(&self, surface: &str) -> Option<TaskId>;

    /// 取消区域当前的轮询（用户关闭进度窗口）
    fn cancel(&self, surface: &str) -> bool;
}

/// 触发按钮禁用期间持有；drop 时恢复
pub struct TriggerGuard {
    registry: Arc<dyn SurfaceRegistryPort>,
    surface: String,
}

impl TriggerGuard {
    pub fn acquire(
        registry: Arc<dyn SurfaceRegistryPort>,
        surface: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let surface = surface.into();
        registry.acquire_trigger(&surface)?;
        Ok(Self { registry, surface })
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.registry.release_trigger(&self.surface);
    }
}

/// 一次轮询的所有权凭证
///
/// drop 时注销区域的当前任务；被新轮询取代的凭证不会清除新任务
pub struct PollTicket {
    registry: Arc<dyn SurfaceRegistryPort>,
    surface: String,
    task_id: TaskId,
    run_id: Uuid,
    token: CancellationToken,
}

impl PollTicket {
    pub fn attach(
        registry: Arc<dyn SurfaceRegistryPort>,
        surface: impl Into<String>,
        task_id: TaskId,
    ) -> Self {
        let surface = surface.into();
        let (run_id, token) = registry.attach(&surface, &task_id);
        Self {
            registry,
            surface,
            task_id,
            run_id,
            token,
        }
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollTicket {
    fn drop(&mut self) {
        self.registry.detach(&self.surface, self.run_id);
    }
}
