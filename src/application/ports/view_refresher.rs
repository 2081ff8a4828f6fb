//! View Refresh Port - 作业结束后刷新受影响的列表

use async_trait::async_trait;

use super::TaskApiError;
use crate::domain::feature::TaskFeature;

/// 刷新结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRefresh {
    /// 列表总数（后端返回时才有）
    pub total: Option<u64>,
}

#[async_trait]
pub trait ViewRefreshPort: Send + Sync {
    async fn refresh(&self, feature: &TaskFeature) -> Result<ViewRefresh, TaskApiError>;
}
