//! Feature Context - Value Objects
//!
//! 每种后端异步作业的端点与调用约定

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::task::TaskId;

/// 请求鉴权方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `?api_token=...` 查询参数（同步类接口）
    ApiTokenQuery,
    /// `Authorization: Bearer ...`（数据源接口）
    Bearer,
}

/// 批量清空范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearScope {
    /// 清空 N 天前的数据
    OlderThanDays(u32),
    /// 清空全部数据
    All,
}

/// 企业微信凭据（随同步请求发送给后端）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WecomCredentials {
    pub corpid: String,
    #[serde(default)]
    pub contact_secret: String,
    #[serde(default)]
    pub customer_secret: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default)]
    pub agentid: String,
}

impl WecomCredentials {
    pub fn is_configured(&self) -> bool {
        !self.corpid.trim().is_empty()
    }
}

/// 后端异步作业类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFeature {
    /// 客户同步；`full = true` 为全量同步，否则增量
    CustomerSync { full: bool },
    /// 客户群标签同步
    GroupTagSync,
    /// 客户群同步
    CustomerGroupSync,
    /// 智能表格同步（后端同步完成后直接返回）
    SpreadsheetSync { spreadsheet_id: String },
    /// 员工同步
    EmployeeSync,
    /// 企业标签同步
    CorpTagSync,
    /// Excel 导入数据源
    ExcelImport {
        source_id: String,
        file: PathBuf,
        incremental: bool,
    },
    /// 批量清空数据源记录
    BatchClear { source_id: String, scope: ClearScope },
}

impl TaskFeature {
    /// 界面区域标识：同一区域同时只允许一个轮询
    pub fn surface(&self) -> String {
        match self {
            TaskFeature::CustomerSync { .. } => "customers".to_string(),
            TaskFeature::GroupTagSync => "group-tags".to_string(),
            TaskFeature::CustomerGroupSync => "customer-groups".to_string(),
            TaskFeature::SpreadsheetSync { spreadsheet_id } => {
                format!("spreadsheet:{}", spreadsheet_id)
            }
            TaskFeature::EmployeeSync => "employees".to_string(),
            TaskFeature::CorpTagSync => "tags".to_string(),
            TaskFeature::ExcelImport { source_id, .. }
            | TaskFeature::BatchClear { source_id, .. } => format!("data-source:{}", source_id),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskFeature::CustomerSync { full: true } => "客户全量同步",
            TaskFeature::CustomerSync { full: false } => "客户增量同步",
            TaskFeature::GroupTagSync => "客户群标签同步",
            TaskFeature::CustomerGroupSync => "客户群同步",
            TaskFeature::SpreadsheetSync { .. } => "智能表格同步",
            TaskFeature::EmployeeSync => "员工同步",
            TaskFeature::CorpTagSync => "企业标签同步",
            TaskFeature::ExcelImport { .. } => "Excel 导入",
            TaskFeature::BatchClear { .. } => "批量清空",
        }
    }

    pub fn auth_scheme(&self) -> AuthScheme {
        match self {
            TaskFeature::ExcelImport { .. } | TaskFeature::BatchClear { .. } => AuthScheme::Bearer,
            _ => AuthScheme::ApiTokenQuery,
        }
    }

    pub fn submit_path(&self) -> String {
        match self {
            TaskFeature::CustomerSync { .. } => "/api/sync/customers".to_string(),
            TaskFeature::GroupTagSync => "/api/sync/group-tags".to_string(),
            TaskFeature::CustomerGroupSync => "/api/sync/customer-groups".to_string(),
            TaskFeature::SpreadsheetSync { spreadsheet_id } => {
                format!("/api/spreadsheet/{}/sync", spreadsheet_id)
            }
            TaskFeature::EmployeeSync => "/api/sync/employees".to_string(),
            TaskFeature::CorpTagSync => "/api/sync/tags".to_string(),
            TaskFeature::ExcelImport { source_id, .. } => {
                format!("/api/data-source/{}/import-excel", source_id)
            }
            TaskFeature::BatchClear { source_id, .. } => {
                format!("/api/data-source/{}/batch-clear", source_id)
            }
        }
    }

    /// 状态查询路径；不支持轮询的作业返回 None
    pub fn status_path(&self, task_id: &TaskId) -> Option<String> {
        match self {
            TaskFeature::CustomerSync { .. } => Some(format!("/api/sync/status/{}", task_id)),
            TaskFeature::GroupTagSync => Some(format!("/api/sync/group-tags/status/{}", task_id)),
            TaskFeature::CustomerGroupSync => {
                Some(format!("/api/sync/customer-groups/status/{}", task_id))
            }
            _ => None,
        }
    }

    /// 停止路径；客户群同步使用 cancel
    pub fn stop_path(&self, task_id: &TaskId) -> Option<String> {
        match self {
            TaskFeature::CustomerSync { .. } => Some(format!("/api/sync/stop/{}", task_id)),
            TaskFeature::GroupTagSync => Some(format!("/api/sync/group-tags/stop/{}", task_id)),
            TaskFeature::CustomerGroupSync => {
                Some(format!("/api/sync/customer-groups/cancel/{}", task_id))
            }
            _ => None,
        }
    }

    /// 作业结束后刷新列表使用的路径
    pub fn refresh_path(&self) -> String {
        match self {
            TaskFeature::CustomerSync { .. } => "/api/customers?page=1&limit=1".to_string(),
            TaskFeature::GroupTagSync => "/api/group-tags".to_string(),
            TaskFeature::CustomerGroupSync => "/api/customer-groups?page=1&limit=1".to_string(),
            TaskFeature::SpreadsheetSync { spreadsheet_id } => {
                format!("/api/spreadsheet/{}", spreadsheet_id)
            }
            TaskFeature::EmployeeSync => "/api/employees".to_string(),
            TaskFeature::CorpTagSync => "/api/tags".to_string(),
            TaskFeature::ExcelImport { source_id, .. }
            | TaskFeature::BatchClear { source_id, .. } => {
                format!("/api/data-source/{}/records?page=1&limit=1", source_id)
            }
        }
    }

    pub fn supports_polling(&self) -> bool {
        matches!(
            self,
            TaskFeature::CustomerSync { .. }
                | TaskFeature::GroupTagSync
                | TaskFeature::CustomerGroupSync
        )
    }

    /// 请求体中是否携带企业微信凭据
    pub fn sends_credentials(&self) -> bool {
        matches!(
            self,
            TaskFeature::CustomerSync { .. }
                | TaskFeature::CustomerGroupSync
                | TaskFeature::SpreadsheetSync { .. }
                | TaskFeature::EmployeeSync
                | TaskFeature::CorpTagSync
        )
    }
}

impl std::fmt::Display for TaskFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.label(), self.surface())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_id() -> TaskId {
        TaskId::new("t1").unwrap()
    }

    #[test]
    fn test_customer_sync_endpoints() {
        let feature = TaskFeature::CustomerSync { full: false };
        assert_eq!(feature.submit_path(), "/api/sync/customers");
        assert_eq!(feature.status_path(&task_id()).unwrap(), "/api/sync/status/t1");
        assert_eq!(feature.stop_path(&task_id()).unwrap(), "/api/sync/stop/t1");
        assert_eq!(feature.auth_scheme(), AuthScheme::ApiTokenQuery);
        assert!(feature.supports_polling());
    }

    #[test]
    fn test_customer_group_uses_cancel() {
        let feature = TaskFeature::CustomerGroupSync;
        assert_eq!(
            feature.stop_path(&task_id()).unwrap(),
            "/api/sync/customer-groups/cancel/t1"
        );
    }

    #[test]
    fn test_data_source_features_share_surface() {
        let import = TaskFeature::ExcelImport {
            source_id: "ds1".to_string(),
            file: PathBuf::from("a.xlsx"),
            incremental: true,
        };
        let clear = TaskFeature::BatchClear {
            source_id: "ds1".to_string(),
            scope: ClearScope::All,
        };
        assert_eq!(import.surface(), clear.surface());
        assert_eq!(import.auth_scheme(), AuthScheme::Bearer);
        assert!(!import.supports_polling());
        assert!(import.status_path(&task_id()).is_none());
        assert!(clear.stop_path(&task_id()).is_none());
    }

    #[test]
    fn test_full_and_incremental_share_surface() {
        assert_eq!(
            TaskFeature::CustomerSync { full: true }.surface(),
            TaskFeature::CustomerSync { full: false }.surface()
        );
    }
}
