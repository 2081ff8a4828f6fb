//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::domain::feature::WecomCredentials;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 后端配置
    #[serde(default)]
    pub backend: BackendConfig,

    /// 鉴权配置
    #[serde(default)]
    pub auth: AuthConfig,

    /// 轮询配置
    #[serde(default)]
    pub poll: PollConfig,

    /// 企业微信凭据；未配置时后端使用已保存的配置
    #[serde(default)]
    pub wecom: Option<WecomCredentials>,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 已填写 corpid 的凭据
    pub fn credentials(&self) -> Option<WecomCredentials> {
        self.wecom.clone().filter(|c| c.is_configured())
    }
}

/// 后端配置
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// CRM 后端基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 单次请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// 鉴权配置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// 同步类接口的 `api_token` 查询参数
    #[serde(default = "default_api_token")]
    pub api_token: String,

    /// 数据源接口的 Bearer token
    #[serde(default)]
    pub session_token: Option<String>,
}

fn default_api_token() -> String {
    "crm-default-token".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_token: default_api_token(),
            session_token: None,
        }
    }
}

/// 轮询配置
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// 轮询间隔（毫秒）
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// 最大轮询时长（秒），0 表示不限
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u64,

    /// 连续失败多少次后放弃，0 表示不限
    #[serde(default)]
    pub max_consecutive_failures: u32,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_duration() -> u64 {
    1800 // 30 分钟
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_duration_secs: default_max_duration(),
            max_consecutive_failures: 0,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        match self.max_duration_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
