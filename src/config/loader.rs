//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（wecrm.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["wecrm", "wecrm.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `WECRM_`，层级分隔符 `__`）
/// 2. 配置文件（wecrm.toml 或 wecrm.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `WECRM_BACKEND__BASE_URL=http://crm.internal:8000`
/// - `WECRM_AUTH__API_TOKEN=...`
/// - `WECRM_POLL__MAX_DURATION_SECS=0`
/// - `WECRM_WECOM__CORPID=ww0123456789`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("backend.base_url", "http://localhost:8000")?
        .set_default("backend.timeout_secs", 30)?
        .set_default("auth.api_token", "crm-default-token")?
        .set_default("poll.interval_ms", 1000)?
        .set_default("poll.max_duration_secs", 1800)?
        .set_default("poll.max_consecutive_failures", 0)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: WECRM_BACKEND__BASE_URL=http://crm.internal:8000
    builder = builder.add_source(
        Environment::with_prefix("WECRM")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.backend.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Backend base URL cannot be empty".to_string(),
        ));
    }

    if config.backend.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Backend timeout cannot be 0".to_string(),
        ));
    }

    if config.poll.interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Poll interval cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志，不输出密钥）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Backend: {}", config.backend.base_url);
    tracing::info!("Request Timeout: {}s", config.backend.timeout_secs);
    tracing::info!(
        "Session Token: {}",
        if config.auth.session_token.is_some() { "set" } else { "not set" }
    );
    tracing::info!("Poll Interval: {}ms", config.poll.interval_ms);
    match config.poll.max_duration_secs {
        0 => tracing::info!("Poll Max Duration: unlimited"),
        secs => tracing::info!("Poll Max Duration: {}s", secs),
    }
    if config.poll.max_consecutive_failures > 0 {
        tracing::info!(
            "Poll Max Consecutive Failures: {}",
            config.poll.max_consecutive_failures
        );
    }
    match config.credentials() {
        Some(wecom) => tracing::info!("WeCom Corp: {}", wecom.corpid),
        None => tracing::info!("WeCom Corp: (backend saved config)"),
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_base_url() {
        let mut config = AppConfig::default();
        config.backend.base_url = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_interval() {
        let mut config = AppConfig::default();
        config.poll.interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_timeout() {
        let mut config = AppConfig::default();
        config.backend.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
[backend]
base_url = "http://crm.test:9000"

[poll]
interval_ms = 500
max_duration_secs = 0

[wecom]
corpid = "ww-test"
contact_secret = "secret"
"#,
        );

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.backend.base_url, "http://crm.test:9000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.poll.interval_ms, 500);
        assert_eq!(config.poll.max_duration(), None);
        assert_eq!(config.auth.api_token, "crm-default-token");
        let wecom = config.credentials().unwrap();
        assert_eq!(wecom.corpid, "ww-test");
        assert_eq!(wecom.agentid, "");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let file = write_config("[poll]\ninterval_ms = 0\n");
        assert!(matches!(
            load_config_from_path(Some(file.path())),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = load_config_from_path(Some(Path::new("/nonexistent/wecrm.toml")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
