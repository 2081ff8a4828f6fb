//! wecrm - 企业微信 CRM 后台作业客户端
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Task Context: 任务快照、状态、计数、进度视图
//! - Feature Context: 后端作业类型与接口路径
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TaskApi, TaskPoller, SurfaceRegistry, ProgressSink, Confirmation）
//! - Commands: 提交 / 跟踪 / 停止
//! - Queries: 单次状态查询
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP Task Client, Fake Task Client, 终端确认
//! - Memory: SurfaceRegistry 内存实现
//! - Worker: TaskPoller 轮询
//! - Events: 进度事件发布与终端输出

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
