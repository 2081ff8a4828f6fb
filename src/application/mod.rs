//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TaskApi、TaskPoller、SurfaceRegistry、ProgressSink 等）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    handlers::{StopTaskHandler, SubmitTaskHandler, WatchTaskHandler, STOP_CONFIRM_PROMPT},
    StopTaskCommand, StopTaskResponse, SubmitTaskCommand, SubmitTaskResponse, WatchTaskCommand,
    WatchTaskResponse,
};

pub use error::ApplicationError;

pub use ports::{
    // Confirmation
    ConfirmationPort,
    // Progress
    NoopProgressSink,
    ProgressSink,
    // Surface registry
    PollTicket,
    RegistryError,
    SurfaceRegistryPort,
    TriggerGuard,
    // Task API
    StopAck,
    SubmitOutcome,
    SubmitRequest,
    TaskApiError,
    TaskApiPort,
    // Poller
    PollOutcome,
    PollReport,
    TaskPollerPort,
    // View refresh
    ViewRefresh,
    ViewRefreshPort,
};

pub use queries::{
    handlers::{GetTaskStatusHandler, TaskStatusResponse},
    GetTaskStatus,
};
