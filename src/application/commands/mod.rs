//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：提交作业、跟踪任务、停止任务

mod task_commands;

pub mod handlers;

pub use task_commands::*;
