//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：单次查询任务状态

mod task_queries;

pub mod handlers;

pub use task_queries::*;
