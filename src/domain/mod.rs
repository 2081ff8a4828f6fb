//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Task Context: 后端异步任务的状态机、快照与进度投影
//! - Feature Context: 各类作业（同步、导入、清空）的端点目录

pub mod feature;
pub mod task;
