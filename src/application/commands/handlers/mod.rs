//! Command Handlers 实现

mod task_command_handlers;

pub use task_command_handlers::*;
