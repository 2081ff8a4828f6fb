//! Query Handlers 实现

mod task_query_handlers;

pub use task_query_handlers::*;
