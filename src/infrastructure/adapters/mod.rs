//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

mod confirmation;
pub mod task_api;

pub use confirmation::{AutoConfirmation, StdinConfirmation};
pub use task_api::*;
