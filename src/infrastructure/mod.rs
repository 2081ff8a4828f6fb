//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod memory;
pub mod worker;

pub use adapters::{HttpTaskClient, HttpTaskClientConfig};
pub use events::{ConsolePresenter, EventPublisher, PollEvent};
pub use memory::InMemorySurfaceRegistry;
pub use worker::{TaskPoller, TaskPollerConfig};
