//! Events - 轮询事件发布与终端输出

mod console;
mod publisher;

pub use console::{render, ConsolePresenter};
pub use publisher::{EventPublisher, PollEvent};
