//! Task API Adapter - CRM 后端任务接口实现

mod dto;
mod fake_task_client;
mod http_task_client;

pub use dto::{ApiEnvelope, TaskStatusDto};
pub use fake_task_client::{FakeReply, FakeStep, FakeSubmission, FakeTaskClient};
pub use http_task_client::{HttpTaskClient, HttpTaskClientConfig};
