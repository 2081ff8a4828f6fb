//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod confirmation;
mod progress_sink;
mod surface_registry;
mod task_api;
mod task_poller;
mod view_refresher;

pub use confirmation::ConfirmationPort;
pub use progress_sink::{NoopProgressSink, ProgressSink};
pub use surface_registry::{PollTicket, RegistryError, SurfaceRegistryPort, TriggerGuard};
pub use task_api::{StopAck, SubmitOutcome, SubmitRequest, TaskApiError, TaskApiPort};
pub use task_poller::{PollOutcome, PollReport, TaskPollerPort};
pub use view_refresher::{ViewRefresh, ViewRefreshPort};
