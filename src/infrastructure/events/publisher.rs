//! Event Publisher Implementation
//!
//! 轮询进度事件推送（按区域订阅 + 全局广播）

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{PollOutcome, PollReport, ProgressSink, TaskApiError};
use crate::domain::task::{ProgressView, TaskCounters, TaskId, TaskSnapshot, TaskStatus};

/// 轮询事件类型
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum PollEvent {
    /// 进度更新
    Progress {
        surface: String,
        task_id: String,
        status: TaskStatus,
        percent: u8,
        phase_text: String,
        counters: TaskCounters,
    },
    /// 状态查询失败（轮询继续）
    PollError {
        surface: String,
        task_id: String,
        error: String,
        consecutive: u32,
    },
    /// 轮询结束
    Finished {
        surface: String,
        task_id: String,
        outcome: PollOutcome,
        summary: String,
    },
}

impl PollEvent {
    pub fn surface(&self) -> &str {
        match self {
            PollEvent::Progress { surface, .. }
            | PollEvent::PollError { surface, .. }
            | PollEvent::Finished { surface, .. } => surface,
        }
    }
}

/// 事件发布器
pub struct EventPublisher {
    /// surface -> broadcast sender
    surface_channels: DashMap<String, broadcast::Sender<PollEvent>>,
    /// 所有区域的事件
    global_channel: broadcast::Sender<PollEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(100);
        Self {
            surface_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<PollEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅指定区域的事件
    pub fn subscribe(&self, surface: &str) -> broadcast::Receiver<PollEvent> {
        if let Some(sender) = self.surface_channels.get(surface) {
            return sender.subscribe();
        }

        let (tx, rx) = broadcast::channel(100);
        self.surface_channels.insert(surface.to_string(), tx);
        rx
    }

    pub fn publish(&self, event: PollEvent) {
        if let Some(sender) = self.surface_channels.get(event.surface()) {
            if let Err(e) = sender.send(event.clone()) {
                tracing::debug!(surface = %event.surface(), error = %e, "No surface subscribers");
            }
        }

        if let Err(e) = self.global_channel.send(event) {
            tracing::trace!(error = %e, "No global subscribers");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for EventPublisher {
    fn on_progress(&self, surface: &str, snapshot: &TaskSnapshot, view: &ProgressView) {
        self.publish(PollEvent::Progress {
            surface: surface.to_string(),
            task_id: snapshot.task_id.to_string(),
            status: view.status,
            percent: view.percent,
            phase_text: view.phase_text.clone(),
            counters: view.counters,
        });
    }

    fn on_poll_error(&self, surface: &str, task_id: &TaskId, error: &TaskApiError, consecutive: u32) {
        self.publish(PollEvent::PollError {
            surface: surface.to_string(),
            task_id: task_id.to_string(),
            error: error.to_string(),
            consecutive,
        });
    }

    fn on_finished(&self, surface: &str, report: &PollReport) {
        self.publish(PollEvent::Finished {
            surface: surface.to_string(),
            task_id: report.task_id.to_string(),
            outcome: report.outcome.clone(),
            summary: report.summary(),
        });
    }
}
