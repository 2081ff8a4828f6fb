//! In-Memory Surface Registry Implementation

use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{RegistryError, SurfaceRegistryPort};
use crate::domain::task::TaskId;

/// 当前轮询
#[derive(Debug, Clone)]
struct ActivePoll {
    run_id: Uuid,
    task_id: TaskId,
    token: CancellationToken,
}

/// 单个区域的状态
#[derive(Debug, Default)]
struct SurfaceSlot {
    /// 触发按钮已禁用
    busy: bool,
    active: Option<ActivePoll>,
}

/// 内存区域注册表
pub struct InMemorySurfaceRegistry {
    /// surface -> SurfaceSlot
    slots: DashMap<String, SurfaceSlot>,
}

impl InMemorySurfaceRegistry {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 有进行中轮询的区域数
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active.is_some()).count()
    }
}

impl Default for InMemorySurfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceRegistryPort for InMemorySurfaceRegistry {
    fn acquire_trigger(&self, surface: &str) -> Result<(), RegistryError> {
        let mut slot = self.slots.entry(surface.to_string()).or_default();
        if slot.busy {
            return Err(RegistryError::Busy(surface.to_string()));
        }
        slot.busy = true;
        tracing::debug!(surface = %surface, "Trigger disabled");
        Ok(())
    }

    fn release_trigger(&self, surface: &str) {
        if let Some(mut slot) = self.slots.get_mut(surface) {
            slot.busy = false;
            tracing::debug!(surface = %surface, "Trigger enabled");
        }
    }

    fn is_trigger_enabled(&self, surface: &str) -> bool {
        self.slots.get(surface).map(|s| !s.busy).unwrap_or(true)
    }

    fn attach(&self, surface: &str, task_id: &TaskId) -> (Uuid, CancellationToken) {
        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();

        let mut slot = self.slots.entry(surface.to_string()).or_default();
        let previous = slot.active.replace(ActivePoll {
            run_id,
            task_id: task_id.clone(),
            token: token.clone(),
        });

        if let Some(previous) = previous {
            previous.token.cancel();
            tracing::info!(
                surface = %surface,
                previous_task = %previous.task_id,
                task_id = %task_id,
                "Previous poll superseded"
            );
        }

        (run_id, token)
    }

    fn detach(&self, surface: &str, run_id: Uuid) -> bool {
        let Some(mut slot) = self.slots.get_mut(surface) else {
            return false;
        };

        match &slot.active {
            Some(active) if active.run_id == run_id => {
                slot.active = None;
                true
            }
            _ => false,
        }
    }

    fn current_task(&self, surface: &str) -> Option<TaskId> {
        self.slots
            .get(surface)
            .and_then(|s| s.active.as_ref().map(|a| a.task_id.clone()))
    }

    fn cancel(&self, surface: &str) -> bool {
        match self.slots.get(surface).and_then(|s| s.active.clone()) {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{PollTicket, TriggerGuard};

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    #[test]
    fn test_trigger_is_exclusive() {
        let registry = InMemorySurfaceRegistry::new();
        assert!(registry.is_trigger_enabled("customers"));

        registry.acquire_trigger("customers").unwrap();
        assert!(!registry.is_trigger_enabled("customers"));
        assert!(matches!(
            registry.acquire_trigger("customers"),
            Err(RegistryError::Busy(_))
        ));
        // 其他区域互不影响
        assert!(registry.acquire_trigger("group-tags").is_ok());

        registry.release_trigger("customers");
        assert!(registry.is_trigger_enabled("customers"));
    }

    #[test]
    fn test_trigger_guard_releases_on_drop() {
        let registry = Arc::new(InMemorySurfaceRegistry::new());
        {
            let _guard = TriggerGuard::acquire(registry.clone(), "tags").unwrap();
            assert!(!registry.is_trigger_enabled("tags"));
        }
        assert!(registry.is_trigger_enabled("tags"));
    }

    #[test]
    fn test_attach_supersedes_previous_poll() {
        let registry = InMemorySurfaceRegistry::new();
        let (first_run, first_token) = registry.attach("customers", &id("a"));
        let (_, second_token) = registry.attach("customers", &id("b"));

        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
        assert_eq!(registry.current_task("customers"), Some(id("b")));

        // 过期的 run_id 不会清除新轮询
        assert!(!registry.detach("customers", first_run));
        assert_eq!(registry.current_task("customers"), Some(id("b")));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_ticket_detaches_on_drop() {
        let registry = Arc::new(InMemorySurfaceRegistry::new());
        let ticket = PollTicket::attach(registry.clone(), "customer-groups", id("g1"));
        assert_eq!(registry.current_task("customer-groups"), Some(id("g1")));

        drop(ticket);
        assert_eq!(registry.current_task("customer-groups"), None);
    }

    #[test]
    fn test_cancel_signals_current_poll() {
        let registry = Arc::new(InMemorySurfaceRegistry::new());
        assert!(!registry.cancel("customers"));

        let ticket = PollTicket::attach(registry.clone(), "customers", id("t1"));
        assert!(registry.cancel("customers"));
        assert!(ticket.is_cancelled());
    }
}
