//! Memory Layer - In-Memory State Management
//!
//! 实现 SurfaceRegistry，管理各界面区域的触发按钮与当前轮询

mod surface_registry;

pub use surface_registry::InMemorySurfaceRegistry;
