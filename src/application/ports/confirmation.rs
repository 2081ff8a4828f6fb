//! Confirmation Port - 破坏性操作前的交互确认

use async_trait::async_trait;

#[async_trait]
pub trait ConfirmationPort: Send + Sync {
    /// 返回 true 表示用户确认
    async fn confirm(&self, prompt: &str) -> bool;
}
