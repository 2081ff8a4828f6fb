//! Confirmation Adapters - 停止前的用户确认

use async_trait::async_trait;
use std::io::{BufRead, Write};

use crate::application::ports::ConfirmationPort;

/// 终端确认：读取一行输入，`y` / `yes` 视为确认
pub struct StdinConfirmation;

#[async_trait]
impl ConfirmationPort for StdinConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{} [y/N] ", prompt);
            let _ = stdout.flush();

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read confirmation");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Confirmation task failed");
                false
            }
        }
    }
}

/// 固定答复（`--yes` 与测试使用）
pub struct AutoConfirmation {
    answer: bool,
}

impl AutoConfirmation {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

#[async_trait]
impl ConfirmationPort for AutoConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(prompt = %prompt, answer = self.answer, "Auto confirmation");
        self.answer
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes" | "是")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(is_yes("是"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
    }

    #[tokio::test]
    async fn test_auto_confirmation() {
        assert!(AutoConfirmation::new(true).confirm("继续？").await);
        assert!(!AutoConfirmation::new(false).confirm("继续？").await);
    }
}
