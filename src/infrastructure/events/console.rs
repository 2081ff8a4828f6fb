//! Console Presenter - 终端进度输出
//!
//! 订阅全局事件并逐行打印进度

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::{EventPublisher, PollEvent};
use crate::domain::task::progress_bar;

const BAR_WIDTH: usize = 30;

/// 终端进度输出
pub struct ConsolePresenter;

impl ConsolePresenter {
    /// 启动后台打印任务；publisher 释放后任务自行结束
    pub fn spawn(publisher: &Arc<EventPublisher>) -> JoinHandle<()> {
        let rx = publisher.subscribe_global();
        tokio::spawn(Self::run(rx))
    }

    async fn run(mut rx: broadcast::Receiver<PollEvent>) {
        let mut last_line: Option<String> = None;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let Some(line) = render(&event) else {
                        continue;
                    };
                    // 相同的进度行只打印一次
                    if last_line.as_deref() != Some(line.as_str()) {
                        println!("{}", line);
                        last_line = Some(line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Console presenter lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// 单个事件的输出行；结束事件由调用方打印汇总
pub fn render(event: &PollEvent) -> Option<String> {
    match event {
        PollEvent::Progress {
            percent,
            phase_text,
            status,
            ..
        } => {
            Some(format!(
                "{} {:>3}% {} ({})",
                progress_bar(*percent, BAR_WIDTH),
                percent,
                phase_text,
                status
            ))
        }
        PollEvent::PollError {
            error, consecutive, ..
        } => Some(format!(
            "状态查询失败（第{}次），稍后重试：{}",
            consecutive, error
        )),
        PollEvent::Finished { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::PollOutcome;
    use crate::domain::task::{TaskCounters, TaskStatus};

    #[test]
    fn test_render_progress_line() {
        let line = render(&PollEvent::Progress {
            surface: "customers".to_string(),
            task_id: "t1".to_string(),
            status: TaskStatus::Running,
            percent: 50,
            phase_text: "正在处理：15 / 30".to_string(),
            counters: TaskCounters::default(),
        })
        .unwrap();
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(15), "-".repeat(15))));
        assert!(line.contains(" 50% 正在处理：15 / 30"));
    }

    #[test]
    fn test_render_skips_finished() {
        let line = render(&PollEvent::Finished {
            surface: "customers".to_string(),
            task_id: "t1".to_string(),
            outcome: PollOutcome::TimedOut,
            summary: "任务仍在运行，请稍后查看（已处理7 / 50）".to_string(),
        });
        assert_eq!(line, None);
    }

    #[test]
    fn test_render_poll_error() {
        let line = render(&PollEvent::PollError {
            surface: "group-tags".to_string(),
            task_id: "t1".to_string(),
            error: "HTTP 404: 任务不存在".to_string(),
            consecutive: 2,
        });
        assert_eq!(
            line.as_deref(),
            Some("状态查询失败（第2次），稍后重试：HTTP 404: 任务不存在")
        );
    }
}
