//! wecrm - 企业微信 CRM 后台作业命令行
//!
//! 提交同步/导入作业，按固定间隔轮询任务状态并在终端显示进度
//!
//! - Domain: task/, feature/
//! - Application: commands, queries, ports
//! - Infrastructure: adapters, memory, worker, events

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

use wecrm::application::{
    ApplicationError, GetTaskStatus, GetTaskStatusHandler, PollOutcome, PollReport,
    StopTaskCommand, StopTaskHandler, StopTaskResponse, SubmitRequest, SubmitTaskCommand, SubmitTaskHandler,
    SurfaceRegistryPort, WatchTaskCommand, WatchTaskHandler,
};
use wecrm::config::{load_config_from_path, print_config, AppConfig};
use wecrm::domain::feature::{ClearScope, TaskFeature};
use wecrm::domain::task::{TaskId, TaskOutcome};
use wecrm::infrastructure::adapters::{AutoConfirmation, StdinConfirmation};
use wecrm::infrastructure::{
    ConsolePresenter, EventPublisher, HttpTaskClient, HttpTaskClientConfig,
    InMemorySurfaceRegistry, TaskPoller, TaskPollerConfig,
};

#[derive(Debug, Parser)]
#[command(name = "wecrm")]
#[command(about = "企业微信 CRM 后台作业工具", long_about = None)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, value_name = "FILE", env = "WECRM_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// 日志级别（覆盖配置文件）
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 同步客户（默认增量）
    SyncCustomers {
        /// 全量同步
        #[arg(long)]
        full: bool,
    },
    /// 同步客户群标签
    SyncGroupTags,
    /// 同步客户群
    SyncCustomerGroups,
    /// 同步在线表格
    SyncSpreadsheet { id: String },
    /// 同步员工
    SyncEmployees,
    /// 同步企业标签
    SyncTags,
    /// 导入 Excel 到数据源
    ImportExcel {
        source: String,
        file: PathBuf,
        /// 增量导入（跳过已存在的记录）
        #[arg(long)]
        incremental: bool,
    },
    /// 批量清空数据源记录
    BatchClear {
        source: String,
        /// 清空 N 天前的记录
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        days: Option<u32>,
        /// 清空全部记录
        #[arg(long)]
        all: bool,
    },
    /// 跟踪已存在的任务
    Watch { feature: PollingFeature, task_id: String },
    /// 查询一次任务状态
    Status { feature: PollingFeature, task_id: String },
    /// 停止任务
    Stop {
        feature: PollingFeature,
        task_id: String,
        /// 跳过确认
        #[arg(long)]
        yes: bool,
    },
}

/// 有任务状态接口的作业
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PollingFeature {
    Customers,
    GroupTags,
    CustomerGroups,
}

impl From<PollingFeature> for TaskFeature {
    fn from(feature: PollingFeature) -> Self {
        match feature {
            PollingFeature::Customers => TaskFeature::CustomerSync { full: false },
            PollingFeature::GroupTags => TaskFeature::GroupTagSync,
            PollingFeature::CustomerGroups => TaskFeature::CustomerGroupSync,
        }
    }
}

/// 组装好的依赖
struct App {
    config: AppConfig,
    client: Arc<HttpTaskClient>,
    registry: Arc<InMemorySurfaceRegistry>,
    publisher: Arc<EventPublisher>,
    poller: Arc<TaskPoller>,
}

impl App {
    fn build(config: AppConfig) -> anyhow::Result<Self> {
        let mut client_config = HttpTaskClientConfig::new(&config.backend.base_url)
            .with_timeout(config.backend.timeout_secs)
            .with_api_token(&config.auth.api_token);
        if let Some(token) = &config.auth.session_token {
            client_config = client_config.with_session_token(token);
        }
        let client = Arc::new(HttpTaskClient::new(client_config)?);

        let registry = Arc::new(InMemorySurfaceRegistry::new());
        let publisher = Arc::new(EventPublisher::new());

        let poller_config = TaskPollerConfig {
            interval: config.poll.interval(),
            max_duration: config.poll.max_duration(),
            max_consecutive_failures: config.poll.max_consecutive_failures,
        };
        let poller = Arc::new(TaskPoller::new(
            poller_config,
            client.clone(),
            publisher.clone(),
        ));

        Ok(Self {
            config,
            client,
            registry,
            publisher,
            poller,
        })
    }

    fn stop_handler(&self, confirm: bool) -> StopTaskHandler {
        let confirmation: Arc<dyn wecrm::application::ConfirmationPort> = if confirm {
            Arc::new(AutoConfirmation::new(true))
        } else {
            Arc::new(StdinConfirmation)
        };
        StopTaskHandler::new(self.client.clone(), self.registry.clone(), confirmation)
    }

    async fn submit(&self, feature: TaskFeature) -> anyhow::Result<()> {
        let handler = SubmitTaskHandler::new(
            self.client.clone(),
            self.poller.clone(),
            self.registry.clone(),
            self.client.clone(),
        );
        let command = SubmitTaskCommand {
            feature: feature.clone(),
            request: SubmitRequest {
                credentials: self.config.credentials(),
            },
        };

        let _presenter = ConsolePresenter::spawn(&self.publisher);
        let work = handler.handle(command);
        tokio::pin!(work);

        let response = self.until_done(&feature, &mut work).await?;

        if let Some(task_id) = &response.task_id {
            tracing::debug!(task_id = %task_id, "Task finished");
        }
        if let Some(refreshed) = &response.refreshed {
            if let Some(total) = refreshed.total {
                println!("{}：当前共 {} 条", feature.label(), total);
            }
        }
        println!("{}", response.summary);

        match &response.report {
            Some(report) => exit_status(report),
            None => Ok(()),
        }
    }

    async fn watch(&self, feature: TaskFeature, task_id: TaskId) -> anyhow::Result<()> {
        let handler = WatchTaskHandler::new(
            self.poller.clone(),
            self.registry.clone(),
            self.client.clone(),
        );

        let _presenter = ConsolePresenter::spawn(&self.publisher);
        let work = handler.handle(WatchTaskCommand {
            feature: feature.clone(),
            task_id,
        });
        tokio::pin!(work);

        let response = self.until_done(&feature, &mut work).await?;
        println!("{}", response.summary);
        exit_status(&response.report)
    }

    /// 等待作业结束
    ///
    /// 第一次 Ctrl-C 请求停止任务（需确认），再次 Ctrl-C 放弃跟踪
    async fn until_done<T, F>(&self, feature: &TaskFeature, work: &mut std::pin::Pin<&mut F>) -> anyhow::Result<T>
    where
        F: std::future::Future<Output = Result<T, ApplicationError>>,
    {
        let surface = feature.surface();
        let mut stop_requested = false;
        // 停止确认在独立任务中等待输入，轮询不受影响
        let mut stops: JoinSet<Result<StopTaskResponse, ApplicationError>> = JoinSet::new();

        loop {
            tokio::select! {
                result = work.as_mut() => {
                    stops.abort_all();
                    return result.map_err(anyhow::Error::from);
                }
                Some(joined) = stops.join_next() => {
                    match joined {
                        Ok(Ok(response)) => {
                            stop_requested = true;
                            println!("{}（再次 Ctrl-C 放弃等待）", response.message);
                        }
                        Ok(Err(ApplicationError::Cancelled)) => println!("继续同步"),
                        Ok(Err(ApplicationError::NoActiveTask(_))) => {
                            println!("任务尚未创建，再次 Ctrl-C 退出");
                            stop_requested = true;
                        }
                        Ok(Err(e)) => println!("停止失败：{}", e),
                        Err(e) => tracing::error!(error = %e, "Stop request task failed"),
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
                        return work.as_mut().await.map_err(anyhow::Error::from);
                    }

                    if stop_requested || !stops.is_empty() || !feature.supports_polling() {
                        stops.abort_all();
                        println!("已停止跟踪，任务仍在后台运行");
                        if !self.registry.cancel(&surface) {
                            anyhow::bail!("已中断");
                        }
                        continue;
                    }

                    let handler = self.stop_handler(false);
                    let command = StopTaskCommand {
                        feature: feature.clone(),
                        task_id: None,
                    };
                    stops.spawn(async move { handler.handle(command).await });
                }
            }
        }
    }

    async fn status(&self, feature: TaskFeature, task_id: TaskId) -> anyhow::Result<()> {
        let handler = GetTaskStatusHandler::new(self.client.clone());
        let response = handler.handle(GetTaskStatus { feature, task_id }).await?;

        println!("{}", serde_json::to_string_pretty(&response.snapshot)?);
        println!("{} {}% {}", response.view.status, response.view.percent, response.view.phase_text);
        Ok(())
    }

    async fn stop(&self, feature: TaskFeature, task_id: TaskId, yes: bool) -> anyhow::Result<()> {
        let response = self
            .stop_handler(yes)
            .handle(StopTaskCommand {
                feature,
                task_id: Some(task_id),
            })
            .await;

        match response {
            Ok(response) => {
                println!("{}", response.message);
                Ok(())
            }
            Err(ApplicationError::Cancelled) => {
                println!("已取消");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// 失败类结果以非零状态退出
fn exit_status(report: &PollReport) -> anyhow::Result<()> {
    match &report.outcome {
        PollOutcome::Finished(TaskOutcome::Failed { reason }) => anyhow::bail!("任务失败：{}", reason),
        PollOutcome::Lost { message } => anyhow::bail!("任务丢失：{}", message),
        PollOutcome::Unreachable { last_error } => anyhow::bail!("后端不可达：{}", last_error),
        _ => Ok(()),
    }
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},wecrm={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let mut config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    init_tracing(&config);
    print_config(&config);

    let app = App::build(config)?;

    match cli.command {
        Command::SyncCustomers { full } => app.submit(TaskFeature::CustomerSync { full }).await,
        Command::SyncGroupTags => app.submit(TaskFeature::GroupTagSync).await,
        Command::SyncCustomerGroups => app.submit(TaskFeature::CustomerGroupSync).await,
        Command::SyncSpreadsheet { id } => {
            app.submit(TaskFeature::SpreadsheetSync { spreadsheet_id: id })
                .await
        }
        Command::SyncEmployees => app.submit(TaskFeature::EmployeeSync).await,
        Command::SyncTags => app.submit(TaskFeature::CorpTagSync).await,
        Command::ImportExcel {
            source,
            file,
            incremental,
        } => {
            app.submit(TaskFeature::ExcelImport {
                source_id: source,
                file,
                incremental,
            })
            .await
        }
        Command::BatchClear { source, days, all } => {
            let scope = match (all, days) {
                (true, _) => ClearScope::All,
                (false, Some(days)) => ClearScope::OlderThanDays(days),
                (false, None) => anyhow::bail!("需要 --days 或 --all"),
            };
            app.submit(TaskFeature::BatchClear {
                source_id: source,
                scope,
            })
            .await
        }
        Command::Watch { feature, task_id } => {
            let task_id = TaskId::new(task_id).context("invalid task id")?;
            app.watch(feature.into(), task_id).await
        }
        Command::Status { feature, task_id } => {
            let task_id = TaskId::new(task_id).context("invalid task id")?;
            app.status(feature.into(), task_id).await
        }
        Command::Stop {
            feature,
            task_id,
            yes,
        } => {
            let task_id = TaskId::new(task_id).context("invalid task id")?;
            app.stop(feature.into(), task_id, yes).await
        }
    }
}
