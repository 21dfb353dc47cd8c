//! 应用生命周期 - 编排层
//!
//! 加载任务与输入表 → 校验映射 → 批量生成 → 导出结果 → 输出统计

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{load_job_file, load_product_table};
use crate::orchestrator::batch_processor::{
    BatchControl, BatchOrchestrator, BatchProgress, BatchReport, BatchState,
};
use crate::services::{CompletionClient, LlmService, ResultWriter, SchemaMapper};
use crate::utils::logging::{log_startup, log_table_loaded, print_final_stats};
use crate::workflow::RecordFlow;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 应用主结构
#[derive(Debug)]
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;
        log_startup(&config);
        Ok(Self { config })
    }

    /// 运行应用主逻辑
    ///
    /// 批次因鉴权失败中止时，已有结果仍会写出，随后返回 `BatchAborted`
    pub async fn run(&self) -> AppResult<BatchReport> {
        info!("\n📁 正在加载任务描述: {}", self.config.job_file);
        let job = load_job_file(Path::new(&self.config.job_file)).await?;
        let generation_config = job.generation_config()?;

        let table = load_product_table(Path::new(&self.config.input_csv)).await?;
        log_table_loaded(&self.config.input_csv, table.len(), table.headers());
        if table.is_empty() {
            warn!("⚠️ 输入表没有任何记录");
        }

        // 映射错误在处理任何记录之前返回
        let mapping = SchemaMapper::new(table.headers())
            .build(&job.mapping_request(), &generation_config.template)?;
        let mapping = Arc::new(mapping);

        let client = CompletionClient::new(LlmService::new(&self.config), self.config.retry_policy());
        let orchestrator = BatchOrchestrator::new(
            RecordFlow::with_client(client),
            self.config.max_concurrent_records,
        )
        .with_deadline(self.config.batch_deadline());

        let control = BatchControl::new();
        let ctrl_c = spawn_ctrl_c_listener(control.clone());
        let progress = spawn_progress_logger(control.subscribe());

        let report = orchestrator
            .run(
                table.into_records(),
                mapping.clone(),
                Arc::new(generation_config),
                &control,
            )
            .await;

        ctrl_c.abort();
        progress.abort();

        let writer = ResultWriter::new(
            self.config.output_csv.as_str(),
            mapping.identity_column().map(str::to_string),
        );
        writer.write(&report.results).await?;

        print_final_stats(&report, writer.output_path());

        if let Some(reason) = &report.abort_reason {
            error!("❌ 批次已中止: {}", reason);
            return Err(AppError::BatchAborted {
                reason: reason.clone(),
                completed: report.total() - report.not_attempted_count(),
                total: report.total(),
            });
        }

        Ok(report)
    }
}

fn spawn_ctrl_c_listener(control: BatchControl) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 收到 Ctrl-C，停止派发新记录，等待在途请求结束...");
            control.cancel();
        }
    })
}

fn spawn_progress_logger(mut progress: watch::Receiver<BatchProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = *progress.borrow_and_update();
            if snapshot.state == BatchState::Running && snapshot.completed > 0 {
                info!("⏳ 进度: {}/{}", snapshot.completed, snapshot.total);
            }
        }
    })
}
