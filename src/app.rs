//! 命令行应用
//!
//! 读取任务文件，用 dry-run 后端跑一遍完整的批量签名流程。
//! Ctrl-C 会向正在运行的任务发送取消信号。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{DryRunSigner, JobRegistry};
use crate::models::{load_job_file, BatchProgress};
use crate::orchestrator::{BatchOrchestrator, SignBatchOptions, SigningPipeline};
use crate::services::{validate_signature_file, ValidationRules};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    rules: ValidationRules,
    registry: Arc<JobRegistry>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(config.batch_size, config.retry_attempts);

        let rules = config
            .validation_rules()
            .context("无法加载校验规则")?;

        Ok(Self {
            config,
            rules,
            registry: Arc::new(JobRegistry::new()),
        })
    }

    /// 运行应用主逻辑
    ///
    /// # 返回
    /// 全部接收人签名成功时返回 true
    pub async fn run(&self) -> Result<bool> {
        let job = load_job_file(Path::new(&self.config.job_file)).await?;

        if let Some(signature) = &job.signature {
            let file_check = validate_signature_file(signature, &self.rules);
            for warning in &file_check.warnings {
                warn!("⚠️ 签名文件: {}", warning);
            }
            if !file_check.is_valid {
                anyhow::bail!("签名文件不合法: {}", file_check.errors.join("; "));
            }
        }

        let backend = DryRunSigner::new()
            .with_latency(Duration::from_millis(self.config.dry_run_latency_ms))
            .failing(job.fail_recipients.iter().cloned());
        let orchestrator = Arc::new(BatchOrchestrator::with_registry(
            Arc::new(backend),
            Arc::clone(&self.registry),
        ));
        let pipeline = SigningPipeline::new(Arc::clone(&orchestrator), self.rules.clone());

        let verbose = self.config.verbose_logging;
        let options = SignBatchOptions::from_config(&self.config)
            .with_progress(move |p| log_progress(p, verbose));

        // Ctrl-C → 取消当前文档的任务
        let document_id = job.document.id.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到 Ctrl-C，正在取消签名任务...");
                orchestrator.cancel_signing(&document_id);
            }
        });

        let report = pipeline
            .submit(&job.document, job.signature.as_ref(), &job.position, options)
            .await;
        ctrl_c.abort();

        let report = report?;
        logging::print_final_stats(&report.outcome);
        if verbose {
            info!("{}", serde_json::to_string_pretty(&report)?);
        }

        Ok(report.outcome.is_success())
    }
}

fn log_progress(progress: &BatchProgress, verbose: bool) {
    let processed = progress.processed();
    if verbose || processed == progress.total || processed % 10 == 0 {
        info!(
            "⏳ 进度 {}/{} ({:.0}%) 失败 {} | 最近: {}",
            processed,
            progress.total,
            progress.percent(),
            progress.failed,
            progress.current
        );
    }
}
