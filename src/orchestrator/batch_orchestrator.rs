//! 批量签名编排器 - 编排层
//!
//! ## 职责
//!
//! 把一次"给一份文档的所有接收人签名"拆成若干批次执行，是整个系统的核心。
//!
//! ## 核心功能
//!
//! 1. **任务登记**：通过 `JobRegistry` 占用文档，同一文档不允许两个任务并存
//! 2. **分批处理**：按输入顺序把接收人切成 `batch_size` 大小的批次，逐批执行
//! 3. **并发控制**：批内使用 Semaphore 限制同时在途的签名调用数
//! 4. **重试**：每个接收人独立按 `RetryPolicy` 重试，失败只记录不中断
//! 5. **进度上报**：每个接收人出结果后回调一次 `on_progress`
//! 6. **协作式取消**：只在批次边界检查取消信号，在途签名允许完成
//!
//! ## 设计特点
//!
//! - 编排器在进程内构造一次，通过 `Arc` 注入，不使用全局单例
//! - 任务句柄由 `JobGuard` 持有，任务和它在途的签名调用都结束后才注销
//! - 任务到达终态后不再修改进度

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppResult, SigningError};
use crate::infrastructure::{JobGuard, JobRegistry, SignBackend};
use crate::models::{
    BatchOutcome, Document, JobState, Recipient, Signature, SignaturePosition, SigningRequest,
};
use crate::orchestrator::progress_tracker::{ProgressCallback, ProgressTracker};
use crate::services::RetryPolicy;
use crate::workflow::{RecipientCtx, RecipientFlow, RecipientOutcome};

/// 批量签名参数
#[derive(Clone)]
pub struct SignBatchOptions {
    /// 每批接收人数量，也是批内并发上限
    pub batch_size: usize,
    pub retry: RetryPolicy,
    /// 批次之间的间隔（限流保护）
    pub inter_batch_delay: Duration,
    pub on_progress: Option<ProgressCallback>,
}

impl Default for SignBatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry: RetryPolicy::default(),
            inter_batch_delay: Duration::from_millis(500),
            on_progress: None,
        }
    }
}

impl SignBatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            retry: config.retry_policy(),
            inter_batch_delay: config.inter_batch_delay(),
            on_progress: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&crate::models::BatchProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for SignBatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignBatchOptions")
            .field("batch_size", &self.batch_size)
            .field("retry", &self.retry)
            .field("inter_batch_delay", &self.inter_batch_delay)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// 批量签名编排器
pub struct BatchOrchestrator {
    backend: Arc<dyn SignBackend>,
    registry: Arc<JobRegistry>,
}

impl BatchOrchestrator {
    pub fn new(backend: Arc<dyn SignBackend>) -> Self {
        Self::with_registry(backend, Arc::new(JobRegistry::new()))
    }

    pub fn with_registry(backend: Arc<dyn SignBackend>, registry: Arc<JobRegistry>) -> Self {
        Self { backend, registry }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// 登记任务并返回待运行的 `SigningJob`
    ///
    /// 登记是同步完成的：返回 `Ok` 时文档已被占用，可以立即被取消。
    /// 参数非法或文档已有任务时返回错误，任务不会启动。
    pub fn start_signing(
        &self,
        document: &Document,
        signature: &Signature,
        position: &SignaturePosition,
        options: SignBatchOptions,
    ) -> AppResult<SigningJob> {
        if options.batch_size == 0 {
            return Err(SigningError::InvalidOptions(
                "batch_size 必须大于 0".to_string(),
            ));
        }

        let guard = self.registry.register(&document.id)?;
        let request = SigningRequest::new(document, signature, *position);
        let semaphore = Arc::new(Semaphore::new(options.batch_size));

        Ok(SigningJob {
            guard: Arc::new(guard),
            request: Arc::new(request),
            options,
            backend: Arc::clone(&self.backend),
            semaphore,
        })
    }

    /// 对文档的所有接收人批量签名
    ///
    /// # 返回
    /// 任务结束（完成或取消）后的最终结果；文档已有任务时返回 `AlreadyRunning`
    pub async fn sign_batch(
        &self,
        document: &Document,
        signature: &Signature,
        position: &SignaturePosition,
        options: SignBatchOptions,
    ) -> AppResult<BatchOutcome> {
        self.start_signing(document, signature, position, options)?
            .run()
            .await
    }

    pub fn cancel_signing(&self, document_id: &str) -> bool {
        self.registry.cancel(document_id)
    }

    pub fn is_signing_in_progress(&self, document_id: &str) -> bool {
        self.registry.is_running(document_id)
    }

    /// 运行中任务的文档列表，供界面轮询
    pub fn list_active_signings(&self) -> Vec<String> {
        self.registry.list_running()
    }
}

/// 已登记、尚未运行的签名任务
///
/// `JobGuard` 由任务本身和它派发的每个接收人 task 共同持有。
/// 任务被丢弃时，已在途的签名调用仍会跑完，文档在最后一个调用结束后才释放。
pub struct SigningJob {
    guard: Arc<JobGuard>,
    request: Arc<SigningRequest>,
    options: SignBatchOptions,
    backend: Arc<dyn SignBackend>,
    semaphore: Arc<Semaphore>,
}

impl SigningJob {
    pub fn job_id(&self) -> Uuid {
        self.guard.job_id()
    }

    pub fn document_id(&self) -> &str {
        &self.request.document_id
    }

    pub fn total(&self) -> usize {
        self.request.total()
    }

    /// 逐批执行签名直到完成或被取消
    pub async fn run(self) -> AppResult<BatchOutcome> {
        let started = Instant::now();

        let batch_size = self.options.batch_size;
        let total = self.request.total();
        let total_batches = (total + batch_size - 1) / batch_size;
        let tracker = Arc::new(ProgressTracker::new(
            total,
            self.options.on_progress.clone(),
        ));
        let flow = RecipientFlow::new(self.options.retry);

        log_job_start(&self.request, batch_size, total_batches);

        let mut batches = 0;
        let mut cancelled = false;

        for (batch_idx, recipients) in self.request.recipients.chunks(batch_size).enumerate() {
            if self.guard.is_cancelled() {
                cancelled = true;
                break;
            }

            let batch_num = batch_idx + 1;
            let batch_start = batch_idx * batch_size;
            batches = batch_num;

            log_batch_start(
                &self.request.document_id,
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + recipients.len(),
                total,
            );

            let batch_result = self
                .process_batch(recipients, batch_start, batch_num, &tracker, flow)
                .await?;

            log_batch_complete(&self.request.document_id, batch_num, &batch_result);

            if batch_num < total_batches {
                self.inter_batch_pause().await;
            }
        }

        let state = if cancelled {
            JobState::Cancelled
        } else {
            JobState::Completed
        };

        let outcome = BatchOutcome {
            job_id: self.guard.job_id(),
            document_id: self.request.document_id.clone(),
            state,
            progress: tracker.snapshot(),
            batches,
            elapsed: started.elapsed(),
        };

        // 本批 task 都已结束，这里是最后一个持有者，先注销再返回
        drop(self.guard);

        log_job_finished(&outcome);
        Ok(outcome)
    }

    /// 处理单个批次
    ///
    /// 批内所有接收人并发执行，等全部出结果后才返回。
    async fn process_batch(
        &self,
        recipients: &[Recipient],
        batch_start: usize,
        batch_num: usize,
        tracker: &Arc<ProgressTracker>,
        flow: RecipientFlow,
    ) -> AppResult<BatchResult> {
        let mut batch_handles = Vec::with_capacity(recipients.len());
        let mut fault = None;

        // 为本批创建并发任务
        for (idx, recipient) in recipients.iter().enumerate() {
            let ctx = RecipientCtx::new(
                &self.request,
                recipient,
                self.guard.job_id(),
                batch_start + idx + 1,
                batch_num,
            );

            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    fault = Some(format!("无法获取并发许可: {}", e));
                    break;
                }
            };

            let backend = Arc::clone(&self.backend);
            let task_tracker = Arc::clone(tracker);
            let task_guard = Arc::clone(&self.guard);
            let task_ctx = ctx.clone();

            let handle: JoinHandle<bool> = tokio::spawn(async move {
                let _permit = permit;
                let _job = task_guard;
                let outcome = flow.run(backend.as_ref(), &task_ctx).await;
                task_tracker.record(
                    task_ctx.recipient_index,
                    &task_ctx.recipient_id,
                    &task_ctx.label,
                    &outcome,
                );
                outcome.is_signed()
            });
            batch_handles.push((ctx, handle));
        }

        // 等待本批已派发的任务全部结束，保证返回后不再有进度修改
        let mut result = BatchResult::default();
        let (contexts, handles): (Vec<_>, Vec<_>) = batch_handles.into_iter().unzip();
        let joined = join_all(handles).await;

        for (ctx, joined) in contexts.into_iter().zip(joined) {
            match joined {
                Ok(true) => result.signed += 1,
                Ok(false) => result.failed += 1,
                Err(e) => {
                    error!("{} 签名任务异常退出: {}", ctx, e);
                    tracker.record(
                        ctx.recipient_index,
                        &ctx.recipient_id,
                        &ctx.label,
                        &RecipientOutcome::Failed {
                            attempts: 0,
                            message: format!("签名任务异常退出: {}", e),
                        },
                    );
                    result.failed += 1;
                }
            }
        }

        match fault {
            Some(message) => Err(SigningError::orchestration(
                self.request.document_id.as_str(),
                message,
            )),
            None => Ok(result),
        }
    }

    /// 关闭并发许可，模拟编排层内部故障
    #[cfg(test)]
    fn close_permits(&self) {
        self.semaphore.close();
    }

    /// 批次间等待，等待期间收到取消信号则提前结束
    async fn inter_batch_pause(&self) {
        let delay = self.options.inter_batch_delay;
        if delay.is_zero() || self.guard.is_cancelled() {
            return;
        }

        let token = self.guard.cancellation_token();
        tokio::select! {
            _ = sleep(delay) => {}
            _ = token.cancelled() => {}
        }
    }
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    signed: usize,
    failed: usize,
}

// ========== 日志辅助函数 ==========

fn log_job_start(request: &SigningRequest, batch_size: usize, total_batches: usize) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 [文档 {}] 开始批量签名: {}",
        request.document_id, request.document_name
    );
    info!(
        "📋 接收人 {} 个，每批 {} 个，共 {} 批",
        request.total(),
        batch_size,
        total_batches
    );
    info!("{}", "=".repeat(60));
}

fn log_batch_start(
    document_id: &str,
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!(
        "📦 [文档 {}] 开始处理第 {}/{} 批，接收人 {}-{} / 共 {} 个",
        document_id, batch_num, total_batches, start, end, total
    );
}

fn log_batch_complete(document_id: &str, batch_num: usize, result: &BatchResult) {
    info!(
        "✓ [文档 {}] 第 {} 批完成: 成功 {}/{}",
        document_id,
        batch_num,
        result.signed,
        result.signed + result.failed
    );
}

fn log_job_finished(outcome: &BatchOutcome) {
    let progress = &outcome.progress;
    match outcome.state {
        JobState::Cancelled => warn!(
            "🛑 [文档 {}] 签名任务已取消: 成功 {}, 失败 {}, 未处理 {}",
            outcome.document_id,
            progress.completed,
            progress.failed,
            progress.remaining()
        ),
        _ => info!(
            "📊 [文档 {}] 签名任务结束: 成功 {}/{}, 失败 {}, 耗时 {:?}",
            outcome.document_id,
            progress.completed,
            progress.total,
            progress.failed,
            outcome.elapsed
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SignOneRequest;
    use crate::models::BatchProgress;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct AlwaysOk;

    #[async_trait]
    impl SignBackend for AlwaysOk {
        async fn sign_one(&self, _request: &SignOneRequest) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// 模拟任务崩溃
    struct Panicking;

    #[async_trait]
    impl SignBackend for Panicking {
        async fn sign_one(&self, request: &SignOneRequest) -> anyhow::Result<()> {
            if request.recipient_id == "r-1" {
                panic!("backend crashed");
            }
            Ok(())
        }
    }

    fn document(n: usize) -> Document {
        let recipients = (0..n)
            .map(|i| Recipient::new(format!("r-{}", i), format!("接收人{}", i)))
            .collect();
        Document::new("doc-1", "证书", recipients)
    }

    fn options(batch_size: usize) -> SignBatchOptions {
        SignBatchOptions {
            batch_size,
            retry: RetryPolicy::immediate(1),
            inter_batch_delay: Duration::ZERO,
            on_progress: None,
        }
    }

    fn signature() -> Signature {
        Signature::new("sig-1", "image/png", 100)
    }

    fn position() -> SignaturePosition {
        SignaturePosition::new(50.0, 75.0, 100.0, 40.0)
    }

    #[tokio::test]
    async fn test_zero_batch_size_fails_to_start() {
        let orchestrator = BatchOrchestrator::new(Arc::new(AlwaysOk));
        let err = orchestrator
            .sign_batch(&document(3), &signature(), &position(), options(0))
            .await
            .unwrap_err();

        assert!(matches!(err, SigningError::InvalidOptions(_)));
        assert_eq!(err.terminal_state(), Some(JobState::FailedToStart));
        assert!(!orchestrator.is_signing_in_progress("doc-1"));
    }

    #[tokio::test]
    async fn test_empty_recipient_list_completes() {
        let orchestrator = BatchOrchestrator::new(Arc::new(AlwaysOk));
        let outcome = orchestrator
            .sign_batch(&document(0), &signature(), &position(), options(10))
            .await
            .unwrap();

        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(outcome.batches, 0);
        assert_eq!(outcome.progress, BatchProgress::new(0));
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_run_reports_job_id_and_final_state() {
        let orchestrator = BatchOrchestrator::new(Arc::new(AlwaysOk));
        let job = orchestrator
            .start_signing(&document(2), &signature(), &position(), options(10))
            .unwrap();

        assert_eq!(job.total(), 2);
        assert_eq!(job.document_id(), "doc-1");
        let job_id = job.job_id();

        let outcome = job.run().await.unwrap();
        assert_eq!(outcome.job_id, job_id);
        assert_eq!(outcome.state, JobState::Completed);
        assert!(!orchestrator.is_signing_in_progress("doc-1"));
    }

    #[tokio::test]
    async fn test_dropping_unstarted_job_releases_document() {
        let orchestrator = BatchOrchestrator::new(Arc::new(AlwaysOk));
        let job = orchestrator
            .start_signing(&document(2), &signature(), &position(), options(10))
            .unwrap();

        assert_eq!(orchestrator.list_active_signings(), vec!["doc-1".to_string()]);
        drop(job);
        assert!(orchestrator.list_active_signings().is_empty());
    }

    #[tokio::test]
    async fn test_orchestration_fault_releases_document() {
        let orchestrator = BatchOrchestrator::new(Arc::new(AlwaysOk));
        let job = orchestrator
            .start_signing(&document(3), &signature(), &position(), options(2))
            .unwrap();
        job.close_permits();

        let err = job.run().await.unwrap_err();

        assert!(matches!(
            err,
            SigningError::Orchestration { ref document_id, .. } if document_id == "doc-1"
        ));
        assert_eq!(err.terminal_state(), None);
        assert!(!orchestrator.is_signing_in_progress("doc-1"));
    }

    #[tokio::test]
    async fn test_panicking_task_counts_as_failure() {
        let orchestrator = BatchOrchestrator::new(Arc::new(Panicking));
        let outcome = orchestrator
            .sign_batch(&document(3), &signature(), &position(), options(10))
            .await
            .unwrap();

        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(outcome.progress.completed, 2);
        assert_eq!(outcome.progress.failed, 1);
        assert_eq!(outcome.progress.errors[0].recipient_id, "r-1");
        assert!(outcome.progress.errors[0].message.contains("签名任务异常退出"));
        assert!(outcome.is_partial_success());
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_recipient() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let opts = options(2).with_progress(move |p| sink.lock().push(p.processed()));

        let orchestrator = BatchOrchestrator::new(Arc::new(AlwaysOk));
        orchestrator
            .sign_batch(&document(5), &signature(), &position(), opts)
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![1, 2, 3, 4, 5]);
    }
}
