//! 接收人签名流程 - 流程层
//!
//! 核心职责：定义"一个接收人"的完整签名流程
//!
//! 流程顺序：
//! 1. 调用签名后端
//! 2. 失败 → 按重试策略等待后再试
//! 3. 次数用完 → 返回最后一次的错误信息

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::infrastructure::SignBackend;
use crate::services::RetryPolicy;
use crate::workflow::recipient_ctx::RecipientCtx;

/// 单个接收人的签名结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientOutcome {
    /// 签名成功
    Signed { attempts: u32 },
    /// 重试用完仍然失败
    Failed { attempts: u32, message: String },
}

impl RecipientOutcome {
    pub fn is_signed(&self) -> bool {
        matches!(self, RecipientOutcome::Signed { .. })
    }
}

/// 接收人签名流程
///
/// - 只处理一个接收人
/// - 不持有进度，不关心批次
/// - 失败只记录，不向上抛
#[derive(Debug, Clone, Copy)]
pub struct RecipientFlow {
    retry: RetryPolicy,
}

impl RecipientFlow {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    pub async fn run(&self, backend: &dyn SignBackend, ctx: &RecipientCtx) -> RecipientOutcome {
        let mut failed_attempts = 0;

        loop {
            let attempt = failed_attempts + 1;

            match backend.sign_one(&ctx.to_request(attempt)).await {
                Ok(()) => {
                    debug!("{} ✓ 第 {} 次尝试签名成功", ctx, attempt);
                    return RecipientOutcome::Signed { attempts: attempt };
                }
                Err(e) => {
                    failed_attempts = attempt;
                    let message = format!("{:#}", e);

                    if !self.retry.should_retry(failed_attempts) {
                        warn!(
                            "{} ❌ 签名失败，已尝试 {} 次: {}",
                            ctx, failed_attempts, message
                        );
                        return RecipientOutcome::Failed {
                            attempts: failed_attempts,
                            message,
                        };
                    }

                    let delay = self.retry.delay_for(failed_attempts);
                    warn!(
                        "{} 签名失败 (尝试 {}/{}), {:?} 后重试: {}",
                        ctx,
                        attempt,
                        self.retry.max_attempts(),
                        delay,
                        message
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SignOneRequest;
    use crate::models::{Document, Recipient, Signature, SignaturePosition, SigningRequest};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// 前 `fail_times` 次失败，之后成功；记录每次收到的请求
    struct FlakySigner {
        fail_times: u32,
        calls: Mutex<Vec<SignOneRequest>>,
    }

    impl FlakySigner {
        fn new(fail_times: u32) -> Self {
            Self {
                fail_times,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SignBackend for FlakySigner {
        async fn sign_one(&self, request: &SignOneRequest) -> anyhow::Result<()> {
            self.calls.lock().push(request.clone());
            if request.attempt <= self.fail_times {
                anyhow::bail!("backend unavailable (attempt {})", request.attempt);
            }
            Ok(())
        }
    }

    fn ctx() -> RecipientCtx {
        let recipient = Recipient::new("r-1", "张三");
        let document = Document::new("doc-1", "证书", vec![recipient.clone()]);
        let signature = Signature::new("sig-1", "image/png", 100);
        let request = SigningRequest::new(
            &document,
            &signature,
            SignaturePosition::new(50.0, 75.0, 100.0, 40.0),
        );
        RecipientCtx::new(&request, &recipient, uuid::Uuid::new_v4(), 1, 1)
    }

    #[tokio::test]
    async fn test_succeeds_after_retries() {
        let signer = FlakySigner::new(2);
        let flow = RecipientFlow::new(RetryPolicy::immediate(3));

        let outcome = flow.run(&signer, &ctx()).await;
        assert_eq!(outcome, RecipientOutcome::Signed { attempts: 3 });

        let calls = signer.calls.lock();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls.iter().map(|c| c.attempt).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        // 所有尝试共用同一个幂等 key
        assert!(calls.iter().all(|c| c.idempotency_key == calls[0].idempotency_key));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let signer = FlakySigner::new(u32::MAX);
        let flow = RecipientFlow::new(RetryPolicy::immediate(2));

        let outcome = flow.run(&signer, &ctx()).await;
        assert_eq!(
            outcome,
            RecipientOutcome::Failed {
                attempts: 2,
                message: "backend unavailable (attempt 2)".to_string(),
            }
        );
        assert_eq!(signer.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let signer = FlakySigner::new(1);
        let flow = RecipientFlow::new(RetryPolicy::immediate(1));

        let outcome = flow.run(&signer, &ctx()).await;
        assert!(!outcome.is_signed());
        assert_eq!(signer.calls.lock().len(), 1);
    }
}
