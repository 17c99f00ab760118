//! 签名后端 - 基础设施层
//!
//! 真正的签名由外部服务完成，这里只定义调用接口。
//! 编排层会对同一接收人重复调用，后端应按 `idempotency_key` 去重。

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::SignaturePosition;

/// 单个接收人的签名请求
#[derive(Debug, Clone, Serialize)]
pub struct SignOneRequest {
    pub document_id: String,
    pub recipient_id: String,
    pub signature_id: String,
    pub position: SignaturePosition,
    /// 同一 (文档, 签名, 接收人) 的所有尝试共用一个 key
    pub idempotency_key: Uuid,
    /// 第几次尝试（从 1 开始）
    pub attempt: u32,
}

/// 外部签名后端
#[async_trait]
pub trait SignBackend: Send + Sync {
    /// 为一个接收人生成签名证书，失败时返回错误信息
    async fn sign_one(&self, request: &SignOneRequest) -> Result<()>;
}

/// 只打日志的签名后端
///
/// CLI 演示和本地联调使用；可以指定一组总是失败的接收人。
#[derive(Debug, Default)]
pub struct DryRunSigner {
    latency: Duration,
    failing_recipients: HashSet<String>,
}

impl DryRunSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing<I, S>(mut self, recipient_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_recipients
            .extend(recipient_ids.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl SignBackend for DryRunSigner {
    async fn sign_one(&self, request: &SignOneRequest) -> Result<()> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        if self.failing_recipients.contains(&request.recipient_id) {
            debug!(
                "[dry-run] 接收人 {} 第 {} 次签名失败",
                request.recipient_id, request.attempt
            );
            anyhow::bail!("dry-run: 接收人 {} 被配置为失败", request.recipient_id);
        }

        info!(
            "[dry-run] ✓ 文档 {} | 接收人 {} | 签名 {} | 位置 ({:.1}, {:.1}) | key {}",
            request.document_id,
            request.recipient_id,
            request.signature_id,
            request.position.x,
            request.position.y,
            request.idempotency_key
        );
        Ok(())
    }
}
