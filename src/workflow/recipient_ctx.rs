//! 接收人签名上下文
//!
//! 封装"我正在给哪份文档的哪个接收人签名"这一信息

use std::fmt::Display;

use uuid::Uuid;

use crate::infrastructure::SignOneRequest;
use crate::models::{Recipient, SignaturePosition, SigningRequest};

/// 接收人签名上下文
#[derive(Debug, Clone)]
pub struct RecipientCtx {
    pub job_id: Uuid,
    pub document_id: String,
    pub signature_id: String,
    pub recipient_id: String,
    /// 进度显示用的标签
    pub label: String,
    /// 接收人在列表中的序号（从1开始）
    pub recipient_index: usize,
    /// 所在批次（从1开始）
    pub batch_num: usize,
    pub position: SignaturePosition,
    pub idempotency_key: Uuid,
}

impl RecipientCtx {
    pub fn new(
        request: &SigningRequest,
        recipient: &Recipient,
        job_id: Uuid,
        recipient_index: usize,
        batch_num: usize,
    ) -> Self {
        Self {
            job_id,
            document_id: request.document_id.clone(),
            signature_id: request.signature_id.clone(),
            recipient_id: recipient.id.clone(),
            label: recipient.label(),
            recipient_index,
            batch_num,
            position: request.position,
            idempotency_key: idempotency_key(
                job_id,
                &request.document_id,
                &request.signature_id,
                &recipient.id,
            ),
        }
    }

    /// 构建第 `attempt` 次尝试的后端请求
    pub fn to_request(&self, attempt: u32) -> SignOneRequest {
        SignOneRequest {
            document_id: self.document_id.clone(),
            recipient_id: self.recipient_id.clone(),
            signature_id: self.signature_id.clone(),
            position: self.position,
            idempotency_key: self.idempotency_key,
            attempt,
        }
    }
}

/// 幂等 key
///
/// 同一任务内对同一接收人的所有重试共用一个 key；
/// 重新提交同一文档会得到新的任务 id，也就是新的 key，不会被后端当成重复请求。
pub fn idempotency_key(
    job_id: Uuid,
    document_id: &str,
    signature_id: &str,
    recipient_id: &str,
) -> Uuid {
    let name = format!(
        "{}\u{1f}{}\u{1f}{}\u{1f}{}",
        job_id, document_id, signature_id, recipient_id
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

impl Display for RecipientCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 {} 批次#{} 接收人#{} {}]",
            self.document_id, self.batch_num, self.recipient_index, self.recipient_id
        )
    }
}
