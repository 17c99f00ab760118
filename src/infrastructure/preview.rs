//! 签名预览接口 - 基础设施层
//!
//! 渲染由外部服务完成，本 crate 只在调用前做校验和位置优化。

use anyhow::Result;
use async_trait::async_trait;

use crate::models::SignaturePosition;

/// 预览产物
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewArtifact {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 外部预览渲染服务
#[async_trait]
pub trait PreviewRenderer: Send + Sync {
    async fn preview(
        &self,
        document_id: &str,
        signature_id: &str,
        position: &SignaturePosition,
    ) -> Result<PreviewArtifact>;
}
