//! 签名提交流水线 - 编排层
//!
//! 调用方入口：校验 → 位置优化 → 批量签名。
//! 校验失败时直接返回，不会触发任何签名调用。

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppResult, SigningError};
use crate::infrastructure::{PreviewArtifact, PreviewRenderer};
use crate::models::{BatchOutcome, Document, Signature, SignaturePosition};
use crate::orchestrator::batch_orchestrator::{BatchOrchestrator, SignBatchOptions};
use crate::services::{optimize_position, validate_signing_form, ValidationRules};

/// 已通过校验的签名参数
#[derive(Debug, Clone, Serialize)]
pub struct PreparedSigning {
    /// 优化后的位置
    pub position: SignaturePosition,
    /// 校验警告（不阻塞）
    pub warnings: Vec<String>,
}

/// 一次提交的完整结果
#[derive(Debug, Clone, Serialize)]
pub struct SigningReport {
    pub outcome: BatchOutcome,
    pub position: SignaturePosition,
    pub warnings: Vec<String>,
}

pub struct SigningPipeline {
    orchestrator: Arc<BatchOrchestrator>,
    rules: ValidationRules,
}

impl SigningPipeline {
    pub fn new(orchestrator: Arc<BatchOrchestrator>, rules: ValidationRules) -> Self {
        Self {
            orchestrator,
            rules,
        }
    }

    pub fn orchestrator(&self) -> &Arc<BatchOrchestrator> {
        &self.orchestrator
    }

    /// 校验并优化签名位置
    pub fn prepare(
        &self,
        document: &Document,
        signature: Option<&Signature>,
        position: &SignaturePosition,
    ) -> AppResult<PreparedSigning> {
        let validation = validate_signing_form(document, signature, position, &self.rules);

        for warning in &validation.warnings {
            warn!("[文档 {}] ⚠️ {}", document.id, warning);
        }
        if !validation.is_valid {
            warn!(
                "[文档 {}] ❌ 校验未通过: {}",
                document.id,
                validation.errors.join("; ")
            );
            return Err(SigningError::Validation(validation));
        }

        let optimized = optimize_position(position, document);
        if optimized != *position {
            info!(
                "[文档 {}] 签名位置已调整: ({:.1}, {:.1}, {:.0}×{:.0}) → ({:.1}, {:.1}, {:.0}×{:.0})",
                document.id,
                position.x,
                position.y,
                position.width,
                position.height,
                optimized.x,
                optimized.y,
                optimized.width,
                optimized.height
            );
        }

        Ok(PreparedSigning {
            position: optimized,
            warnings: validation.warnings,
        })
    }

    /// 校验、优化后批量签名
    pub async fn submit(
        &self,
        document: &Document,
        signature: Option<&Signature>,
        position: &SignaturePosition,
        options: SignBatchOptions,
    ) -> AppResult<SigningReport> {
        let prepared = self.prepare(document, signature, position)?;
        let signature = signature.ok_or_else(|| {
            SigningError::InvalidOptions("校验通过但缺少签名".to_string())
        })?;

        let outcome = self
            .orchestrator
            .sign_batch(document, signature, &prepared.position, options)
            .await?;

        Ok(SigningReport {
            outcome,
            position: prepared.position,
            warnings: prepared.warnings,
        })
    }

    /// 校验、优化后交给外部服务渲染预览
    pub async fn preview(
        &self,
        renderer: &dyn PreviewRenderer,
        document: &Document,
        signature: Option<&Signature>,
        position: &SignaturePosition,
    ) -> AppResult<PreviewArtifact> {
        let prepared = self.prepare(document, signature, position)?;
        let signature_id = signature.map(|s| s.id.as_str()).unwrap_or_default();

        renderer
            .preview(&document.id, signature_id, &prepared.position)
            .await
            .map_err(SigningError::Preview)
    }
}
