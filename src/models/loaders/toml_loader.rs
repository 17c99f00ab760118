use crate::models::document::Document;
use crate::models::position::{ProtectedRegion, SignaturePosition};
use crate::models::signature::Signature;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// 签名任务文件（TOML）
///
/// ```toml
/// [document]
/// id = "doc-2024-01"
/// name = "结业证书"
/// page_count = 1
///
/// [[document.recipients]]
/// id = "r-1"
/// name = "张三"
///
/// [signature]
/// id = "sig-1"
/// name = "院长签名"
/// mime_type = "image/png"
/// size_bytes = 20480
///
/// [position]
/// x = 60.0
/// y = 75.0
/// width = 150.0
/// height = 60.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningJobFile {
    pub document: Document,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    pub position: SignaturePosition,
    /// 模拟失败的接收人 id（仅 dry-run 使用）
    #[serde(default)]
    pub fail_recipients: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RegionsFile {
    #[serde(default)]
    regions: Vec<ProtectedRegion>,
}

/// 从 TOML 文件加载签名任务
pub async fn load_job_file(path: &Path) -> Result<SigningJobFile> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取任务文件: {}", path.display()))?;

    let job: SigningJobFile = toml::from_str(&content)
        .with_context(|| format!("无法解析任务文件: {}", path.display()))?;

    tracing::info!(
        "成功加载任务文件 {}: 文档 {} 共 {} 个接收人",
        path.file_name().unwrap_or_default().to_string_lossy(),
        job.document.id,
        job.document.recipients.len()
    );

    Ok(job)
}

/// 从 TOML 文件加载受保护区域列表
///
/// 文件不存在时报错；文件中没有 `regions` 时返回空列表。
pub fn load_protected_regions(path: &Path) -> Result<Vec<ProtectedRegion>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取区域文件: {}", path.display()))?;

    let parsed: RegionsFile = toml::from_str(&content)
        .with_context(|| format!("无法解析区域文件: {}", path.display()))?;

    Ok(parsed.regions)
}
