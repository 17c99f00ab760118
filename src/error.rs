use thiserror::Error;

use crate::models::JobState;
use crate::services::ValidationResult;

/// 签名编排错误类型
///
/// 单个接收人的签名失败不会出现在这里，它们被汇总进 `BatchProgress::errors`；
/// 取消也不是错误，而是任务的终态。
#[derive(Debug, Error)]
pub enum SigningError {
    /// 同一文档已有正在运行的签名任务
    #[error("文档 {document_id} 的签名任务已在运行 (already running)")]
    AlreadyRunning { document_id: String },

    /// 请求未通过校验（阻塞性错误）
    #[error("签名请求校验失败: {}", .0.errors.join("; "))]
    Validation(ValidationResult),

    /// 调用参数非法
    #[error("无效的签名参数: {0}")]
    InvalidOptions(String),

    /// 编排层意外故障，整个任务中止
    #[error("签名编排失败 (文档 {document_id}): {message}")]
    Orchestration {
        document_id: String,
        message: String,
    },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 预览渲染失败
    #[error("预览生成失败: {0}")]
    Preview(#[source] anyhow::Error),
}

impl SigningError {
    pub fn already_running(document_id: impl Into<String>) -> Self {
        SigningError::AlreadyRunning {
            document_id: document_id.into(),
        }
    }

    pub fn orchestration(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        SigningError::Orchestration {
            document_id: document_id.into(),
            message: message.into(),
        }
    }

    /// 该错误对应的任务终态
    ///
    /// 任务尚未开始就被拒绝的错误映射为 `FailedToStart`，运行期故障没有对应终态。
    pub fn terminal_state(&self) -> Option<JobState> {
        match self {
            SigningError::AlreadyRunning { .. }
            | SigningError::Validation(_)
            | SigningError::InvalidOptions(_)
            | SigningError::Config(_) => Some(JobState::FailedToStart),
            SigningError::Orchestration { .. } | SigningError::Preview(_) => None,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// 区域文件加载失败
    #[error("受保护区域文件加载失败 ({path}): {message}")]
    RegionsFile { path: String, message: String },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, SigningError>;
