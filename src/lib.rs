//! # Cert Batch Sign
//!
//! 证书批量签名编排库：把一个签名按指定位置应用到一份文档的所有接收人上
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有共享资源，只暴露能力
//! - `JobRegistry` - 唯一的任务表，保证同一文档同时只有一个任务
//! - `SignBackend` / `PreviewRenderer` - 外部签名与预览服务的接口
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯函数，描述"我能判断什么"
//! - `validator` - 表单与签名文件校验
//! - `position_optimizer` - 签名位置优化
//! - `retry_policy` - 重试次数与退避
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个接收人"的完整签名流程
//! - `RecipientCtx` - 上下文封装（文档 + 接收人 + 幂等 key）
//! - `RecipientFlow` - 签名 → 失败重试 → 结果
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/signing_pipeline` - 校验 → 优化 → 提交
//! - `orchestrator/batch_orchestrator` - 分批、并发、取消、进度
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppResult, ConfigError, SigningError};
pub use infrastructure::{DryRunSigner, JobRegistry, SignBackend, SignOneRequest};
pub use models::{
    BatchOutcome, BatchProgress, Document, JobState, Recipient, RecipientError, Signature,
    SignaturePosition,
};
pub use orchestrator::{BatchOrchestrator, SignBatchOptions, SigningJob, SigningPipeline};
pub use services::{
    optimize_position, validate_signature_file, validate_signing_form, RetryPolicy,
    ValidationResult, ValidationRules,
};
