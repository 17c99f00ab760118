//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量签名的调度和统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `signing_pipeline` - 提交流水线
//! - 校验请求（阻塞错误直接返回）
//! - 优化签名位置
//! - 交给 `BatchOrchestrator` 执行
//!
//! ### `batch_orchestrator` - 批量签名编排器
//! - 登记/注销任务（JobRegistry）
//! - 分批、批内并发（Semaphore）
//! - 协作式取消，只在批次边界生效
//!
//! ### `progress_tracker` - 进度记录器
//! - 串行化所有进度修改
//! - 在锁内回调 `on_progress`
//!
//! ## 层次关系
//!
//! ```text
//! signing_pipeline (校验 → 优化 → 提交)
//!     ↓
//! batch_orchestrator (处理 Vec<Recipient>)
//!     ↓
//! workflow::RecipientFlow (处理单个 Recipient)
//!     ↓
//! infrastructure (SignBackend / JobRegistry)
//! ```

pub mod batch_orchestrator;
pub mod progress_tracker;
pub mod signing_pipeline;

// 重新导出主要类型
pub use batch_orchestrator::{BatchOrchestrator, SignBatchOptions, SigningJob};
pub use progress_tracker::{ProgressCallback, ProgressTracker};
pub use signing_pipeline::{PreparedSigning, SigningPipeline, SigningReport};
