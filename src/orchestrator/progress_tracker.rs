//! 批量签名进度记录器 - 编排层
//!
//! 一个任务的所有接收人 task 共享同一个记录器。
//! 每次修改和随后的回调都在同一把锁内完成，回调看到的计数严格单调不减。

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::models::{BatchProgress, RecipientError};
use crate::workflow::RecipientOutcome;

/// 进度回调
///
/// 在记录器的锁内同步调用，回调里不要阻塞，也不要再访问同一个任务的记录器。
pub type ProgressCallback = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

struct TrackerState {
    progress: BatchProgress,
    /// 已经出结果的接收人序号，保证每人只计一次
    recorded: HashSet<usize>,
}

pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    on_progress: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: usize, on_progress: Option<ProgressCallback>) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                progress: BatchProgress::new(total),
                recorded: HashSet::new(),
            }),
            on_progress,
        }
    }

    /// 记录一个接收人的最终结果
    ///
    /// # 参数
    /// - `recipient_index`: 接收人序号（从1开始），同一序号只记录第一次
    /// - `recipient_id` / `label`: 接收人 id 和显示标签
    /// - `outcome`: 签名流程的结果
    ///
    /// # 返回
    /// 本次是否真的修改了进度
    pub fn record(
        &self,
        recipient_index: usize,
        recipient_id: &str,
        label: &str,
        outcome: &RecipientOutcome,
    ) -> bool {
        let mut state = self.state.lock();

        if !state.recorded.insert(recipient_index) {
            return false;
        }
        if state.progress.processed() >= state.progress.total {
            error!(
                "进度计数已满 ({}/{})，忽略接收人 {}",
                state.progress.processed(),
                state.progress.total,
                recipient_id
            );
            return false;
        }

        let progress = &mut state.progress;
        match outcome {
            RecipientOutcome::Signed { .. } => progress.completed += 1,
            RecipientOutcome::Failed { message, .. } => {
                progress.failed += 1;
                progress.errors.push(RecipientError {
                    recipient_id: recipient_id.to_string(),
                    message: message.clone(),
                });
            }
        }
        progress.current = label.to_string();

        if let Some(callback) = &self.on_progress {
            callback(&state.progress);
        }
        true
    }

    pub fn snapshot(&self) -> BatchProgress {
        self.state.lock().progress.clone()
    }
}
