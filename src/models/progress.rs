//! 批量签名进度与任务状态

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 单个接收人的最终失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientError {
    pub recipient_id: String,
    pub message: String,
}

/// 批量签名进度
///
/// 只有所属任务可以修改，观察者拿到的都是快照。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// 最近一个处理结束的接收人标签
    pub current: String,
    pub errors: Vec<RecipientError>,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// 已有结果（成功或失败）的接收人数量
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    /// 尚未处理的接收人数量
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed() as f64 / self.total as f64 * 100.0
        }
    }
}

/// 任务状态
///
/// `Idle → Running → {Completed | Cancelled | FailedToStart}`，终态不可再变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Cancelled,
    FailedToStart,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::FailedToStart
        )
    }
}

/// 一次批量签名的最终结果
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub job_id: Uuid,
    pub document_id: String,
    pub state: JobState,
    pub progress: BatchProgress,
    /// 实际开始处理的批次数
    pub batches: usize,
    pub elapsed: Duration,
}

impl BatchOutcome {
    /// 全部完成且没有任何失败
    pub fn is_success(&self) -> bool {
        self.state == JobState::Completed && self.progress.failed == 0
    }

    /// 有成功也有失败
    pub fn is_partial_success(&self) -> bool {
        self.progress.completed > 0 && self.progress.failed > 0
    }

    /// 有接收人被处理，但没有一个成功
    pub fn is_total_failure(&self) -> bool {
        self.progress.failed > 0 && self.progress.completed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(state: JobState, completed: usize, failed: usize) -> BatchOutcome {
        BatchOutcome {
            job_id: Uuid::new_v4(),
            document_id: "doc".to_string(),
            state,
            progress: BatchProgress {
                total: 10,
                completed,
                failed,
                ..Default::default()
            },
            batches: 1,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_outcome_classification() {
        let ok = outcome(JobState::Completed, 10, 0);
        assert!(ok.is_success());
        assert!(!ok.is_partial_success());
        assert!(!ok.is_total_failure());

        let partial = outcome(JobState::Completed, 7, 3);
        assert!(!partial.is_success());
        assert!(partial.is_partial_success());
        assert!(!partial.is_total_failure());

        let failed = outcome(JobState::Completed, 0, 10);
        assert!(failed.is_total_failure());

        // 被取消的任务即便没有失败也不算成功
        let cancelled = outcome(JobState::Cancelled, 4, 0);
        assert!(!cancelled.is_success());
    }

    #[test]
    fn test_progress_counts() {
        let mut progress = BatchProgress::new(4);
        assert_eq!(progress.remaining(), 4);
        assert_eq!(progress.percent(), 0.0);

        progress.completed = 2;
        progress.failed = 1;
        assert_eq!(progress.processed(), 3);
        assert_eq!(progress.remaining(), 1);
        assert_eq!(progress.percent(), 75.0);

        assert_eq!(BatchProgress::new(0).percent(), 100.0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Idle.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(JobState::FailedToStart.is_terminal());
    }
}
