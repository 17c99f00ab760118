//! 签名任务注册表 - 基础设施层
//!
//! 持有"文档 → 取消信号"的映射，保证同一文档同一时刻最多只有一个任务。
//! 所有读写都经过同一把锁，注册是原子的"检查并插入"，冲突时拒绝而不是覆盖。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SigningError;

/// 注册表内部保存的任务句柄
#[derive(Debug)]
struct JobHandle {
    job_id: Uuid,
    cancel_token: CancellationToken,
    created_at: DateTime<Utc>,
}

/// 任务句柄的只读快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub job_id: Uuid,
    pub document_id: String,
    pub created_at: DateTime<Utc>,
    pub cancel_requested: bool,
}

/// 签名任务注册表
///
/// 进程内构造一次，通过 `Arc` 共享给编排器和取消调用方。
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, JobHandle>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为文档注册一个新任务
    ///
    /// # 返回
    /// 成功时返回 `JobGuard`，guard 被 drop 时自动注销；
    /// 文档已有任务时返回 `SigningError::AlreadyRunning`，原任务不受影响。
    pub fn register(self: &Arc<Self>, document_id: &str) -> Result<JobGuard, SigningError> {
        let mut jobs = self.jobs.lock();

        if let Some(existing) = jobs.get(document_id) {
            warn!(
                "[文档 {}] ⚠️ 已有签名任务 {} 在运行，拒绝重复注册",
                document_id, existing.job_id
            );
            return Err(SigningError::already_running(document_id));
        }

        let handle = JobHandle {
            job_id: Uuid::new_v4(),
            cancel_token: CancellationToken::new(),
            created_at: Utc::now(),
        };
        let guard = JobGuard {
            registry: Arc::clone(self),
            document_id: document_id.to_string(),
            job_id: handle.job_id,
            cancel_token: handle.cancel_token.clone(),
            created_at: handle.created_at,
        };
        jobs.insert(document_id.to_string(), handle);

        debug!("[文档 {}] 注册签名任务 {}", document_id, guard.job_id);
        Ok(guard)
    }

    /// 请求取消文档的签名任务
    ///
    /// 只发出信号，任务会在下一个批次边界停下。没有运行中的任务时返回 false。
    pub fn cancel(&self, document_id: &str) -> bool {
        let jobs = self.jobs.lock();
        match jobs.get(document_id) {
            Some(handle) => {
                handle.cancel_token.cancel();
                info!("[文档 {}] 🛑 已请求取消签名任务 {}", document_id, handle.job_id);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, document_id: &str) -> bool {
        self.jobs.lock().contains_key(document_id)
    }

    /// 所有运行中任务的文档 id（已排序）
    pub fn list_running(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn job_info(&self, document_id: &str) -> Option<JobInfo> {
        self.jobs.lock().get(document_id).map(|handle| JobInfo {
            job_id: handle.job_id,
            document_id: document_id.to_string(),
            created_at: handle.created_at,
            cancel_requested: handle.cancel_token.is_cancelled(),
        })
    }

    /// 只注销属于 `job_id` 的条目
    fn deregister(&self, document_id: &str, job_id: Uuid) -> bool {
        let mut jobs = self.jobs.lock();
        match jobs.get(document_id) {
            Some(handle) if handle.job_id == job_id => {
                jobs.remove(document_id);
                debug!("[文档 {}] 注销签名任务 {}", document_id, job_id);
                true
            }
            _ => false,
        }
    }
}

/// 任务所有权凭证
///
/// 持有期间文档被占用；drop 时（正常结束、取消、出错或 future 被丢弃）注销。
#[derive(Debug)]
pub struct JobGuard {
    registry: Arc<JobRegistry>,
    document_id: String,
    job_id: Uuid,
    cancel_token: CancellationToken,
    created_at: DateTime<Utc>,
}

impl JobGuard {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.registry.deregister(&self.document_id, self.job_id);
    }
}
