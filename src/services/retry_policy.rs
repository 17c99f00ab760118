//! 重试策略 - 业务能力层
//!
//! 只描述"最多试几次、每次之间等多久"，不负责真正的等待。

use std::time::Duration;

/// 退避方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 不等待
    None,
    /// 第 n 次失败后等待 `n × step`
    Linear { step: Duration },
    /// 第 n 次失败后等待 `base × 2^(n-1)`，不超过 `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// 第 `failed_attempts` 次失败之后、下一次尝试之前的等待时间
    ///
    /// 对 `failed_attempts` 单调不减。
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Linear { step } => step.saturating_mul(failed_attempts),
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(failed_attempts - 1);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// 单个接收人的重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` 是总尝试次数（包含第一次），至少为 1
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// 不等待的重试策略，测试里用
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::None)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        self.backoff.delay_for(failed_attempts)
    }

    /// 失败 `failed_attempts` 次之后是否还能再试
    pub fn should_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }
}

impl Default for RetryPolicy {
    /// 3 次尝试，线性退避 1s
    fn default() -> Self {
        Self::new(
            3,
            Backoff::Linear {
                step: Duration::from_secs(1),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff() {
        let backoff = Backoff::Linear {
            step: Duration::from_millis(250),
        };
        assert_eq!(backoff.delay_for(0), Duration::ZERO);
        assert_eq!(backoff.delay_for(1), Duration::from_millis(250));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(1000));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(500),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(500));
        assert_eq!(backoff.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_is_monotonic() {
        let variants = [
            Backoff::None,
            Backoff::Linear {
                step: Duration::from_millis(10),
            },
            Backoff::Exponential {
                base: Duration::from_millis(10),
                max: Duration::from_secs(1),
            },
        ];

        for backoff in variants {
            let mut previous = Duration::ZERO;
            for n in 0..64 {
                let delay = backoff.delay_for(n);
                assert!(delay >= previous, "{:?} decreased at attempt {}", backoff, n);
                previous = delay;
            }
        }
    }

    #[test]
    fn test_retry_policy_attempts() {
        let policy = RetryPolicy::immediate(0);
        assert_eq!(policy.max_attempts(), 1);
        assert!(policy.should_retry(0));
        assert!(!policy.should_retry(1));

        let policy = RetryPolicy::default();
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
