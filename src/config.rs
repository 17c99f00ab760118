use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::{load_protected_regions, ProtectedRegion};
use crate::services::retry_policy::{Backoff, RetryPolicy};
use crate::services::validator::ValidationRules;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 每批接收人数量（也是批内最大并发数）
    pub batch_size: usize,
    /// 单个接收人最多尝试次数
    pub retry_attempts: u32,
    /// 重试基础间隔（毫秒）
    pub retry_base_delay_ms: u64,
    /// 是否使用指数退避（否则线性）
    pub exponential_backoff: bool,
    /// 批次之间的间隔（毫秒）
    pub inter_batch_delay_ms: u64,
    /// 签名载荷大小上限（字节）
    pub max_signature_bytes: u64,
    /// 接收人数量告警阈值
    pub large_recipient_threshold: usize,
    /// 受保护区域文件，为空时使用默认区域
    pub protected_regions_file: Option<String>,
    /// 签名任务文件
    pub job_file: String,
    /// dry-run 后端每次签名的模拟耗时（毫秒）
    pub dry_run_latency_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry_attempts: 3,
            retry_base_delay_ms: 1000,
            exponential_backoff: false,
            inter_batch_delay_ms: 500,
            max_signature_bytes: 5 * 1024 * 1024,
            large_recipient_threshold: 1000,
            protected_regions_file: None,
            job_file: "signing_job.toml".to_string(),
            dry_run_latency_ms: 50,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的项使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            batch_size: env_parse("BATCH_SIZE", default.batch_size)?,
            retry_attempts: env_parse("RETRY_ATTEMPTS", default.retry_attempts)?,
            retry_base_delay_ms: env_parse("RETRY_BASE_DELAY_MS", default.retry_base_delay_ms)?,
            exponential_backoff: std::env::var("RETRY_BACKOFF")
                .map(|v| v.eq_ignore_ascii_case("exponential"))
                .unwrap_or(default.exponential_backoff),
            inter_batch_delay_ms: env_parse("INTER_BATCH_DELAY_MS", default.inter_batch_delay_ms)?,
            max_signature_bytes: env_parse("MAX_SIGNATURE_BYTES", default.max_signature_bytes)?,
            large_recipient_threshold: env_parse(
                "LARGE_RECIPIENT_THRESHOLD",
                default.large_recipient_threshold,
            )?,
            protected_regions_file: std::env::var("PROTECTED_REGIONS_FILE").ok(),
            job_file: std::env::var("JOB_FILE").unwrap_or(default.job_file),
            dry_run_latency_ms: env_parse("DRY_RUN_LATENCY_MS", default.dry_run_latency_ms)?,
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging)?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base = Duration::from_millis(self.retry_base_delay_ms);
        let backoff = if self.exponential_backoff {
            Backoff::Exponential {
                base,
                max: base.saturating_mul(30),
            }
        } else {
            Backoff::Linear { step: base }
        };
        RetryPolicy::new(self.retry_attempts, backoff)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// 构建校验规则，配置了区域文件时从文件加载受保护区域
    pub fn validation_rules(&self) -> Result<ValidationRules, ConfigError> {
        let protected_regions = match &self.protected_regions_file {
            Some(path) => load_regions(path)?,
            None => ProtectedRegion::default_regions(),
        };

        Ok(ValidationRules {
            max_signature_bytes: self.max_signature_bytes,
            large_recipient_threshold: self.large_recipient_threshold,
            protected_regions,
        })
    }
}

fn load_regions(path: &str) -> Result<Vec<ProtectedRegion>, ConfigError> {
    load_protected_regions(Path::new(path)).map_err(|e| ConfigError::RegionsFile {
        path: path.to_string(),
        message: format!("{:#}", e),
    })
}

fn env_parse<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_policy_is_linear() {
        let config = Config::default();
        let policy = config.retry_policy();

        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_exponential_retry_policy() {
        let config = Config {
            exponential_backoff: true,
            retry_base_delay_ms: 100,
            ..Config::default()
        };
        let policy = config.retry_policy();

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_huge_base_delay_saturates() {
        let config = Config {
            exponential_backoff: true,
            retry_base_delay_ms: u64::MAX,
            ..Config::default()
        };
        let policy = config.retry_policy();

        assert_eq!(policy.delay_for(1), Duration::from_millis(u64::MAX));
        assert!(policy.delay_for(5) >= policy.delay_for(1));
    }

    #[test]
    fn test_validation_rules_default_regions() {
        let rules = Config::default().validation_rules().unwrap();
        assert_eq!(rules.protected_regions, ProtectedRegion::default_regions());
        assert_eq!(rules.max_signature_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_validation_rules_missing_regions_file() {
        let config = Config {
            protected_regions_file: Some("/nonexistent/regions.toml".to_string()),
            ..Config::default()
        };

        let err = config.validation_rules().unwrap_err();
        assert!(matches!(err, ConfigError::RegionsFile { .. }));
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("CERT_BATCH_SIGN_TEST_SIZE", "ten");
        let err = env_parse::<usize>("CERT_BATCH_SIGN_TEST_SIZE", 10).unwrap_err();
        std::env::remove_var("CERT_BATCH_SIGN_TEST_SIZE");

        assert!(matches!(err, ConfigError::EnvVarParseFailed { .. }));
        assert_eq!(env_parse::<usize>("CERT_BATCH_SIGN_TEST_UNSET", 7).unwrap(), 7);
    }
}
