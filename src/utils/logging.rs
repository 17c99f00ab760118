/// 日志工具模块
///
/// 初始化 tracing 订阅器，并提供 CLI 输出用的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::BatchOutcome;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug 或 info。重复调用是安全的。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `batch_size`: 每批数量
/// - `retry_attempts`: 最多尝试次数
pub fn log_startup(batch_size: usize, retry_attempts: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量证书签名模式");
    info!("📊 每批数量: {} | 最多尝试: {} 次", batch_size, retry_attempts);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(outcome: &BatchOutcome) {
    let progress = &outcome.progress;
    info!("\n{}", "=".repeat(60));
    info!("📊 签名任务统计 ({:?})", outcome.state);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", progress.completed, progress.total);
    info!("❌ 失败: {}", progress.failed);
    if progress.remaining() > 0 {
        info!("⏸️ 未处理: {}", progress.remaining());
    }
    for err in &progress.errors {
        info!("   - {}: {}", err.recipient_id, truncate_text(&err.message, 80));
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
