use anyhow::Result;
use cert_batch_sign::utils::logging;
use cert_batch_sign::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let all_signed = App::initialize(config)?.run().await?;
    if !all_signed {
        std::process::exit(2);
    }

    Ok(())
}
