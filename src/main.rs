use anyhow::Result;
use portal_downloader::utils::logging;
use portal_downloader::{App, Config};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(&config.log_file)?;

    tokio::select! {
        result = run(config) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("⚠️ 用户中断，程序退出");
            Ok(())
        }
    }
}

async fn run(config: Config) -> Result<()> {
    App::initialize(config).await?.run().await;
    Ok(())
}
