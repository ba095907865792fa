use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::LaunchOptions;
use crate::error::{BrowserError, BrowserResult};

/// 启动本地浏览器（无头或有界面）
///
/// # 返回
/// 返回浏览器句柄和后台事件循环任务
pub async fn launch_browser(options: &LaunchOptions) -> BrowserResult<(Browser, JoinHandle<()>)> {
    info!(
        "🚀 启动浏览器 ({})...",
        if options.headless { "无头模式" } else { "有界面模式" }
    );

    let mut builder = BrowserConfig::builder()
        .request_timeout(options.request_timeout)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
        ]);

    if !options.headless {
        builder = builder.with_head();
    }

    if let Some(executable) = &options.executable {
        debug!("浏览器路径: {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::Launch(e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::Launch(e.to_string())
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let engine = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok((browser, engine))
}
