use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{BrowserError, BrowserResult};

/// 连接到调试端口上已运行的浏览器
///
/// 适合复用一个已经手动登录过的浏览器，登录阶段会直接识别为已登录。
pub async fn connect_to_browser(port: u16) -> BrowserResult<(Browser, JoinHandle<()>)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::Connection {
            port,
            reason: e.to_string(),
        }
    })?;
    debug!("浏览器连接成功");

    let engine = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok((browser, engine))
}
