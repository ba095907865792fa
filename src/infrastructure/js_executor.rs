//! JS 执行器 - 基础设施层
//!
//! 持有 Page 资源，只暴露页面级"执行 JS"的能力

use std::time::{Duration, Instant};

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{BrowserError, BrowserResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// JS 执行器
///
/// 职责：
/// - 持有 Page
/// - 暴露 eval() 能力
/// - 提供基于脚本轮询的网络空闲等待
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> BrowserResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        result
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> BrowserResult<T> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| BrowserError::Script(e.to_string()))
    }

    /// 等待文档加载完成，且资源请求数在 `quiet` 时间内不再增长
    ///
    /// CDP 没有现成的 networkidle 事件，这里用 readyState 加资源计数近似。
    /// 调用方负责用超时包住本函数。
    pub async fn wait_until_idle(&self, quiet: Duration) -> BrowserResult<()> {
        loop {
            let ready: String = self.eval_as("document.readyState").await?;
            if ready == "complete" {
                break;
            }
            sleep(POLL_INTERVAL).await;
        }

        let mut last_count: Option<u64> = None;
        let mut stable_since = Instant::now();
        loop {
            let count: u64 = self
                .eval_as("performance.getEntriesByType('resource').length")
                .await?;
            if last_count != Some(count) {
                last_count = Some(count);
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= quiet {
                debug!("网络空闲 (资源数: {})", count);
                return Ok(());
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}
