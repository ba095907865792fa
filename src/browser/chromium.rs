//! 基于 chromiumoxide 的页面自动化实现

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Element};
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::browser::{
    connection, headless, BrowserLauncher, BrowserSession, ElementScript, PageElement,
    PageSession,
};
use crate::config::Config;
use crate::error::{BrowserError, BrowserResult};
use crate::infrastructure::{scripts, JsExecutor};

/// 资源请求数保持不变多久算作网络空闲
const NETWORK_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// 浏览器启动参数
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub headless: bool,
    pub request_timeout: Duration,
    pub executable: Option<String>,
    /// 设置后连接到已运行的浏览器
    pub debug_port: Option<u16>,
}

impl LaunchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            request_timeout: config.browser_timeout(),
            executable: config.browser_executable.clone(),
            debug_port: config.browser_debug_port,
        }
    }
}

/// Chromium 启动器：按配置选择连接已有浏览器或自行启动
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let (browser, engine, attached) = match self.options.debug_port {
            Some(port) => {
                let (browser, engine) = connection::connect_to_browser(port).await?;
                (browser, engine, true)
            }
            None => {
                let (browser, engine) = headless::launch_browser(&self.options).await?;
                (browser, engine, false)
            }
        };

        Ok(Box::new(ChromiumSession {
            browser,
            engine: Some(engine),
            attached,
        }))
    }
}

/// 已启动的 Chromium 浏览器
pub struct ChromiumSession {
    browser: Browser,
    engine: Option<JoinHandle<()>>,
    /// 连接模式下不关闭外部浏览器
    attached: bool,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_page(&mut self) -> BrowserResult<Arc<dyn PageSession>> {
        let page = self.browser.new_page("about:blank").await?;
        debug!("已创建空白页面");
        Ok(Arc::new(ChromiumPage::new(JsExecutor::new(page))))
    }

    async fn close_browser(&mut self) -> BrowserResult<()> {
        if self.attached {
            info!("连接模式，保留外部浏览器进程");
            return Ok(());
        }
        self.browser.close().await?;
        self.browser
            .wait()
            .await
            .map_err(|e| BrowserError::Launch(format!("等待浏览器退出失败: {}", e)))?;
        Ok(())
    }

    async fn shutdown_engine(&mut self) -> BrowserResult<()> {
        if let Some(engine) = self.engine.take() {
            engine.abort();
        }
        Ok(())
    }
}

/// Chromium 页面
pub struct ChromiumPage {
    executor: JsExecutor,
}

impl ChromiumPage {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl PageSession for ChromiumPage {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        self.executor
            .page()
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_network_idle(&self, limit: Duration) -> BrowserResult<()> {
        timeout(limit, self.executor.wait_until_idle(NETWORK_QUIET_PERIOD))
            .await
            .map_err(|_| BrowserError::Timeout(format!("网络空闲等待超过 {:?}", limit)))?
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.executor.page().url().await?.unwrap_or_default())
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.executor.page().content().await?)
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>> {
        let elements = self.executor.page().find_elements(selector).await?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn PageElement>)
            .collect())
    }

    async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        self.executor
            .page()
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        self.executor.page().clone().close().await?;
        Ok(())
    }
}

/// Chromium 元素
pub struct ChromiumElement {
    element: Element,
}

impl ChromiumElement {
    /// 以 `this` 为元素调用函数声明，返回结果值
    async fn call(&self, function_declaration: String) -> BrowserResult<JsonValue> {
        let returns = self.element.call_js_fn(function_declaration, false).await?;
        if let Some(details) = returns.exception_details {
            return Err(BrowserError::Script(details.text));
        }
        Ok(returns.result.value.unwrap_or(JsonValue::Null))
    }

    async fn call_named(&self, name: &str) -> BrowserResult<JsonValue> {
        let source = scripts::lookup(name)
            .ok_or_else(|| BrowserError::Script(format!("未知脚本: {}", name)))?;
        self.call(source.to_string()).await
    }
}

#[async_trait]
impl PageElement for ChromiumElement {
    async fn tag_name(&self) -> BrowserResult<String> {
        let value = self.call_named(scripts::TAG_NAME).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_visible(&self) -> BrowserResult<bool> {
        Ok(self.call_named(scripts::IS_VISIBLE).await?.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self) -> BrowserResult<bool> {
        Ok(self.call_named(scripts::IS_ENABLED).await?.as_bool().unwrap_or(false))
    }

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        Ok(self.element.attribute(name).await?)
    }

    async fn text_content(&self) -> BrowserResult<Option<String>> {
        let value = self.call_named(scripts::TEXT_CONTENT).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&self) -> BrowserResult<()> {
        self.element
            .click()
            .await
            .map_err(|e| BrowserError::Interaction(format!("点击失败: {}", e)))?;
        Ok(())
    }

    async fn fill(&self, value: &str) -> BrowserResult<()> {
        self.call_named(scripts::PREPARE_FILL).await?;
        self.element
            .type_str(value)
            .await
            .map_err(|e| BrowserError::Interaction(format!("输入失败: {}", e)))?;
        Ok(())
    }

    async fn type_char(&self, ch: char, delay: Duration) -> BrowserResult<()> {
        self.element
            .type_str(ch.to_string())
            .await
            .map_err(|e| BrowserError::Interaction(format!("输入失败: {}", e)))?;
        sleep(delay).await;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> BrowserResult<()> {
        self.element
            .press_key(key)
            .await
            .map_err(|e| BrowserError::Interaction(format!("按键 {} 失败: {}", key, e)))?;
        Ok(())
    }

    async fn run_script(&self, script: &ElementScript) -> BrowserResult<JsonValue> {
        debug!("执行元素脚本: {}", script.name());
        self.call(scripts::render(script)).await
    }

    async fn first_descendant(
        &self,
        selector: &str,
    ) -> BrowserResult<Option<Box<dyn PageElement>>> {
        // chromiumoxide 找不到节点时返回错误，这里视为不存在
        match self.element.find_element(selector).await {
            Ok(element) => Ok(Some(Box::new(ChromiumElement { element }))),
            Err(e) => {
                debug!("未找到后代元素 {}: {}", selector, e);
                Ok(None)
            }
        }
    }
}
