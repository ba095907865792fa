//! 浏览器会话驱动 - 业务能力层
//!
//! 持有浏览器与唯一的页面，提供启动、打开登录页、登录、进入列表页、翻页、释放等能力。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::browser::{BrowserLauncher, BrowserSession, PageSession};
use crate::config::{Config, LoginTimings};
use crate::error::{BrowserError, BrowserResult};
use crate::models::{LoginStatus, SessionState};
use crate::services::authenticator::Authenticator;
use crate::services::locator::control_is_enabled;
use crate::services::selectors::LocatorCatalog;

/// 列表页内容关键词（不区分大小写）
const LISTING_KEYWORDS: [&str; 4] = ["candidate", "resume", "employee", "talent"];

/// 页面内容是否像记录列表页
pub fn looks_like_listing(content: &str) -> bool {
    let content = content.to_lowercase();
    LISTING_KEYWORDS.iter().any(|k| content.contains(k))
}

/// 浏览器会话驱动
pub struct SessionDriver {
    launcher: Arc<dyn BrowserLauncher>,
    browser: Option<Box<dyn BrowserSession>>,
    page: Option<Arc<dyn PageSession>>,
    catalog: Arc<LocatorCatalog>,
    timings: LoginTimings,
    screenshot_dir: PathBuf,
    navigation_timeout: Duration,
}

impl SessionDriver {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        catalog: Arc<LocatorCatalog>,
        config: &Config,
    ) -> Self {
        Self {
            launcher,
            browser: None,
            page: None,
            catalog,
            timings: config.login_timings.clone(),
            screenshot_dir: PathBuf::from(&config.screenshot_dir),
            navigation_timeout: config.browser_timeout(),
        }
    }

    /// 当前页面
    pub fn page(&self) -> BrowserResult<Arc<dyn PageSession>> {
        self.page.clone().ok_or(BrowserError::NoPage)
    }

    /// 启动浏览器并打开一个页面
    pub async fn initialize_session(&mut self) -> SessionState {
        info!("🌐 初始化浏览器会话");
        let result: BrowserResult<()> = async {
            let mut browser = self.launcher.launch().await?;
            let page = browser.open_page().await;
            // 打开页面失败时也要保留浏览器句柄以便释放
            self.browser = Some(browser);
            self.page = Some(page?);
            Ok(())
        }
        .await;

        match result {
            Ok(_) => {
                info!("✓ 浏览器会话已就绪");
                SessionState::ready()
            }
            Err(e) => {
                error!("❌ 浏览器会话初始化失败: {}", e);
                SessionState::failed(e.to_string())
            }
        }
    }

    /// 打开登录页并等待网络空闲
    pub async fn navigate_to_login(&self, login_url: &str) -> SessionState {
        info!("🔗 打开登录页: {}", login_url);
        let result: BrowserResult<String> = async {
            let page = self.page()?;
            page.goto(login_url).await?;
            page.wait_for_network_idle(self.navigation_timeout).await?;
            page.current_url().await
        }
        .await;

        match result {
            Ok(url) => SessionState::at(url),
            Err(e) => {
                error!("❌ 打开登录页失败: {}", e);
                SessionState::failed(e.to_string())
            }
        }
    }

    /// 登录门户
    pub async fn authenticate(&self, username: &str, password: &str) -> (LoginStatus, SessionState) {
        let page = match self.page() {
            Ok(page) => page,
            Err(e) => {
                return (
                    LoginStatus::Failed,
                    SessionState::failed(e.to_string()).with_login_status(LoginStatus::Failed),
                )
            }
        };
        Authenticator::new(
            page.as_ref(),
            &self.catalog,
            &self.timings,
            &self.screenshot_dir,
        )
        .login(username, password)
        .await
    }

    /// 进入记录列表页
    ///
    /// 依次点击候选导航链接，直到落在内容像列表页的页面上。
    pub async fn go_to_listing(&self) -> (bool, Option<String>) {
        info!("🧭 导航到记录列表页");
        let page = match self.page() {
            Ok(page) => page,
            Err(e) => return (false, Some(e.to_string())),
        };

        let chain = &self.catalog.listing_nav;
        for index in 0..chain.locators.len() {
            let Some(link) = chain.resolve_at(page.as_ref(), index).await else {
                continue;
            };
            if let Err(e) = link.element.click().await {
                debug!("点击导航链接 {} 失败: {}", link.selector, e);
                continue;
            }
            if let Err(e) = page.wait_for_network_idle(self.navigation_timeout).await {
                debug!("等待列表页加载失败: {}", e);
                continue;
            }
            if self.is_listing_page().await {
                info!("✓ 已进入列表页 (通过 {})", link.selector);
                return (true, None);
            }
            debug!("{} 未到达列表页，尝试下一个", link.selector);
        }

        warn!("⚠️ 所有导航链接均未到达列表页");
        (false, Some("Listing page not reachable".to_string()))
    }

    /// 翻到下一页，没有可用的"下一页"控件时返回 false
    pub async fn advance_page(&self) -> bool {
        let Ok(page) = self.page() else {
            return false;
        };

        let chain = &self.catalog.next_page;
        for index in 0..chain.locators.len() {
            let Some(next) = chain.resolve_at(page.as_ref(), index).await else {
                continue;
            };
            if !control_is_enabled(next.element.as_ref()).await {
                debug!("下一页控件 {} 不可用", next.selector);
                continue;
            }
            if let Err(e) = next.element.click().await {
                debug!("点击下一页失败: {}", e);
                continue;
            }
            if let Err(e) = page.wait_for_network_idle(self.navigation_timeout).await {
                warn!("翻页后等待加载超时: {}", e);
            }
            info!("➡️ 已翻到下一页");
            return true;
        }
        false
    }

    /// 当前页面是否为记录列表页
    pub async fn is_listing_page(&self) -> bool {
        match self.page() {
            Ok(page) => page
                .content()
                .await
                .map(|content| looks_like_listing(&content))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// 释放页面、浏览器和事件循环，单项失败只记录日志
    pub async fn teardown(&mut self) {
        info!("🧹 释放浏览器资源");
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!("关闭页面失败: {}", e);
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close_browser().await {
                warn!("关闭浏览器失败: {}", e);
            }
            if let Err(e) = browser.shutdown_engine().await {
                warn!("停止浏览器事件循环失败: {}", e);
            }
        }
        debug!("浏览器资源已释放");
    }
}
