//! 流程阶段 - 流程层
//!
//! 每个阶段读取并修改 `RunState`，自己处理所有失败，只通过阶段状态把结果交给路由。

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::browser::BrowserLauncher;
use crate::config::Config;
use crate::models::{LoginStatus, RunState, WorkflowPhase};
use crate::services::{
    DocumentFetcher, DownloadEngine, DownloadSettings, Extractor, LocatorCatalog, SessionDriver,
};
use crate::workflow::router::{next_stage, Stage};

/// 没有任何成功下载时的最终错误信息
pub const NO_DOWNLOADS_MESSAGE: &str = "No documents downloaded";

/// 完整流程：启动浏览器 → 登录 → 进入列表页 → 提取记录 → 下载 → 清理
pub struct Workflow {
    driver: SessionDriver,
    extractor: Extractor,
    engine: DownloadEngine,
}

impl Workflow {
    pub fn new(driver: SessionDriver, extractor: Extractor, engine: DownloadEngine) -> Self {
        Self {
            driver,
            extractor,
            engine,
        }
    }

    /// 用浏览器启动器、下载客户端和选择器目录组装流程
    pub fn assemble(
        config: &Config,
        launcher: Arc<dyn BrowserLauncher>,
        fetcher: Arc<dyn DocumentFetcher>,
        catalog: LocatorCatalog,
    ) -> Self {
        let extractor = Extractor::new(catalog.record_items.clone());
        let engine = DownloadEngine::new(
            fetcher,
            catalog.document_links.clone(),
            DownloadSettings::from_config(config),
        );
        let driver = SessionDriver::new(launcher, Arc::new(catalog), config);
        Self::new(driver, extractor, engine)
    }

    /// 从第一个阶段开始，按路由依次执行直到清理完成
    pub async fn run(&mut self, state: &mut RunState) {
        let mut stage = Some(Stage::SetupBrowser);
        while let Some(current) = stage {
            info!("▶️ 阶段: {}", current);
            self.execute(current, state).await;
            info!("   阶段 {} 结束，当前状态: {}", current, state.phase());
            stage = next_stage(current, state.phase());
        }
    }

    async fn execute(&mut self, stage: Stage, state: &mut RunState) {
        match stage {
            Stage::SetupBrowser => self.setup_browser(state).await,
            Stage::Login => self.login(state).await,
            Stage::NavigateToListing => self.navigate_to_listing(state).await,
            Stage::ExtractRecords => self.extract_records(state).await,
            Stage::DownloadDocuments => self.download_documents(state).await,
            Stage::Cleanup => self.cleanup(state).await,
        }
    }

    pub async fn setup_browser(&mut self, state: &mut RunState) {
        state.enter(WorkflowPhase::BrowserSetup);

        let session = self.driver.initialize_session().await;
        if !session.is_setup {
            let message = session
                .error_message
                .clone()
                .unwrap_or_else(|| "Browser setup failed".to_string());
            state.session = session;
            state.fail(WorkflowPhase::Error, message);
            return;
        }
        state.session = session;
        info!("✓ 浏览器已就绪");
    }

    pub async fn login(&mut self, state: &mut RunState) {
        let (login_url, username, password) = {
            let config = state.config();
            (
                config.login_url.clone(),
                config.username.clone(),
                config.password.clone(),
            )
        };

        let session = self.driver.navigate_to_login(&login_url).await;
        if session.current_url.is_none() {
            state.session = session;
            state.fail(WorkflowPhase::LoginFailed, "Failed to navigate to login page");
            return;
        }
        state.session = session;

        let (status, session) = self.driver.authenticate(&username, &password).await;
        state.session = session;
        match status {
            LoginStatus::Success => {
                info!("✅ 登录成功");
                state.enter(WorkflowPhase::LoginSuccess);
            }
            other => {
                error!("❌ 登录失败: {}", other.as_str());
                state.fail(
                    WorkflowPhase::LoginFailed,
                    format!("Login failed: {}", other.as_str()),
                );
            }
        }
    }

    pub async fn navigate_to_listing(&mut self, state: &mut RunState) {
        let (reached, reason) = self.driver.go_to_listing().await;
        if reached {
            state.enter(WorkflowPhase::NavigationSuccess);
        } else {
            error!("❌ 无法进入列表页: {}", reason.as_deref().unwrap_or("unknown"));
            state.fail(
                WorkflowPhase::NavigationFailed,
                "Failed to navigate to listing page",
            );
        }
    }

    /// 逐页提取记录，最多 `max_pages` 页，没有下一页时提前结束
    pub async fn extract_records(&mut self, state: &mut RunState) {
        let (max_pages, page_delay) = {
            let config = state.config();
            (config.max_pages, config.page_delay())
        };

        let page = match self.driver.page() {
            Ok(page) => page,
            Err(e) => {
                state.fail(WorkflowPhase::Error, e.to_string());
                return;
            }
        };

        for page_number in 1..=max_pages {
            let found = self
                .extractor
                .extract_current_page(page.as_ref(), state.records.len())
                .await;
            if !found.is_empty() {
                info!("📄 第 {} 页: {} 条记录", page_number, found.len());
                state.records.extend(found);
            }

            if page_number == max_pages {
                info!("已达到最大页数 {}", max_pages);
                break;
            }
            if !self.driver.advance_page().await {
                break;
            }
            sleep(page_delay).await;
        }

        state.stats.total_records = state.records.len();
        info!("✓ 提取完成，共 {} 条记录", state.records.len());
        state.enter(WorkflowPhase::ExtractionComplete);
    }

    pub async fn download_documents(&mut self, state: &mut RunState) {
        if state.records.is_empty() {
            warn!("⚠️ 没有需要下载的记录");
            state.enter(WorkflowPhase::DownloadComplete);
            return;
        }

        let page = match self.driver.page() {
            Ok(page) => page,
            Err(e) => {
                state.fail(WorkflowPhase::Error, e.to_string());
                return;
            }
        };

        let attempts = self.engine.download_all(&mut state.records, page).await;
        state.stats.record_attempts(&attempts);
        info!(
            "📊 下载结束: 成功 {} / 失败 {}",
            state.stats.successful_downloads, state.stats.failed_downloads
        );
        state.enter(WorkflowPhase::DownloadComplete);
    }

    /// 释放浏览器资源并给出最终状态：至少一份成功下载才算完成
    pub async fn cleanup(&mut self, state: &mut RunState) {
        self.driver.teardown().await;

        if !state.phase().can_transition_to(WorkflowPhase::CleanupComplete) {
            warn!("⚠️ 从 {} 进入清理，按错误处理", state.phase());
            state.fail(
                WorkflowPhase::Error,
                format!("Unexpected phase before cleanup: {}", state.phase()),
            );
        }
        state.enter(WorkflowPhase::CleanupComplete);

        if state.stats.successful_downloads > 0 {
            state.enter(WorkflowPhase::Completed);
        } else {
            if state.error_message.is_none() {
                state.error_message = Some(NO_DOWNLOADS_MESSAGE.to_string());
            }
            state.enter(WorkflowPhase::Error);
        }
    }
}
