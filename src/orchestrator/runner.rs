//! 应用入口 - 编排层
//!
//! 负责组装浏览器启动器、下载客户端和选择器目录，驱动一次完整运行并输出汇总。

use std::sync::Arc;

use tracing::info;

use crate::browser::{ChromiumLauncher, LaunchOptions};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::RunState;
use crate::services::{HttpFetcher, LocatorCatalog};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::Workflow;

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    workflow: Workflow,
}

impl App {
    /// 初始化应用：校验配置、加载选择器目录、创建浏览器启动器和下载客户端
    pub async fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;
        log_startup(&config);

        let catalog = LocatorCatalog::load(config.selectors_file.as_deref())?;
        let launcher = Arc::new(ChromiumLauncher::new(LaunchOptions::from_config(&config)));
        let fetcher = Arc::new(HttpFetcher::new(config.download_timeout())?);
        let workflow = Workflow::assemble(&config, launcher, fetcher, catalog);

        Ok(Self {
            config: Arc::new(config),
            workflow,
        })
    }

    /// 运行完整流程，返回最终状态
    ///
    /// 单条记录或单个阶段的失败体现在返回的状态里，不作为错误返回。
    pub async fn run(mut self) -> RunState {
        let mut state = RunState::new(self.config.clone());
        state.stats.start();

        self.workflow.run(&mut state).await;

        state.stats.finish();
        print_final_stats(&state, &self.config.log_file);
        info!("👋 程序结束");
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ConfigError};

    #[tokio::test]
    async fn test_initialize_rejects_missing_credentials() {
        let result = App::initialize(Config::default()).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::MissingVar { .. }))
        ));
    }

    #[tokio::test]
    async fn test_initialize_reports_unreadable_selector_file() {
        let config = Config {
            username: "jdoe".into(),
            password: "secret".into(),
            login_url: "https://portal.test/signin".into(),
            selectors_file: Some("/nonexistent/selectors.toml".into()),
            ..Config::default()
        };
        let result = App::initialize(config).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::SelectorsRead { .. }))
        ));
    }
}
