//! 运行状态
//!
//! `RunState` 由编排层独占，按阶段顺序以 `&mut` 传递，没有全局可变状态。

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::models::record::{DownloadAttempt, DownloadStatus, Record};

/// 工作流阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Initialized,
    BrowserSetup,
    LoginSuccess,
    LoginFailed,
    NavigationSuccess,
    NavigationFailed,
    ExtractionComplete,
    DownloadComplete,
    CleanupComplete,
    Error,
    Completed,
}

impl WorkflowPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowPhase::Initialized => "initialized",
            WorkflowPhase::BrowserSetup => "browser_setup",
            WorkflowPhase::LoginSuccess => "login_success",
            WorkflowPhase::LoginFailed => "login_failed",
            WorkflowPhase::NavigationSuccess => "navigation_success",
            WorkflowPhase::NavigationFailed => "navigation_failed",
            WorkflowPhase::ExtractionComplete => "extraction_complete",
            WorkflowPhase::DownloadComplete => "download_complete",
            WorkflowPhase::CleanupComplete => "cleanup_complete",
            WorkflowPhase::Error => "error",
            WorkflowPhase::Completed => "completed",
        }
    }

    /// 是否为终止阶段（进入后不再继续）
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowPhase::Error | WorkflowPhase::Completed)
    }

    /// 状态图中是否存在 `self -> next` 这条边
    pub fn can_transition_to(self, next: WorkflowPhase) -> bool {
        use WorkflowPhase::*;
        match (self, next) {
            (Initialized, BrowserSetup | Error) => true,
            (BrowserSetup, LoginSuccess | LoginFailed | Error) => true,
            (LoginSuccess, NavigationSuccess | NavigationFailed | Error) => true,
            (NavigationSuccess, ExtractionComplete | Error) => true,
            (ExtractionComplete, DownloadComplete | Error) => true,
            (LoginFailed | NavigationFailed | Error | DownloadComplete, CleanupComplete) => true,
            (CleanupComplete, Completed | Error) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 登录结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    Success,
    Failed,
    Timeout,
}

impl LoginStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LoginStatus::Success => "success",
            LoginStatus::Failed => "failed",
            LoginStatus::Timeout => "timeout",
        }
    }
}

/// 浏览器会话快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub is_setup: bool,
    pub current_url: Option<String>,
    pub is_logged_in: bool,
    pub login_status: Option<LoginStatus>,
    pub error_message: Option<String>,
}

impl SessionState {
    /// 页面已就绪
    pub fn ready() -> Self {
        Self {
            is_setup: true,
            ..Self::default()
        }
    }

    /// 页面已导航到 `url`
    pub fn at(url: impl Into<String>) -> Self {
        Self {
            is_setup: true,
            current_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// 已登录
    pub fn logged_in(url: impl Into<String>) -> Self {
        Self {
            is_setup: true,
            current_url: Some(url.into()),
            is_logged_in: true,
            login_status: Some(LoginStatus::Success),
            error_message: None,
        }
    }

    /// 失败快照
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error_message: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_login_status(mut self, status: LoginStatus) -> Self {
        self.login_status = Some(status);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error_message.is_none()
    }
}

/// 运行统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    pub total_records: usize,
    pub successful_downloads: usize,
    pub failed_downloads: usize,
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
}

impl RunStatistics {
    pub fn start(&mut self) {
        self.start_time = Some(Local::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Local::now());
    }

    /// 成功率（百分比），总数为 0 时为 0
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.successful_downloads as f64 / self.total_records as f64 * 100.0
    }

    /// 汇总下载结果
    pub fn record_attempts(&mut self, attempts: &[DownloadAttempt]) {
        for attempt in attempts {
            if attempt.status() == DownloadStatus::Success {
                self.successful_downloads += 1;
            } else {
                self.failed_downloads += 1;
            }
        }
    }

    /// 运行耗时
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// 整个运行过程共享的状态
#[derive(Debug, Clone)]
pub struct RunState {
    phase: WorkflowPhase,
    history: Vec<WorkflowPhase>,
    pub error_message: Option<String>,
    should_continue: bool,
    pub session: SessionState,
    pub records: Vec<Record>,
    pub stats: RunStatistics,
    config: Arc<Config>,
}

impl RunState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            phase: WorkflowPhase::Initialized,
            history: vec![WorkflowPhase::Initialized],
            error_message: None,
            should_continue: true,
            session: SessionState::default(),
            records: Vec::new(),
            stats: RunStatistics::default(),
            config,
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    /// 经历过的所有阶段（按顺序）
    pub fn history(&self) -> &[WorkflowPhase] {
        &self.history
    }

    pub fn should_continue(&self) -> bool {
        self.should_continue
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 进入新阶段
    ///
    /// 只接受状态图中存在的边；进入 ERROR 或 COMPLETED 时继续标志置为 false。
    pub fn enter(&mut self, next: WorkflowPhase) {
        if !self.phase.can_transition_to(next) {
            warn!("⚠️ 忽略非法的阶段切换: {} -> {}", self.phase, next);
            debug_assert!(false, "非法的阶段切换: {} -> {}", self.phase, next);
            return;
        }
        self.phase = next;
        self.history.push(next);
        if next.is_terminal() {
            self.should_continue = false;
        }
    }

    /// 进入失败阶段并记录错误信息
    pub fn fail(&mut self, phase: WorkflowPhase, error: impl Into<String>) {
        self.error_message = Some(error.into());
        self.enter(phase);
    }
}
