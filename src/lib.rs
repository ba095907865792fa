//! # Portal Downloader
//!
//! 登录门户、逐页提取记录、并发下载每条记录的 PDF 文档。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure / Browser）
//! - `browser/` - 页面自动化能力边界（trait）及 Chromium 实现
//! - `infrastructure/` - `JsExecutor` 与元素脚本表
//!
//! ### ② 业务能力层（Services）
//! - `SessionDriver` / `Authenticator` - 会话、登录、导航、翻页
//! - `Extractor` - 列表页记录提取
//! - `DownloadEngine` - 限流下载、落盘、校验
//!
//! ### ③ 流程层（Workflow）
//! - `router` - 按阶段状态决定下一步
//! - `stages` - 各阶段实现，错误在阶段内转换为状态
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator::App` - 组装依赖，运行并输出汇总

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{DownloadAttempt, DownloadStatus, Record, RunState, WorkflowPhase};
pub use orchestrator::App;
pub use workflow::Workflow;
