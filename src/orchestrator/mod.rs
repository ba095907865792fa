//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (组装依赖、统计)
//!     ↓
//! workflow (阶段路由与阶段实现，持有 RunState 的唯一写入权)
//!     ↓
//! services (能力层：登录 / 提取 / 下载)
//!     ↓
//! browser + infrastructure (页面自动化能力、JsExecutor)
//! ```

pub mod runner;

pub use runner::App;
