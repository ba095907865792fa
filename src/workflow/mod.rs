//! 流程层
//!
//! `router` 只根据阶段状态决定下一步；`stages` 定义每个阶段做什么，并负责把错误转换成状态。

pub mod router;
pub mod stages;

pub use router::{next_stage, Stage};
pub use stages::Workflow;
