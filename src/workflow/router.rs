//! 阶段路由
//!
//! 每个阶段结束后只看当前所处的阶段状态决定下一步：符合预期则继续，否则直接进入清理。

use crate::models::WorkflowPhase;

/// 流程中的一个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SetupBrowser,
    Login,
    NavigateToListing,
    ExtractRecords,
    DownloadDocuments,
    Cleanup,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::SetupBrowser => "setup_browser",
            Stage::Login => "login",
            Stage::NavigateToListing => "navigate_to_listing",
            Stage::ExtractRecords => "extract_records",
            Stage::DownloadDocuments => "download_documents",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn proceed_if(phase: WorkflowPhase, expected: WorkflowPhase, next: Stage) -> Option<Stage> {
    if phase == expected {
        Some(next)
    } else {
        Some(Stage::Cleanup)
    }
}

/// `completed` 阶段结束、状态为 `phase` 时的下一个阶段；清理之后返回 `None`
pub fn next_stage(completed: Stage, phase: WorkflowPhase) -> Option<Stage> {
    match completed {
        Stage::SetupBrowser => proceed_if(phase, WorkflowPhase::BrowserSetup, Stage::Login),
        Stage::Login => proceed_if(phase, WorkflowPhase::LoginSuccess, Stage::NavigateToListing),
        Stage::NavigateToListing => {
            proceed_if(phase, WorkflowPhase::NavigationSuccess, Stage::ExtractRecords)
        }
        Stage::ExtractRecords => {
            proceed_if(phase, WorkflowPhase::ExtractionComplete, Stage::DownloadDocuments)
        }
        Stage::DownloadDocuments => Some(Stage::Cleanup),
        Stage::Cleanup => None,
    }
}
