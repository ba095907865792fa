use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 文档下载结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Success,
    Failed,
    NotFound,
    Timeout,
}

impl DownloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadStatus::Success => "success",
            DownloadStatus::Failed => "failed",
            DownloadStatus::NotFound => "not_found",
            DownloadStatus::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 列表页上的一条记录
///
/// 由提取阶段创建，下载阶段原地更新状态字段。
/// `processed` 只能通过 [`Record::mark_processed`] 置位，因此处理过的记录一定带有状态。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub url: String,
    /// 二级分组标签（如"职位编号 - 职位名称"），存在时文档保存到对应子目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,
    pub retry_count: u32,
    processed: bool,
    download_status: Option<DownloadStatus>,
    download_path: Option<PathBuf>,
    error_message: Option<String>,
}

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            group_label: None,
            retry_count: 0,
            processed: false,
            download_status: None,
            download_path: None,
            error_message: None,
        }
    }

    pub fn with_group_label(mut self, label: impl Into<String>) -> Self {
        self.group_label = Some(label.into());
        self
    }

    /// 标记为已处理，同时写入结果状态、文件路径和错误信息
    pub fn mark_processed(
        &mut self,
        status: DownloadStatus,
        path: Option<PathBuf>,
        error: Option<String>,
    ) {
        self.processed = true;
        self.download_status = Some(status);
        self.download_path = path;
        self.error_message = error;
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn download_status(&self) -> Option<DownloadStatus> {
        self.download_status
    }

    pub fn download_path(&self) -> Option<&Path> {
        self.download_path.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// 一条记录的下载结果，创建后不可变
#[derive(Debug, Clone, Serialize)]
pub struct DownloadAttempt {
    record_id: String,
    record_name: String,
    status: DownloadStatus,
    file_path: Option<PathBuf>,
    error_message: Option<String>,
    timestamp: DateTime<Local>,
}

impl DownloadAttempt {
    pub fn success(record: &Record, path: PathBuf) -> Self {
        Self {
            record_id: record.id.clone(),
            record_name: record.name.clone(),
            status: DownloadStatus::Success,
            file_path: Some(path),
            error_message: None,
            timestamp: Local::now(),
        }
    }

    pub fn failure(record: &Record, status: DownloadStatus, error: impl Into<String>) -> Self {
        Self {
            record_id: record.id.clone(),
            record_name: record.name.clone(),
            status,
            file_path: None,
            error_message: Some(error.into()),
            timestamp: Local::now(),
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    pub fn status(&self) -> DownloadStatus {
        self.status
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn is_success(&self) -> bool {
        self.status == DownloadStatus::Success
    }
}
