//! 下载引擎 - 业务能力层
//!
//! 对每条记录：在共享页面上打开详情页、找到文档链接，再用独立的 HTTP 客户端下载、落盘、校验。
//! 最多 K 条记录同时处理；页面导航和链接查找持有页面锁，字节下载在锁外并行。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::fs;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::PageSession;
use crate::config::Config;
use crate::error::DownloadError;
use crate::models::{DownloadAttempt, DownloadStatus, Record};
use crate::services::extraction::resolve_link;
use crate::services::fetcher::DocumentFetcher;
use crate::services::file_store::{
    sanitize_filename, validate_pdf, write_document, DOCUMENT_EXTENSION,
};
use crate::services::locator::LocatorChain;

/// 下载参数
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub folder: PathBuf,
    pub max_concurrent: usize,
    /// 首次请求之后的最大重试次数
    pub max_retries: u32,
    /// 第 n 次重试前等待 `retry_delay * n`
    pub retry_delay: Duration,
    pub navigation_timeout: Duration,
}

impl DownloadSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            folder: PathBuf::from(&config.download_folder),
            max_concurrent: config.max_concurrent_downloads,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            navigation_timeout: config.browser_timeout(),
        }
    }
}

/// 下载引擎
pub struct DownloadEngine {
    fetcher: Arc<dyn DocumentFetcher>,
    links: LocatorChain,
    settings: DownloadSettings,
}

impl DownloadEngine {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        links: LocatorChain,
        settings: DownloadSettings,
    ) -> Self {
        Self {
            fetcher,
            links,
            settings,
        }
    }

    /// 下载所有记录的文档
    ///
    /// 每条输入记录恰好产生一个 [`DownloadAttempt`]，顺序与输入一致；
    /// 单条记录的失败只落在它自己的结果上。
    pub async fn download_all(
        &self,
        records: &mut [Record],
        page: Arc<dyn PageSession>,
    ) -> Vec<DownloadAttempt> {
        let total = records.len();
        info!("{}", "=".repeat(60));
        info!(
            "📥 开始下载 {} 份文档 (最大并发: {})",
            total, self.settings.max_concurrent
        );
        info!("{}", "=".repeat(60));

        if let Err(e) = fs::create_dir_all(&self.settings.folder).await {
            let message = format!(
                "无法创建下载目录 {}: {}",
                self.settings.folder.display(),
                e
            );
            error!("❌ {}", message);
            return records
                .iter_mut()
                .map(|record| {
                    record.mark_processed(DownloadStatus::Failed, None, Some(message.clone()));
                    DownloadAttempt::failure(record, DownloadStatus::Failed, message.clone())
                })
                .collect();
        }

        let semaphore = Semaphore::new(self.settings.max_concurrent.max(1));
        let page_lock = Mutex::new(());
        let semaphore = &semaphore;
        let page_lock = &page_lock;

        let tasks = records.iter_mut().enumerate().map(|(i, record)| {
            let page = page.clone();
            async move {
                let _permit = semaphore.acquire().await;
                self.download_one(i + 1, total, record, page.as_ref(), page_lock)
                    .await
            }
        });
        let attempts = join_all(tasks).await;

        let successful = attempts.iter().filter(|a| a.is_success()).count();
        info!("{}", "─".repeat(60));
        info!("✓ 下载完成: 成功 {}/{}", successful, total);
        info!("{}", "─".repeat(60));
        attempts
    }

    async fn download_one(
        &self,
        index: usize,
        total: usize,
        record: &mut Record,
        page: &dyn PageSession,
        page_lock: &Mutex<()>,
    ) -> DownloadAttempt {
        info!("[记录 {}/{}] 📄 {} ({})", index, total, record.name, record.url);

        match self.try_download(index, record, page, page_lock).await {
            Ok(path) => {
                info!("[记录 {}] ✅ 已保存: {}", index, path.display());
                record.mark_processed(DownloadStatus::Success, Some(path.clone()), None);
                DownloadAttempt::success(record, path)
            }
            Err(e) => {
                let status = e.status();
                let message = e.to_string();
                match status {
                    DownloadStatus::NotFound => warn!("[记录 {}] ⚠️ {}", index, message),
                    _ => error!("[记录 {}] ❌ 下载失败: {}", index, message),
                }
                record.mark_processed(status, None, Some(message.clone()));
                DownloadAttempt::failure(record, status, message)
            }
        }
    }

    async fn try_download(
        &self,
        index: usize,
        record: &mut Record,
        page: &dyn PageSession,
        page_lock: &Mutex<()>,
    ) -> Result<PathBuf, DownloadError> {
        let link = {
            let _guard = page_lock.lock().await;
            page.goto(&record.url).await?;
            page.wait_for_network_idle(self.settings.navigation_timeout)
                .await?;
            self.find_document_link(page).await
        };
        let link = link.ok_or(DownloadError::NotFound)?;
        debug!("[记录 {}] 文档链接: {}", index, link);

        let bytes = self.fetch_with_retry(index, record, &link).await?;

        let dir = self.target_dir(record).await?;
        let path = write_document(&dir, &sanitize_filename(&record.name), &bytes).await?;

        if !validate_pdf(&path).await {
            if let Err(e) = fs::remove_file(&path).await {
                debug!("删除无效文件 {} 失败: {}", path.display(), e);
            }
            return Err(DownloadError::Validation);
        }
        Ok(path)
    }

    /// 在当前详情页上找以文档扩展名结尾的链接
    async fn find_document_link(&self, page: &dyn PageSession) -> Option<String> {
        let suffix = format!(".{}", DOCUMENT_EXTENSION);
        let base = page.current_url().await.unwrap_or_default();

        for index in 0..self.links.locators.len() {
            let Some(found) = self.links.resolve_at(page, index).await else {
                continue;
            };
            let href = match found.element.attribute("href").await {
                Ok(Some(href)) => href,
                _ => continue,
            };
            if href.to_lowercase().ends_with(&suffix) {
                return Some(resolve_link(&base, &href));
            }
            debug!("{} 的链接不是文档: {}", found.selector, href);
        }
        None
    }

    /// 下载文档字节，瞬时失败（超时、连接错误、429、5xx）按退避重试
    async fn fetch_with_retry(
        &self,
        index: usize,
        record: &mut Record,
        url: &str,
    ) -> Result<Vec<u8>, DownloadError> {
        let mut attempt = 0u32;
        loop {
            let err = match self.fetcher.fetch(url).await {
                Ok(response) if response.is_ok() => return Ok(response.body),
                Ok(response) => DownloadError::HttpStatus(response.status),
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= self.settings.max_retries {
                return Err(err);
            }
            attempt += 1;
            record.retry_count = attempt;
            let delay = self.settings.retry_delay * attempt;
            warn!(
                "[记录 {}] 🔄 {}，{:?} 后第 {}/{} 次重试",
                index, err, delay, attempt, self.settings.max_retries
            );
            sleep(delay).await;
        }
    }

    /// 记录的保存目录：有分组标签时放在对应子目录
    async fn target_dir(&self, record: &Record) -> Result<PathBuf, DownloadError> {
        let Some(label) = &record.group_label else {
            return Ok(self.settings.folder.clone());
        };
        let dir = self.settings.folder.join(sanitize_filename(label));
        ensure_dir(&dir).await?;
        Ok(dir)
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), DownloadError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|source| DownloadError::Io {
            path: dir.to_path_buf(),
            source,
        })
}
