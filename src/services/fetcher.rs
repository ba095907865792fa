//! 文档下载客户端
//!
//! 字节传输走独立的 HTTP 客户端，不占用浏览器页面。

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::DownloadError;

/// 一次 HTTP 下载的结果
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// 按 URL 下载文档
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, DownloadError>;
}

/// 基于 reqwest 的下载客户端，单次请求有总超时
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Request(format!("创建 HTTP 客户端失败: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, DownloadError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!("HTTP {} ({} 字节) <- {}", status, body.len(), url);
        Ok(FetchResponse { status, body })
    }
}
