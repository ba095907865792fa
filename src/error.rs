//! 错误类型
//!
//! 按阶段划分：浏览器能力错误、下载错误、配置错误，以及顶层的 `AppError`。
//! 各阶段内部使用这些类型传播，阶段边界处统一转换为状态（见 `workflow`）。

use std::path::PathBuf;

use chromiumoxide::error::CdpError;
use thiserror::Error;

use crate::models::DownloadStatus;

/// 浏览器能力层错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 浏览器启动或配置失败
    #[error("浏览器启动失败: {0}")]
    Launch(String),

    /// 连接已运行的浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {reason}")]
    Connection { port: u16, reason: String },

    /// 页面尚未创建（会话未初始化或已释放）
    #[error("页面会话不可用")]
    NoPage,

    /// 导航失败
    #[error("导航到 {url} 失败: {reason}")]
    Navigation { url: String, reason: String },

    /// 等待超时（网络空闲、元素探测等）
    #[error("等待超时: {0}")]
    Timeout(String),

    /// 元素脚本执行失败
    #[error("执行脚本失败: {0}")]
    Script(String),

    /// 元素交互失败（点击、输入、按键）
    #[error("元素交互失败: {0}")]
    Interaction(String),

    /// 底层 CDP 协议错误
    #[error("浏览器协议错误: {0}")]
    Cdp(#[source] CdpError),
}

impl From<CdpError> for BrowserError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Timeout => BrowserError::Timeout("CDP 请求超时".to_string()),
            other => BrowserError::Cdp(other),
        }
    }
}

/// 浏览器能力层结果类型
pub type BrowserResult<T> = Result<T, BrowserError>;

/// 单条记录下载失败的原因
#[derive(Debug, Error)]
pub enum DownloadError {
    /// 详情页上找不到文档链接
    #[error("未找到文档下载链接")]
    NotFound,

    /// 服务器返回非 200 状态码
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// 请求超过总超时时间
    #[error("下载超时: {0}")]
    Timeout(String),

    /// 网络请求失败（连接、读取响应体等）
    #[error("下载请求失败: {0}")]
    Request(String),

    /// 写入本地文件失败
    #[error("文件写入失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 写入后的文件校验失败
    #[error("File validation failed")]
    Validation,

    /// 在详情页导航时浏览器出错
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl DownloadError {
    /// 映射为记录上的下载状态
    pub fn status(&self) -> DownloadStatus {
        match self {
            DownloadError::NotFound => DownloadStatus::NotFound,
            DownloadError::Timeout(_) => DownloadStatus::Timeout,
            _ => DownloadStatus::Failed,
        }
    }

    /// 是否属于可重试的瞬时失败
    ///
    /// 超时、连接失败、429 和 5xx 会重试；找不到链接、校验失败、4xx 不会。
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Timeout(_) | DownloadError::Request(_) => true,
            DownloadError::HttpStatus(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DownloadError::Timeout(err.to_string())
        } else {
            DownloadError::Request(err.to_string())
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填环境变量缺失
    #[error("环境变量 {var_name} 不存在或为空")]
    MissingVar { var_name: String },

    /// 取值不合法
    #[error("配置项 {var_name} 取值 '{value}' 不合法: {reason}")]
    Invalid {
        var_name: String,
        value: String,
        reason: String,
    },

    /// 选择器配置文件读取失败
    #[error("无法读取选择器配置文件 ({path}): {source}")]
    SelectorsRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 选择器配置文件解析失败
    #[error("无法解析选择器配置文件 ({path}): {source}")]
    SelectorsParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 应用程序错误类型
///
/// 只覆盖启动阶段：运行阶段的失败都体现在 `RunState` 里。
#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("下载客户端初始化失败: {0}")]
    Download(#[from] DownloadError),
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
