//! 业务能力层
//!
//! 每个服务只描述"我能做什么"，不关心阶段顺序：
//! - `locator` / `selectors`：选择器回退链与默认目录
//! - `authenticator` / `session_driver`：浏览器会话与登录
//! - `extraction`：列表页记录提取
//! - `fetcher` / `file_store` / `download_engine`：文档下载、落盘与校验

pub mod authenticator;
pub mod download_engine;
pub mod extraction;
pub mod fetcher;
pub mod file_store;
pub mod locator;
pub mod selectors;
pub mod session_driver;

pub use authenticator::{detect_authenticated, Authenticator};
pub use download_engine::{DownloadEngine, DownloadSettings};
pub use extraction::Extractor;
pub use fetcher::{DocumentFetcher, FetchResponse, HttpFetcher};
pub use file_store::{sanitize_filename, validate_pdf};
pub use locator::{ElementPredicate, Locator, LocatorChain};
pub use selectors::LocatorCatalog;
pub use session_driver::SessionDriver;
