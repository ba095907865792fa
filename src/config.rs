use std::time::Duration;

use crate::error::ConfigError;

/// 登录流程的节奏参数
///
/// 目标门户的组件依赖 JS 监听器驱动校验状态，每一步之后都需要留出时间。
#[derive(Clone, Debug)]
pub struct LoginTimings {
    /// 打开登录页后等待页面稳定
    pub page_settle: Duration,
    /// 点击自定义输入组件后的聚焦等待
    pub focus_delay: Duration,
    /// 逐字符输入时的字符间隔
    pub char_delay: Duration,
    /// 输入账号后等待校验完成
    pub validation_wait: Duration,
    /// 轮询"下一步"按钮可用状态的次数
    pub enable_poll_attempts: usize,
    /// 每次轮询之间的等待
    pub enable_poll_delay: Duration,
    /// 点击"下一步"之后等待页面切换
    pub after_continue: Duration,
    /// 输入密码后的等待
    pub after_password: Duration,
    /// 提交登录后的等待
    pub after_submit: Duration,
    /// 提交后等待网络空闲的上限，超过即判定登录超时
    pub idle_timeout: Duration,
}

impl Default for LoginTimings {
    fn default() -> Self {
        Self {
            page_settle: Duration::from_secs(3),
            focus_delay: Duration::from_millis(500),
            char_delay: Duration::from_millis(50),
            validation_wait: Duration::from_secs(3),
            enable_poll_attempts: 5,
            enable_poll_delay: Duration::from_secs(2),
            after_continue: Duration::from_secs(5),
            after_password: Duration::from_secs(1),
            after_submit: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl LoginTimings {
    /// 所有等待为零，只保留轮询次数（测试用）
    pub fn immediate() -> Self {
        Self {
            page_settle: Duration::ZERO,
            focus_delay: Duration::ZERO,
            char_delay: Duration::ZERO,
            validation_wait: Duration::ZERO,
            enable_poll_attempts: 5,
            enable_poll_delay: Duration::ZERO,
            after_continue: Duration::ZERO,
            after_password: Duration::ZERO,
            after_submit: Duration::ZERO,
            idle_timeout: Duration::from_secs(1),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 门户账号 ---
    pub username: String,
    pub password: String,
    pub login_url: String,
    // --- 下载 ---
    /// 文档保存目录
    pub download_folder: String,
    /// 同时进行的下载数量
    pub max_concurrent_downloads: usize,
    /// 单个文件下载的总超时（秒）
    pub download_timeout_secs: u64,
    /// 瞬时失败时的最大重试次数（不含首次请求）
    pub max_retries: u32,
    /// 重试基础间隔（毫秒），第 n 次重试等待 n 倍
    pub retry_delay_ms: u64,
    // --- 浏览器 ---
    /// 是否无头模式
    pub headless: bool,
    /// 浏览器请求和页面等待的超时（秒）
    pub browser_timeout_secs: u64,
    /// 设置后连接到该调试端口上已运行的浏览器，而不是自行启动
    pub browser_debug_port: Option<u16>,
    /// 浏览器可执行文件路径（为空时自动探测）
    pub browser_executable: Option<String>,
    // --- 列表提取 ---
    /// 最多翻页数
    pub max_pages: usize,
    /// 翻页后的等待（秒）
    pub page_delay_secs: u64,
    // --- 输出 ---
    /// 诊断截图目录
    pub screenshot_dir: String,
    /// 日志文件
    pub log_file: String,
    /// 选择器配置文件（TOML，可选）
    pub selectors_file: Option<String>,
    /// 登录节奏
    pub login_timings: LoginTimings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            login_url: String::new(),
            download_folder: "./downloads".to_string(),
            max_concurrent_downloads: 3,
            download_timeout_secs: 120,
            max_retries: 3,
            retry_delay_ms: 1000,
            headless: false,
            browser_timeout_secs: 30,
            browser_debug_port: None,
            browser_executable: None,
            max_pages: 50,
            page_delay_secs: 2,
            screenshot_dir: ".".to_string(),
            log_file: "portal_downloader.log".to_string(),
            selectors_file: None,
            login_timings: LoginTimings::default(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置（会先读取当前目录下的 `.env`）
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let default = Self::default();
        Self {
            username: std::env::var("PORTAL_USERNAME").unwrap_or(default.username),
            password: std::env::var("PORTAL_PASSWORD").unwrap_or(default.password),
            login_url: std::env::var("PORTAL_LOGIN_URL").unwrap_or(default.login_url),
            download_folder: std::env::var("DOWNLOAD_FOLDER").unwrap_or(default.download_folder),
            max_concurrent_downloads: std::env::var("DOWNLOAD_MAX_CONCURRENT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_downloads),
            download_timeout_secs: std::env::var("DOWNLOAD_TIMEOUT_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.download_timeout_secs),
            max_retries: std::env::var("DOWNLOAD_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            retry_delay_ms: std::env::var("DOWNLOAD_RETRY_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_delay_ms),
            headless: std::env::var("BROWSER_HEADLESS").map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(default.headless),
            browser_timeout_secs: std::env::var("BROWSER_TIMEOUT_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_timeout_secs),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).or(default.browser_debug_port),
            browser_executable: std::env::var("BROWSER_EXECUTABLE").ok().filter(|v| !v.is_empty()).or(default.browser_executable),
            max_pages: std::env::var("EXTRACTION_MAX_PAGES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_pages),
            page_delay_secs: std::env::var("EXTRACTION_DELAY_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.page_delay_secs),
            screenshot_dir: std::env::var("SCREENSHOT_DIR").unwrap_or(default.screenshot_dir),
            log_file: std::env::var("LOG_FILE").unwrap_or(default.log_file),
            selectors_file: std::env::var("SELECTORS_FILE").ok().filter(|v| !v.is_empty()).or(default.selectors_file),
            login_timings: default.login_timings,
        }
    }

    /// 检查运行所必需的配置项
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (var_name, value) in [
            ("PORTAL_USERNAME", &self.username),
            ("PORTAL_PASSWORD", &self.password),
            ("PORTAL_LOGIN_URL", &self.login_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingVar {
                    var_name: var_name.to_string(),
                });
            }
        }

        if url::Url::parse(&self.login_url).is_err() {
            return Err(ConfigError::Invalid {
                var_name: "PORTAL_LOGIN_URL".to_string(),
                value: self.login_url.clone(),
                reason: "不是合法的 URL".to_string(),
            });
        }

        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::Invalid {
                var_name: "DOWNLOAD_MAX_CONCURRENT".to_string(),
                value: "0".to_string(),
                reason: "并发数至少为 1".to_string(),
            });
        }

        if self.max_pages == 0 {
            return Err(ConfigError::Invalid {
                var_name: "EXTRACTION_MAX_PAGES".to_string(),
                value: "0".to_string(),
                reason: "至少提取 1 页".to_string(),
            });
        }

        Ok(())
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_secs(self.page_delay_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
