/// 日志工具模块
///
/// 提供日志初始化以及启动、汇总信息的输出
use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::models::RunState;

/// 初始化日志：同时输出到控制台和日志文件
///
/// 级别默认为 `info`，可用 `RUST_LOG` 覆盖。
pub fn init(log_file_path: &str) -> Result<()> {
    init_log_file(log_file_path)?;
    let file = OpenOptions::new()
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("日志系统初始化失败")?;
    Ok(())
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n门户文档下载日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 门户文档下载程序启动");
    info!("🔗 登录地址: {}", config.login_url);
    info!("📁 下载目录: {}", config.download_folder);
    info!(
        "📊 最大并发数: {}，最大页数: {}",
        config.max_concurrent_downloads, config.max_pages
    );
    match config.browser_debug_port {
        Some(port) => info!("🌐 浏览器: 连接调试端口 {}", port),
        None => info!(
            "🌐 浏览器: {}",
            if config.headless { "无头模式" } else { "有界面模式" }
        ),
    }
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `state`: 运行结束时的状态
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(state: &RunState, log_file_path: &str) {
    let stats = &state.stats;
    info!("\n{}", "=".repeat(60));
    info!("📊 运行结束统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📋 记录总数: {}", stats.total_records);
    info!("✅ 成功: {}", stats.successful_downloads);
    info!("❌ 失败: {}", stats.failed_downloads);
    info!("📈 成功率: {:.1}%", stats.success_rate());
    info!("🏁 最终状态: {}", state.phase());
    if let Some(elapsed) = stats.elapsed() {
        info!("⏱️ 耗时: {} 秒", elapsed.num_seconds());
    }
    if let Some(message) = &state.error_message {
        error!("最终错误: {}", summary_line(message));
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 汇总里的错误只取第一行，过长时截断
fn summary_line(message: &str) -> String {
    const MAX_CHARS: usize = 200;
    let first = message.lines().next().unwrap_or_default().trim();
    if first.chars().count() > MAX_CHARS {
        format!("{}…", first.chars().take(MAX_CHARS).collect::<String>())
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_keeps_first_line() {
        assert_eq!(
            summary_line("Login failed: timeout\n    at step 3"),
            "Login failed: timeout"
        );
        let long = "失".repeat(250);
        let line = summary_line(&long);
        assert_eq!(line.chars().count(), 201);
        assert!(line.ends_with('…'));
    }

    #[test]
    fn test_log_file_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        init_log_file(path.to_str().unwrap()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("门户文档下载日志"));
    }
}
