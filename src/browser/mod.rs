//! 页面自动化能力边界
//!
//! 核心流程只依赖这里的 trait：启动浏览器、打开页面、查询元素、对元素执行命名脚本。
//! Chromium 的具体实现见 [`chromium`]，启动/连接方式见 [`headless`] 与 [`connection`]。

pub mod chromium;
pub mod connection;
pub mod headless;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::BrowserResult;

pub use chromium::{ChromiumLauncher, LaunchOptions};

/// 对单个元素执行的命名脚本
///
/// 核心只知道要触发哪一种校验/输入级联，脚本原文由具体实现提供。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementScript {
    /// 探测可编辑表面：返回 "shadow" / "child" / "direct" / "unknown"
    ProbeInputSurface,
    /// 直接写入 shadow 内部输入框，并在内外两层派发 focus/input/change/blur
    InjectNestedValue { value: String },
    /// 清空元素自身的值
    ClearValue,
    /// 在宿主与内部输入框上派发 input 事件
    DispatchInput,
    /// 多途径写入最终值，派发完整事件链和 validate/valueChanged 自定义事件
    FinalizeValue { value: String },
    /// 重新触发校验（聚焦/失焦、表单 change、Tab 键、validation 事件）
    RetriggerValidation { value: String },
    /// 兜底：直接赋值并派发 input/change
    AssignValue { value: String },
    /// 脚本级点击 `el.click()`
    ScriptClick,
    /// 派发合成的鼠标点击事件
    DispatchPointerClick,
}

impl ElementScript {
    /// 脚本名（用于日志和脚本表查找）
    pub fn name(&self) -> &'static str {
        match self {
            ElementScript::ProbeInputSurface => "probe_input_surface",
            ElementScript::InjectNestedValue { .. } => "inject_nested_value",
            ElementScript::ClearValue => "clear_value",
            ElementScript::DispatchInput => "dispatch_input",
            ElementScript::FinalizeValue { .. } => "finalize_value",
            ElementScript::RetriggerValidation { .. } => "retrigger_validation",
            ElementScript::AssignValue { .. } => "assign_value",
            ElementScript::ScriptClick => "script_click",
            ElementScript::DispatchPointerClick => "dispatch_pointer_click",
        }
    }

    /// 脚本携带的值
    pub fn value(&self) -> Option<&str> {
        match self {
            ElementScript::InjectNestedValue { value }
            | ElementScript::FinalizeValue { value }
            | ElementScript::RetriggerValidation { value }
            | ElementScript::AssignValue { value } => Some(value),
            _ => None,
        }
    }
}

/// 页面上的一个元素
#[async_trait]
pub trait PageElement: Send + Sync {
    /// 小写标签名
    async fn tag_name(&self) -> BrowserResult<String>;
    async fn is_visible(&self) -> BrowserResult<bool>;
    async fn is_enabled(&self) -> BrowserResult<bool>;
    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>>;
    async fn text_content(&self) -> BrowserResult<Option<String>>;
    async fn click(&self) -> BrowserResult<()>;
    /// 清空并填入原生输入框
    async fn fill(&self, value: &str) -> BrowserResult<()>;
    /// 输入单个字符，之后等待 `delay`
    async fn type_char(&self, ch: char, delay: Duration) -> BrowserResult<()>;
    async fn press_key(&self, key: &str) -> BrowserResult<()>;
    async fn run_script(&self, script: &ElementScript) -> BrowserResult<JsonValue>;
    /// 第一个匹配 `selector` 的后代元素
    async fn first_descendant(&self, selector: &str)
        -> BrowserResult<Option<Box<dyn PageElement>>>;
}

/// 一个已打开的页面
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn goto(&self, url: &str) -> BrowserResult<()>;
    /// 等待网络空闲，超过 `timeout` 返回 [`crate::error::BrowserError::Timeout`]
    async fn wait_for_network_idle(&self, timeout: Duration) -> BrowserResult<()>;
    async fn current_url(&self) -> BrowserResult<String>;
    /// 渲染后的 HTML
    async fn content(&self) -> BrowserResult<String>;
    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>>;
    async fn screenshot(&self, path: &Path) -> BrowserResult<()>;
    async fn close(&self) -> BrowserResult<()>;
}

/// 已启动（或已连接）的浏览器
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open_page(&mut self) -> BrowserResult<Arc<dyn PageSession>>;
    /// 关闭浏览器进程
    async fn close_browser(&mut self) -> BrowserResult<()>;
    /// 停止底层事件循环
    async fn shutdown_engine(&mut self) -> BrowserResult<()>;
}

/// 浏览器启动器
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>>;
}
