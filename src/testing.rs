//! 测试用的内存页面、浏览器与下载器

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;

use crate::browser::{BrowserLauncher, BrowserSession, ElementScript, PageElement, PageSession};
use crate::error::{BrowserError, BrowserResult, DownloadError};
use crate::services::fetcher::{DocumentFetcher, FetchResponse};

#[derive(Default, Clone)]
struct FakeView {
    content: String,
    elements: HashMap<String, Vec<FakeElement>>,
}

#[derive(Default)]
struct FakeState {
    current_url: String,
    views: HashMap<String, FakeView>,
    actions: Vec<String>,
    screenshots: Vec<String>,
    goto_failures: HashSet<String>,
    idle_timeout: bool,
    closed: bool,
}

/// 内存页面：按 URL 保存页面内容和选择器到元素的映射
#[derive(Clone)]
pub struct FakePage {
    state: Arc<Mutex<FakeState>>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        let state = FakeState {
            current_url: url.to_string(),
            ..FakeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn set_content(&self, url: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.views.entry(url.to_string()).or_default().content = content.to_string();
    }

    pub fn add_elements(&self, url: &str, selector: &str, elements: Vec<FakeElement>) {
        let mut state = self.state.lock().unwrap();
        state
            .views
            .entry(url.to_string())
            .or_default()
            .elements
            .entry(selector.to_string())
            .or_default()
            .extend(elements);
    }

    pub fn fail_goto(&self, url: &str) {
        self.state.lock().unwrap().goto_failures.insert(url.to_string());
    }

    pub fn never_idle(&self) {
        self.state.lock().unwrap().idle_timeout = true;
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().current_url.clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn screenshots(&self) -> Vec<String> {
        self.state.lock().unwrap().screenshots.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn log(state: &Arc<Mutex<FakeState>>, action: String) {
        state.lock().unwrap().actions.push(action);
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("goto:{}", url));
        if state.goto_failures.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_REFUSED".into(),
            });
        }
        state.current_url = url.to_string();
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> BrowserResult<()> {
        if self.state.lock().unwrap().idle_timeout {
            return Err(BrowserError::Timeout("network idle".into()));
        }
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.url())
    }

    async fn content(&self) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        Ok(state
            .views
            .get(&state.current_url)
            .map(|view| view.content.clone())
            .unwrap_or_default())
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn PageElement>>> {
        let state = self.state.lock().unwrap();
        let elements = state
            .views
            .get(&state.current_url)
            .and_then(|view| view.elements.get(selector))
            .cloned()
            .unwrap_or_default();
        Ok(elements
            .into_iter()
            .map(|element| Box::new(element.attach(self.state.clone())) as Box<dyn PageElement>)
            .collect())
    }

    async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.state.lock().unwrap().screenshots.push(name);
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// 内存元素（同时充当构造器）
#[derive(Clone)]
pub struct FakeElement {
    label: String,
    tag: String,
    text: Option<String>,
    attrs: HashMap<String, String>,
    visible: bool,
    enabled: bool,
    enable_after: Option<(usize, Arc<AtomicUsize>)>,
    navigates_to: Option<String>,
    children: HashMap<String, FakeElement>,
    click_fails: bool,
    failing_scripts: HashSet<&'static str>,
    surface: String,
    page: Option<Arc<Mutex<FakeState>>>,
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        Self {
            label: tag.to_string(),
            tag: tag.to_string(),
            text: None,
            attrs: HashMap::new(),
            visible: true,
            enabled: true,
            enable_after: None,
            navigates_to: None,
            children: HashMap::new(),
            click_fails: false,
            failing_scripts: HashSet::new(),
            surface: "direct".to_string(),
            page: None,
        }
    }

    /// 动作日志里使用的名字
    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// 前 `polls` 次可用性查询返回不可用
    pub fn enable_after(mut self, polls: usize) -> Self {
        self.enable_after = Some((polls, Arc::new(AtomicUsize::new(0))));
        self
    }

    /// 点击后页面跳转到 `url`
    pub fn navigates_to(mut self, url: &str) -> Self {
        self.navigates_to = Some(url.to_string());
        self
    }

    pub fn child(mut self, selector: &str, child: FakeElement) -> Self {
        self.children.insert(selector.to_string(), child);
        self
    }

    pub fn click_fails(mut self) -> Self {
        self.click_fails = true;
        self
    }

    pub fn script_fails(mut self, name: &'static str) -> Self {
        self.failing_scripts.insert(name);
        self
    }

    /// 探测脚本返回的可编辑表面
    pub fn surface(mut self, surface: &str) -> Self {
        self.surface = surface.to_string();
        self
    }

    fn attach(mut self, page: Arc<Mutex<FakeState>>) -> Self {
        self.children = self
            .children
            .into_iter()
            .map(|(selector, child)| (selector, child.attach(page.clone())))
            .collect();
        self.page = Some(page);
        self
    }

    fn log(&self, action: String) {
        if let Some(page) = &self.page {
            FakePage::log(page, action);
        }
    }

    fn navigate(&self) {
        if let (Some(page), Some(url)) = (&self.page, &self.navigates_to) {
            page.lock().unwrap().current_url = url.clone();
        }
    }
}

#[async_trait]
impl PageElement for FakeElement {
    async fn tag_name(&self) -> BrowserResult<String> {
        Ok(self.tag.clone())
    }

    async fn is_visible(&self) -> BrowserResult<bool> {
        Ok(self.visible)
    }

    async fn is_enabled(&self) -> BrowserResult<bool> {
        match &self.enable_after {
            Some((polls, calls)) => Ok(calls.fetch_add(1, Ordering::SeqCst) >= *polls),
            None => Ok(self.enabled),
        }
    }

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn text_content(&self) -> BrowserResult<Option<String>> {
        Ok(self.text.clone())
    }

    async fn click(&self) -> BrowserResult<()> {
        if self.click_fails {
            self.log(format!("click_failed:{}", self.label));
            return Err(BrowserError::Interaction("element not clickable".into()));
        }
        self.log(format!("click:{}", self.label));
        self.navigate();
        Ok(())
    }

    async fn fill(&self, value: &str) -> BrowserResult<()> {
        self.log(format!("fill:{}:{}", self.label, value));
        Ok(())
    }

    async fn type_char(&self, ch: char, _delay: Duration) -> BrowserResult<()> {
        self.log(format!("type:{}:{}", self.label, ch));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> BrowserResult<()> {
        self.log(format!("key:{}:{}", self.label, key));
        Ok(())
    }

    async fn run_script(&self, script: &ElementScript) -> BrowserResult<JsonValue> {
        if self.failing_scripts.contains(script.name()) {
            self.log(format!("script_failed:{}:{}", self.label, script.name()));
            return Err(BrowserError::Script(format!("{} threw", script.name())));
        }
        self.log(format!("script:{}:{}", self.label, script.name()));
        match script {
            ElementScript::ProbeInputSurface => Ok(json!(self.surface)),
            ElementScript::ScriptClick | ElementScript::DispatchPointerClick => {
                self.navigate();
                Ok(json!(true))
            }
            _ => Ok(json!(true)),
        }
    }

    async fn first_descendant(
        &self,
        selector: &str,
    ) -> BrowserResult<Option<Box<dyn PageElement>>> {
        Ok(self
            .children
            .get(selector)
            .cloned()
            .map(|child| Box::new(child) as Box<dyn PageElement>))
    }
}

#[derive(Default)]
struct LauncherLog {
    launches: usize,
    browser_closed: bool,
    engine_stopped: bool,
}

/// 返回固定页面的启动器
#[derive(Clone)]
pub struct FakeLauncher {
    page: FakePage,
    fail: bool,
    log: Arc<Mutex<LauncherLog>>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            fail: false,
            log: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            page: FakePage::new("about:blank"),
            fail: true,
            log: Arc::default(),
        }
    }

    pub fn launches(&self) -> usize {
        self.log.lock().unwrap().launches
    }

    pub fn browser_closed(&self) -> bool {
        self.log.lock().unwrap().browser_closed
    }

    pub fn engine_stopped(&self) -> bool {
        self.log.lock().unwrap().engine_stopped
    }
}

struct FakeBrowser {
    page: FakePage,
    log: Arc<Mutex<LauncherLog>>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        self.log.lock().unwrap().launches += 1;
        if self.fail {
            return Err(BrowserError::Launch("chrome executable not found".into()));
        }
        Ok(Box::new(FakeBrowser {
            page: self.page.clone(),
            log: self.log.clone(),
        }))
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn open_page(&mut self) -> BrowserResult<Arc<dyn PageSession>> {
        Ok(Arc::new(self.page.clone()))
    }

    async fn close_browser(&mut self) -> BrowserResult<()> {
        self.log.lock().unwrap().browser_closed = true;
        Ok(())
    }

    async fn shutdown_engine(&mut self) -> BrowserResult<()> {
        self.log.lock().unwrap().engine_stopped = true;
        Ok(())
    }
}

/// 预设的下载结果
#[derive(Clone)]
pub enum FakeOutcome {
    Body(u16, Vec<u8>),
    Timeout,
}

/// 内存下载器，记录并发峰值
#[derive(Default)]
pub struct FakeFetcher {
    outcomes: Mutex<HashMap<String, VecDeque<FakeOutcome>>>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// 为 `url` 追加一次响应，按顺序消费，最后一个会被重复使用
    pub fn respond(&self, url: &str, outcome: FakeOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, url: &str) -> FakeOutcome {
        let mut outcomes = self.outcomes.lock().unwrap();
        match outcomes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(FakeOutcome::Body(404, Vec::new())),
            None => FakeOutcome::Body(404, Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, DownloadError> {
        self.calls.lock().unwrap().push(url.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_outcome(url) {
            FakeOutcome::Body(status, body) => Ok(FetchResponse { status, body }),
            FakeOutcome::Timeout => Err(DownloadError::Timeout(url.to_string())),
        }
    }
}

/// 以 `%PDF-` 开头、长度为 `size` 的字节
pub fn pdf_bytes(size: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(size.max(bytes.len()), b'x');
    bytes
}
