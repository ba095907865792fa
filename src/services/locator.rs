//! 选择器回退链 - 业务能力层
//!
//! 一条链是按优先级排列的候选定位器，第一个命中即返回。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::browser::{PageElement, PageSession};

/// 轮询间隔
const PROBE_INTERVAL: Duration = Duration::from_millis(200);

/// 元素筛选条件（文本比较不区分大小写）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementPredicate {
    #[default]
    Any,
    Visible,
    VisibleAndEnabled,
    Enabled,
    TextContains { text: String },
    VisibleWithText { text: String },
    HrefEndsWith { suffix: String },
}

impl ElementPredicate {
    /// 判断元素是否满足条件，查询出错视为不满足
    pub async fn matches(&self, element: &dyn PageElement) -> bool {
        match self {
            ElementPredicate::Any => true,
            ElementPredicate::Visible => element.is_visible().await.unwrap_or(false),
            ElementPredicate::Enabled => control_is_enabled(element).await,
            ElementPredicate::VisibleAndEnabled => {
                element.is_visible().await.unwrap_or(false) && control_is_enabled(element).await
            }
            ElementPredicate::TextContains { text } => text_contains(element, text).await,
            ElementPredicate::VisibleWithText { text } => {
                element.is_visible().await.unwrap_or(false) && text_contains(element, text).await
            }
            ElementPredicate::HrefEndsWith { suffix } => element
                .attribute("href")
                .await
                .ok()
                .flatten()
                .map(|href| href.to_lowercase().ends_with(&suffix.to_lowercase()))
                .unwrap_or(false),
        }
    }
}

async fn text_contains(element: &dyn PageElement, needle: &str) -> bool {
    element
        .text_content()
        .await
        .ok()
        .flatten()
        .map(|text| text.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

/// 控件是否真正可用：原生可用、没有 disabled 属性、aria-disabled 不为 true
pub async fn control_is_enabled(element: &dyn PageElement) -> bool {
    if !element.is_enabled().await.unwrap_or(false) {
        return false;
    }
    if matches!(element.attribute("disabled").await, Ok(Some(_))) {
        return false;
    }
    !matches!(
        element.attribute("aria-disabled").await,
        Ok(Some(value)) if value.eq_ignore_ascii_case("true")
    )
}

/// 单个定位器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub selector: String,
    #[serde(default)]
    pub predicate: ElementPredicate,
}

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            predicate: ElementPredicate::Any,
        }
    }

    pub fn with(selector: impl Into<String>, predicate: ElementPredicate) -> Self {
        Self {
            selector: selector.into(),
            predicate,
        }
    }

    /// 当前页面上第一个满足条件的匹配元素
    async fn find_once(&self, page: &dyn PageSession) -> Option<Box<dyn PageElement>> {
        let candidates = match page.query_all(&self.selector).await {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!("选择器 {} 查询失败: {}", self.selector, e);
                return None;
            }
        };
        for candidate in candidates {
            if self.predicate.matches(candidate.as_ref()).await {
                return Some(candidate);
            }
        }
        None
    }
}

/// 命中的元素及其来源
pub struct ResolvedElement {
    /// 命中的定位器在链中的位置
    pub locator_index: usize,
    pub selector: String,
    pub element: Box<dyn PageElement>,
}

/// 定位器回退链
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorChain {
    pub name: String,
    /// 每个定位器的最长等待时间，0 表示只查询一次
    #[serde(default)]
    pub probe_timeout_ms: u64,
    pub locators: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(name: impl Into<String>, probe_timeout_ms: u64, locators: Vec<Locator>) -> Self {
        Self {
            name: name.into(),
            probe_timeout_ms,
            locators,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// 按顺序尝试每个定位器，返回第一个命中的元素
    ///
    /// 全部未命中返回 `None`，由调用方决定是否视为失败。
    pub async fn resolve(&self, page: &dyn PageSession) -> Option<ResolvedElement> {
        for index in 0..self.locators.len() {
            if let Some(resolved) = self.resolve_at(page, index).await {
                return Some(resolved);
            }
        }
        debug!("[{}] 所有选择器均未命中", self.name);
        None
    }

    /// 只尝试第 `index` 个定位器，在探测超时内轮询
    pub async fn resolve_at(&self, page: &dyn PageSession, index: usize) -> Option<ResolvedElement> {
        let locator = self.locators.get(index)?;
        let deadline = Instant::now() + self.probe_timeout();
        loop {
            if let Some(element) = locator.find_once(page).await {
                debug!("[{}] 选择器命中: {}", self.name, locator.selector);
                return Some(ResolvedElement {
                    locator_index: index,
                    selector: locator.selector.clone(),
                    element,
                });
            }
            if Instant::now() + PROBE_INTERVAL > deadline {
                return None;
            }
            sleep(PROBE_INTERVAL).await;
        }
    }

    /// 第一个有匹配的定位器返回的全部匹配元素
    pub async fn first_matching_set(
        &self,
        page: &dyn PageSession,
    ) -> Option<(String, Vec<Box<dyn PageElement>>)> {
        for locator in &self.locators {
            let Ok(candidates) = page.query_all(&locator.selector).await else {
                continue;
            };
            let mut matched = Vec::new();
            for candidate in candidates {
                if locator.predicate.matches(candidate.as_ref()).await {
                    matched.push(candidate);
                }
            }
            if !matched.is_empty() {
                debug!(
                    "[{}] 选择器 {} 命中 {} 个元素",
                    self.name,
                    locator.selector,
                    matched.len()
                );
                return Some((locator.selector.clone(), matched));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeElement, FakePage};

    fn chain() -> LocatorChain {
        LocatorChain::new(
            "submit",
            0,
            vec![
                Locator::new("#missing"),
                Locator::with(
                    "button",
                    ElementPredicate::TextContains {
                        text: "Sign In".into(),
                    },
                ),
                Locator::new("input[type=\"submit\"]"),
            ],
        )
    }

    #[tokio::test]
    async fn test_resolve_returns_first_matching_locator() {
        let page = FakePage::new("https://portal.test/login");
        page.add_elements(
            "https://portal.test/login",
            "button",
            vec![
                FakeElement::new("button").text("Cancel"),
                FakeElement::new("button").text("sign in now"),
            ],
        );
        page.add_elements(
            "https://portal.test/login",
            "input[type=\"submit\"]",
            vec![FakeElement::new("input")],
        );

        let resolved = chain().resolve(&page).await.expect("应命中");
        assert_eq!(resolved.locator_index, 1);
        assert_eq!(resolved.selector, "button");
        assert_eq!(
            resolved.element.text_content().await.unwrap().as_deref(),
            Some("sign in now")
        );
    }

    #[tokio::test]
    async fn test_resolve_returns_none_when_chain_exhausted() {
        let page = FakePage::new("https://portal.test/login");
        assert!(chain().resolve(&page).await.is_none());
    }

    #[tokio::test]
    async fn test_hidden_element_falls_through_to_next_locator() {
        let url = "https://portal.test/login";
        let page = FakePage::new(url);
        page.add_elements(url, "#user", vec![FakeElement::new("input").visible(false)]);
        page.add_elements(url, "input[name=\"USER\"]", vec![FakeElement::new("input")]);
        let chain = LocatorChain::new(
            "username",
            0,
            vec![
                Locator::with("#user", ElementPredicate::Visible),
                Locator::with("input[name=\"USER\"]", ElementPredicate::Visible),
            ],
        );

        let resolved = chain.resolve(&page).await.expect("应命中第二个选择器");
        assert_eq!(resolved.locator_index, 1);
    }

    #[tokio::test]
    async fn test_control_enabled_respects_aria_disabled() {
        let enabled = FakeElement::new("button");
        let aria = FakeElement::new("button").attr("aria-disabled", "true");
        let attr = FakeElement::new("button").attr("disabled", "");
        let native = FakeElement::new("button").enabled(false);

        assert!(control_is_enabled(&enabled).await);
        assert!(!control_is_enabled(&aria).await);
        assert!(!control_is_enabled(&attr).await);
        assert!(!control_is_enabled(&native).await);
    }

    #[tokio::test]
    async fn test_href_suffix_predicate_is_case_insensitive() {
        let link = FakeElement::new("a").attr("href", "/files/CV.PDF");
        let predicate = ElementPredicate::HrefEndsWith {
            suffix: ".pdf".into(),
        };
        assert!(predicate.matches(&link).await);
    }

    #[test]
    fn test_predicate_deserializes_from_toml() {
        let locator: Locator = toml::from_str(
            r#"
            selector = "button"
            predicate = { kind = "visible_with_text", text = "next" }
            "#,
        )
        .unwrap();
        assert_eq!(
            locator.predicate,
            ElementPredicate::VisibleWithText { text: "next".into() }
        );
    }
}
