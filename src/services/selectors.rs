//! 选择器目录
//!
//! 门户改版时只需改这里（或通过 `SELECTORS_FILE` 指定 TOML 覆盖），流程代码不动。

use std::fs;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::services::locator::{ElementPredicate, Locator, LocatorChain};

/// 登录、翻页、提取、下载用到的所有选择器链
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorCatalog {
    pub username: LocatorChain,
    pub continue_control: LocatorChain,
    pub password: LocatorChain,
    pub submit: LocatorChain,
    pub listing_nav: LocatorChain,
    pub next_page: LocatorChain,
    pub record_items: LocatorChain,
    pub document_links: LocatorChain,
}

fn text(text: &str) -> ElementPredicate {
    ElementPredicate::TextContains { text: text.into() }
}

fn visible_text(text: &str) -> ElementPredicate {
    ElementPredicate::VisibleWithText { text: text.into() }
}

fn plain(selectors: &[&str]) -> Vec<Locator> {
    selectors.iter().map(|s| Locator::new(*s)).collect()
}

impl Default for LocatorCatalog {
    fn default() -> Self {
        let username = LocatorChain::new(
            "username",
            3000,
            [
                "sdf-input#login-form_username",
                "sdf-input[id=\"login-form_username\"]",
                "sdf-input[label=\"User ID\"]",
                "sdf-input",
                "#login-form_username",
                "input[type=\"text\"]",
                "input[autocomplete=\"username\"]",
                "input",
            ]
            .iter()
            .map(|s| Locator::with(*s, ElementPredicate::VisibleAndEnabled))
            .collect(),
        );

        let mut continue_locators: Vec<Locator> = [
            "sdf-button",
            "sdf-button[type=\"submit\"]",
            "button",
            "button[type=\"submit\"]",
        ]
        .iter()
        .map(|s| Locator::with(*s, visible_text("next")))
        .collect();
        continue_locators.extend(
            ["input[value=\"Next\"]", ".next-button", "#nextButton"]
                .iter()
                .map(|s| Locator::with(*s, ElementPredicate::Visible)),
        );
        let continue_control = LocatorChain::new("continue", 0, continue_locators);

        let password = LocatorChain::new(
            "password",
            10_000,
            plain(&[
                "input[name=\"PASSWORD\"]",
                "input[name=\"password\"]",
                "input[type=\"password\"]",
                "input[id=\"PASSWORD\"]",
                "input[id=\"password\"]",
                "#passwordInput",
            ]),
        );

        let submit = LocatorChain::new(
            "submit",
            3000,
            vec![
                Locator::new("button[type=\"submit\"]"),
                Locator::new("input[type=\"submit\"]"),
                Locator::with("button", text("sign in")),
                Locator::with("button", text("login")),
                Locator::with("button", text("submit")),
                Locator::new(".submit-button"),
                Locator::new("#submitButton"),
            ],
        );

        let listing_nav = LocatorChain::new(
            "listing_nav",
            5000,
            vec![
                Locator::new("a[href*=\"candidate\"]"),
                Locator::new("a[href*=\"resume\"]"),
                Locator::new("a[href*=\"talent\"]"),
                Locator::new("a[href*=\"recruit\"]"),
                Locator::with(".menu-item", text("candidates")),
                Locator::with(".nav-link", text("resumes")),
            ],
        );

        let next_page = LocatorChain::new(
            "next_page",
            2000,
            vec![
                Locator::with("a", visible_text("next")),
                Locator::with("button", visible_text("next")),
                Locator::with(".pagination-next", ElementPredicate::Visible),
                Locator::with("[aria-label=\"Next page\"]", ElementPredicate::Visible),
            ],
        );

        let record_items = LocatorChain::new(
            "record_items",
            0,
            plain(&[
                ".candidate-item",
                ".employee-row",
                ".person-card",
                "tr[data-candidate-id]",
                "[data-employee-id]",
            ]),
        );

        let document_links = LocatorChain::new(
            "document_links",
            2000,
            vec![
                Locator::new("a[href*=\"resume\"]"),
                Locator::new("a[href*=\"cv\"]"),
                Locator::new("a[href*=\".pdf\"]"),
                Locator::new("a[href*=\"download\"]"),
                Locator::new(".resume-download"),
                Locator::new(".cv-download"),
                Locator::with(
                    "a",
                    ElementPredicate::HrefEndsWith {
                        suffix: ".pdf".into(),
                    },
                ),
            ],
        );

        Self {
            username,
            continue_control,
            password,
            submit,
            listing_nav,
            next_page,
            record_items,
            document_links,
        }
    }
}

impl LocatorCatalog {
    /// 从 TOML 文件加载，文件中缺省的链使用内置默认值
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::SelectorsRead {
            path: path.to_string(),
            source,
        })?;
        let catalog = Self::from_toml_str(&content).map_err(|source| {
            ConfigError::SelectorsParse {
                path: path.to_string(),
                source,
            }
        })?;
        info!("✓ 已加载选择器配置: {}", path);
        Ok(catalog)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 按配置加载：未指定文件时使用内置默认值
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None => Ok(Self::default()),
        }
    }

    /// 统一覆盖所有链的探测超时（测试里设为 0 以免等待）
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        let ms = timeout.as_millis() as u64;
        for chain in [
            &mut self.username,
            &mut self.continue_control,
            &mut self.password,
            &mut self.submit,
            &mut self.listing_nav,
            &mut self.next_page,
            &mut self.record_items,
            &mut self.document_links,
        ] {
            chain.probe_timeout_ms = ms;
        }
        self
    }
}
