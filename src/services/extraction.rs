//! 记录提取 - 业务能力层
//!
//! 只负责"从当前列表页提取记录"，翻页循环由流程层负责。

use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser::{PageElement, PageSession};
use crate::error::BrowserResult;
use crate::models::Record;
use crate::services::locator::LocatorChain;

/// 显示名最大字符数
const MAX_NAME_CHARS: usize = 50;
/// 承载分组标签（职位编号/职位名）的属性，按顺序取第一个非空值
const GROUP_LABEL_ATTRIBUTES: [&str; 2] = ["data-requisition", "data-job-title"];

/// 把 `href` 解析为绝对地址，解析失败时原样返回
pub fn resolve_link(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// 从元素文本中取显示名：首个非空行，最多 50 个字符
pub fn display_name(text: Option<&str>, index: usize) -> String {
    let first_line = text
        .unwrap_or_default()
        .trim()
        .lines()
        .next()
        .unwrap_or_default()
        .trim();
    if first_line.is_empty() {
        format!("Candidate_{}", index + 1)
    } else {
        first_line.chars().take(MAX_NAME_CHARS).collect()
    }
}

/// 列表页记录提取器
pub struct Extractor {
    items: LocatorChain,
}

impl Extractor {
    pub fn new(items: LocatorChain) -> Self {
        Self { items }
    }

    /// 提取当前页的所有记录，id 从 `id_offset + 1` 开始编号
    ///
    /// 出错时返回空列表，不中断流程。
    pub async fn extract_current_page(
        &self,
        page: &dyn PageSession,
        id_offset: usize,
    ) -> Vec<Record> {
        match self.try_extract(page, id_offset).await {
            Ok(records) => {
                info!("📋 当前页提取到 {} 条记录", records.len());
                records
            }
            Err(e) => {
                error!("❌ 提取记录失败: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_extract(
        &self,
        page: &dyn PageSession,
        id_offset: usize,
    ) -> BrowserResult<Vec<Record>> {
        let Some((selector, items)) = self.items.first_matching_set(page).await else {
            warn!("⚠️ 当前页没有匹配的记录容器");
            return Ok(Vec::new());
        };
        debug!("使用记录容器选择器: {}", selector);

        let base = page.current_url().await?;
        let mut records = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match self.read_item(item.as_ref(), index, &base).await {
                Ok(Some((name, url, label))) => {
                    let id = format!("candidate_{}", id_offset + records.len() + 1);
                    let mut record = Record::new(id, name, url);
                    if let Some(label) = label {
                        record = record.with_group_label(label);
                    }
                    records.push(record);
                }
                Ok(None) => debug!("第 {} 个条目没有链接，跳过", index + 1),
                Err(e) => debug!("第 {} 个条目读取失败，跳过: {}", index + 1, e),
            }
        }
        Ok(records)
    }

    async fn read_item(
        &self,
        item: &dyn PageElement,
        index: usize,
        base: &str,
    ) -> BrowserResult<Option<(String, String, Option<String>)>> {
        let text = item.text_content().await?;
        let name = display_name(text.as_deref(), index);

        let Some(anchor) = item.first_descendant("a").await? else {
            return Ok(None);
        };
        let href = match anchor.attribute("href").await? {
            Some(href) if !href.trim().is_empty() => href,
            _ => return Ok(None),
        };

        let mut label = None;
        for attr in GROUP_LABEL_ATTRIBUTES {
            if let Some(value) = item.attribute(attr).await? {
                if !value.trim().is_empty() {
                    label = Some(value.trim().to_string());
                    break;
                }
            }
        }

        Ok(Some((name, resolve_link(base, href.trim()), label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::selectors::LocatorCatalog;
    use crate::testing::{FakeElement, FakePage};

    const LISTING: &str = "https://portal.test/talent/list?page=1";

    fn row(text: &str, href: Option<&str>) -> FakeElement {
        let row = FakeElement::new("div").text(text);
        match href {
            Some(href) => row.child("a", FakeElement::new("a").attr("href", href)),
            None => row,
        }
    }

    fn extractor() -> Extractor {
        Extractor::new(LocatorCatalog::default().record_items)
    }

    #[test]
    fn test_display_name_uses_first_line_and_placeholder() {
        assert_eq!(display_name(Some("  Jane Doe\nEngineer"), 0), "Jane Doe");
        assert_eq!(display_name(Some("   "), 2), "Candidate_3");
        assert_eq!(display_name(None, 0), "Candidate_1");
        assert_eq!(display_name(Some("x".repeat(80).as_str()), 0).len(), 50);
    }

    #[test]
    fn test_resolve_link_against_page_origin() {
        assert_eq!(
            resolve_link(LISTING, "/profile/7"),
            "https://portal.test/profile/7"
        );
        assert_eq!(
            resolve_link(LISTING, "https://cdn.test/a.pdf"),
            "https://cdn.test/a.pdf"
        );
    }

    #[tokio::test]
    async fn test_extracts_rows_from_first_matching_selector() {
        let page = FakePage::new(LISTING);
        page.add_elements(
            LISTING,
            ".employee-row",
            vec![
                row("Jane Doe\nEngineer", Some("/profile/1")),
                row("No Link", None),
                row("", Some("/profile/3")).attr("data-requisition", "R-12 Nurse"),
            ],
        );
        page.add_elements(LISTING, ".person-card", vec![row("Ignored", Some("/x"))]);

        let records = extractor().extract_current_page(&page, 10).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "candidate_11");
        assert_eq!(records[0].name, "Jane Doe");
        assert_eq!(records[0].url, "https://portal.test/profile/1");
        assert_eq!(records[1].id, "candidate_12");
        assert_eq!(records[1].name, "Candidate_3");
        assert_eq!(records[1].group_label.as_deref(), Some("R-12 Nurse"));
    }

    #[tokio::test]
    async fn test_no_matching_container_yields_empty() {
        let page = FakePage::new(LISTING);
        assert!(extractor().extract_current_page(&page, 0).await.is_empty());
    }
}
