//! Listing every page the integration can see.

use backup_logging::{backup_debug, backup_info};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::fetch::{map_reqwest_error, FetchSettings};
use crate::retry::{with_retry, RetryPolicy};
use crate::tree::{PageIcon, PageRecord, ParentRef};
use crate::{FailureKind, FetchError};

pub const NOTION_API_BASE: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";
pub const SEARCH_PAGE_SIZE: u32 = 100;

const TITLE_KEYS: [&str; 6] = ["title", "Title", "Name", "name", "Page", "page"];

/// One cursor step of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryPage {
    pub records: Vec<PageRecord>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[async_trait::async_trait]
pub trait PageDirectory: Send + Sync {
    async fn list_page(&self, cursor: Option<&str>) -> Result<DirectoryPage, FetchError>;
}

/// Follow cursors until the directory reports no more results.
pub async fn collect_all_pages(
    directory: &dyn PageDirectory,
    retry: RetryPolicy,
) -> Result<Vec<PageRecord>, FetchError> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = with_retry(retry, || directory.list_page(cursor.as_deref())).await?;
        backup_debug!("Directory returned {} record(s)", page.records.len());
        records.extend(page.records);
        if !page.has_more {
            break;
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    backup_info!("Listed {} page(s)", records.len());
    Ok(records)
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

/// `POST /v1/search` against the Notion API.
#[derive(Debug, Clone)]
pub struct NotionSearchDirectory {
    base_url: Url,
    token: String,
    client: reqwest::Client,
}

impl NotionSearchDirectory {
    pub fn new(token: impl Into<String>, settings: &FetchSettings) -> Result<Self, FetchError> {
        Self::with_base_url(NOTION_API_BASE, token, settings)
    }

    pub fn with_base_url(
        base_url: &str,
        token: impl Into<String>,
        settings: &FetchSettings,
    ) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        Ok(Self {
            base_url,
            token: token.into(),
            client: settings.build_client()?,
        })
    }

    fn search_url(&self) -> Result<Url, FetchError> {
        self.base_url
            .join("/v1/search")
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl PageDirectory for NotionSearchDirectory {
    async fn list_page(&self, cursor: Option<&str>) -> Result<DirectoryPage, FetchError> {
        let body = serde_json::to_vec(&SearchRequest {
            start_cursor: cursor,
            page_size: SEARCH_PAGE_SIZE,
        })
        .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;

        let response = self
            .client
            .post(self.search_url()?)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(FetchError::new(FailureKind::HttpStatus(status.as_u16()), message));
        }

        let parsed: SearchResponse = serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        Ok(DirectoryPage {
            records: parsed.results.iter().filter_map(page_from_result).collect(),
            next_cursor: parsed.next_cursor,
            has_more: parsed.has_more,
        })
    }
}

/// Databases and other objects are skipped.
fn page_from_result(item: &Value) -> Option<PageRecord> {
    if item.get("object").and_then(Value::as_str) != Some("page") {
        return None;
    }
    let properties = item.get("properties")?.as_object()?;
    let id = item.get("id")?.as_str()?;

    let mut record = PageRecord::new(id, extract_title(properties), extract_parent(item));
    record.last_edited = item
        .get("last_edited_time")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    record.icon = extract_icon(item);
    Some(record)
}

fn extract_title(properties: &serde_json::Map<String, Value>) -> String {
    TITLE_KEYS
        .iter()
        .filter_map(|key| properties.get(*key))
        .chain(properties.values())
        .find_map(title_text)
        .unwrap_or_else(|| "Untitled".to_string())
}

fn title_text(property: &Value) -> Option<String> {
    let fragments = property.get("title")?.as_array()?;
    if fragments.is_empty() {
        return None;
    }
    Some(
        fragments
            .iter()
            .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
            .collect(),
    )
}

fn extract_parent(item: &Value) -> ParentRef {
    let Some(parent) = item.get("parent") else {
        return ParentRef::root();
    };
    let field = |name: &str| parent.get(name).and_then(Value::as_str);
    let resolved = match parent.get("type").and_then(Value::as_str) {
        Some("page_id") => field("page_id").map(ParentRef::page),
        Some("database_id") => field("database_id").map(ParentRef::container),
        _ => None,
    };
    resolved.unwrap_or_else(ParentRef::root)
}

fn extract_icon(item: &Value) -> Option<PageIcon> {
    let icon = item.get("icon")?;
    let url_of = |name: &str| {
        icon.get(name)
            .and_then(|inner| inner.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    match icon.get("type")?.as_str()? {
        "emoji" => icon.get("emoji")?.as_str().map(|e| PageIcon::Emoji(e.to_string())),
        "external" => url_of("external").map(PageIcon::External),
        "file" => url_of("file").map(PageIcon::External),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tree::ParentKind;

    #[test]
    fn title_prefers_named_keys_then_any_title_property() {
        let item = json!({
            "object": "page",
            "id": "p1",
            "properties": {
                "Aardvark": { "type": "title", "title": [{ "plain_text": "Fallback" }] },
                "Name": { "type": "title", "title": [{ "plain_text": "Road" }, { "plain_text": "map" }] }
            },
            "parent": { "type": "page_id", "page_id": "root-page" },
            "icon": { "type": "emoji", "emoji": "🚀" }
        });
        let record = page_from_result(&item).expect("page");
        assert_eq!(record.title, "Roadmap");
        assert_eq!(record.parent.kind, ParentKind::Page);
        assert_eq!(record.parent.id.as_deref(), Some("root-page"));
        assert_eq!(record.icon, Some(PageIcon::Emoji("🚀".into())));
    }

    #[test]
    fn empty_titles_become_untitled() {
        let item = json!({
            "object": "page",
            "id": "p2",
            "properties": { "title": { "type": "title", "title": [] } },
            "parent": { "type": "workspace", "workspace": true }
        });
        let record = page_from_result(&item).expect("page");
        assert_eq!(record.title, "Untitled");
        assert_eq!(record.parent, ParentRef::root());
    }

    #[test]
    fn databases_are_skipped() {
        let item = json!({ "object": "database", "id": "d1", "properties": {} });
        assert!(page_from_result(&item).is_none());
    }

    #[test]
    fn database_parent_and_file_icon() {
        let item = json!({
            "object": "page",
            "id": "row",
            "properties": {},
            "parent": { "type": "database_id", "database_id": "db" },
            "icon": { "type": "file", "file": { "url": "https://files.test/icon.png" } }
        });
        let record = page_from_result(&item).expect("page");
        assert_eq!(record.parent, ParentRef::container("db"));
        assert_eq!(
            record.icon,
            Some(PageIcon::External("https://files.test/icon.png".into()))
        );
    }
}
