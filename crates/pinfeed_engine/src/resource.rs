use std::collections::HashSet;

use pinfeed_core::{Cursor, ItemKey};
use reqwest::Url;
use serde::Deserialize;

use crate::fetch::{collect_new, settle, HttpClient};
use crate::{FailureKind, FetchBatch, FetchError, Fetcher, HttpSettings};

const RESOURCE_PATH: &str = "/resource/BaseSearchResource/get/";
const JSON_CONTENT_TYPES: &[&str] = &["application/json"];
/// Bookmark the backend returns once the result list is drained.
const END_BOOKMARK: &str = "-end-";

/// Queries the JSON search resource behind the web client, paging with bookmarks.
#[derive(Debug, Clone)]
pub struct ResourceApiFetcher {
    base_url: Url,
    http: HttpClient,
    max_items: usize,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    resource_response: ResourceResponse,
}

#[derive(Debug, Deserialize)]
struct ResourceResponse {
    #[serde(default)]
    data: Option<SearchData>,
    #[serde(default)]
    bookmark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    results: Vec<Pin>,
}

#[derive(Debug, Deserialize)]
struct Pin {
    #[serde(default)]
    images: Option<PinImages>,
}

#[derive(Debug, Deserialize)]
struct PinImages {
    #[serde(default)]
    orig: Option<PinImage>,
    #[serde(default, rename = "736x")]
    large: Option<PinImage>,
}

#[derive(Debug, Deserialize)]
struct PinImage {
    url: String,
}

impl ResourceApiFetcher {
    pub fn new(base_url: Url, settings: &HttpSettings) -> Result<Self, FetchError> {
        Ok(Self {
            base_url,
            http: HttpClient::new(settings)?,
            max_items: settings.max_items_per_fetch,
        })
    }

    fn resource_url(&self, query: &str, cursor: Option<&Cursor>) -> Result<Url, FetchError> {
        let bookmarks: Vec<&str> = cursor.map(Cursor::as_str).into_iter().collect();
        let data = serde_json::json!({
            "options": {
                "query": query,
                "scope": "pins",
                "bookmarks": bookmarks,
                "page_size": self.max_items,
            },
            "context": {},
        });

        let mut url = self
            .base_url
            .join(RESOURCE_PATH)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("source_url", &format!("/search/pins/?q={query}"))
            .append_pair("data", &data.to_string());
        Ok(url)
    }

    async fn search(
        &self,
        query: &str,
        cursor: Option<&Cursor>,
        seen: &HashSet<ItemKey>,
    ) -> Result<FetchBatch, FetchError> {
        let url = self.resource_url(query, cursor)?;
        let body = self.http.get_text(url, JSON_CONTENT_TYPES).await?;
        let (urls, next_cursor) = parse_search_response(&body)?;
        Ok(FetchBatch {
            items: collect_new(urls, seen, self.max_items),
            next_cursor,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ResourceApiFetcher {
    async fn fetch(
        &self,
        query: &str,
        cursor: Option<&Cursor>,
        seen: &HashSet<ItemKey>,
    ) -> FetchBatch {
        let result = self.search(query, cursor, seen).await;
        settle("resource", query, cursor, result)
    }
}

fn parse_search_response(body: &str) -> Result<(Vec<String>, Option<Cursor>), FetchError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|err| FetchError::new(FailureKind::MalformedResponse, err.to_string()))?;
    let response = envelope.resource_response;

    let urls = response
        .data
        .map(|data| data.results)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|pin| pin.images)
        .filter_map(|images| images.orig.or(images.large))
        .map(|image| image.url)
        .collect();

    let next_cursor = response
        .bookmark
        .filter(|bookmark| !bookmark.is_empty() && bookmark != END_BOOKMARK)
        .map(Cursor::new);

    Ok((urls, next_cursor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_bookmark_clears_cursor() {
        let body = r#"{"resource_response":{"data":{"results":[]},"bookmark":"-end-"}}"#;
        let (urls, cursor) = parse_search_response(body).unwrap();
        assert!(urls.is_empty());
        assert_eq!(cursor, None);
    }

    #[test]
    fn prefers_original_image_and_skips_pins_without_images() {
        let body = r#"{"resource_response":{"data":{"results":[
            {"images":{"orig":{"url":"https://i.pinimg.com/originals/a.jpg"},"736x":{"url":"https://i.pinimg.com/736x/a.jpg"}}},
            {"images":{"736x":{"url":"https://i.pinimg.com/736x/b.jpg"}}},
            {"type":"story"}
        ]},"bookmark":"Y2JVSG8"}}"#;
        let (urls, cursor) = parse_search_response(body).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://i.pinimg.com/originals/a.jpg".to_string(),
                "https://i.pinimg.com/736x/b.jpg".to_string(),
            ]
        );
        assert_eq!(cursor, Some(Cursor::new("Y2JVSG8")));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_search_response("<html>").unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedResponse);
    }
}
