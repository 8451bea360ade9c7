use std::collections::HashSet;

use pinfeed_core::{Cursor, ItemKey};
use reqwest::Url;
use scraper::{Html, Selector};

use crate::fetch::{collect_new, settle, HttpClient};
use crate::{FailureKind, FetchBatch, FetchError, Fetcher, HttpSettings};

const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Scrapes the public search results page.
///
/// The page is not paginated, so the cursor is always absent and later
/// rounds only make progress through `seen` filtering.
#[derive(Debug, Clone)]
pub struct HtmlSearchFetcher {
    base_url: Url,
    http: HttpClient,
    max_items: usize,
}

impl HtmlSearchFetcher {
    pub fn new(base_url: Url, settings: &HttpSettings) -> Result<Self, FetchError> {
        Ok(Self {
            base_url,
            http: HttpClient::new(settings)?,
            max_items: settings.max_items_per_fetch,
        })
    }

    fn search_url(&self, query: &str) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join("/search/pins/")
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }

    async fn search(&self, query: &str, seen: &HashSet<ItemKey>) -> Result<FetchBatch, FetchError> {
        let url = self.search_url(query)?;
        let page = self.http.get_text(url.clone(), HTML_CONTENT_TYPES).await?;
        let urls = extract_image_urls(&page, &url);
        Ok(FetchBatch {
            items: collect_new(urls, seen, self.max_items),
            next_cursor: None,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for HtmlSearchFetcher {
    async fn fetch(
        &self,
        query: &str,
        cursor: Option<&Cursor>,
        seen: &HashSet<ItemKey>,
    ) -> FetchBatch {
        let result = self.search(query, seen).await;
        settle("html", query, cursor, result)
    }
}

/// Collects one URL per `<img>`: the widest `srcset` candidate, else `src`.
pub(crate) fn extract_image_urls(html: &str, base: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(img_sel) = Selector::parse("img") else {
        return Vec::new();
    };

    doc.select(&img_sel)
        .filter_map(|img| {
            let attrs = img.value();
            attrs
                .attr("srcset")
                .and_then(last_srcset_candidate)
                .or_else(|| attrs.attr("src").map(str::trim))
                .and_then(|raw| resolve_image_url(raw, base))
        })
        .collect()
}

// Candidates are listed smallest first: "a.jpg 1x, b.jpg 2x, c.jpg 4x".
fn last_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .last()
}

fn resolve_image_url(raw: &str, base: &Url) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let url = Url::parse(raw).or_else(|_| base.join(raw)).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.pinterest.com/search/pins/?q=cats").unwrap()
    }

    #[test]
    fn picks_widest_srcset_candidate() {
        let html = r#"<html><body>
            <img srcset="https://i.pinimg.com/236x/a.jpg 1x, https://i.pinimg.com/474x/a.jpg 2x, https://i.pinimg.com/originals/a.jpg 4x" src="https://i.pinimg.com/236x/a.jpg">
        </body></html>"#;
        assert_eq!(
            extract_image_urls(html, &base()),
            vec!["https://i.pinimg.com/originals/a.jpg".to_string()]
        );
    }

    #[test]
    fn falls_back_to_src_and_resolves_relative() {
        let html = r#"<img src="/static/b.png"><img src="data:image/png;base64,AAAA"><img>"#;
        assert_eq!(
            extract_image_urls(html, &base()),
            vec!["https://www.pinterest.com/static/b.png".to_string()]
        );
    }
}
