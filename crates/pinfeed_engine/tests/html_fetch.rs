use std::collections::HashSet;

use pinfeed_core::{Cursor, ItemKey};
use pinfeed_engine::{Fetcher, HtmlSearchFetcher, HttpSettings};
use reqwest::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PAGE: &str = r#"<html><body>
  <div data-test-id="pin"><img alt="a" src="https://i.pinimg.com/236x/aa/a1.jpg"
       srcset="https://i.pinimg.com/236x/aa/a1.jpg 1x, https://i.pinimg.com/originals/aa/a1.jpg 4x"></div>
  <div data-test-id="pin"><img alt="b" src="https://i.pinimg.com/236x/bb/b2.jpg"
       srcset="https://i.pinimg.com/236x/bb/b2.jpg 1x, https://i.pinimg.com/736x/bb/b2.jpg 3x"></div>
  <div data-test-id="pin"><img alt="dup" src="https://i.pinimg.com/474x/aa/a1.jpg"></div>
</body></html>"#;

async fn fetcher_for(server: &MockServer) -> HtmlSearchFetcher {
    let base = Url::parse(&server.uri()).unwrap();
    HtmlSearchFetcher::new(base, &HttpSettings::default()).unwrap()
}

#[tokio::test]
async fn scrapes_largest_candidates_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/pins/"))
        .and(query_param("q", "red cats"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SEARCH_PAGE, "text/html; charset=utf-8"))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server).await;
    let batch = fetcher.fetch("red cats", None, &HashSet::new()).await;

    let urls: Vec<&str> = batch.items.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://i.pinimg.com/originals/aa/a1.jpg",
            "https://i.pinimg.com/736x/bb/b2.jpg"
        ]
    );
    assert_eq!(batch.next_cursor, None);
}

#[tokio::test]
async fn seen_items_are_not_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/pins/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SEARCH_PAGE, "text/html"))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server).await;
    let seen: HashSet<ItemKey> = [ItemKey::for_url("https://i.pinimg.com/236x/aa/a1.jpg")].into();
    let batch = fetcher.fetch("cats", None, &seen).await;

    assert_eq!(batch.items.len(), 1);
    assert_eq!(batch.items[0].url, "https://i.pinimg.com/736x/bb/b2.jpg");
}

#[tokio::test]
async fn http_failure_becomes_empty_batch_with_cursor_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/pins/"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server).await;
    let cursor = Cursor::new("keep-me");
    let batch = fetcher.fetch("cats", Some(&cursor), &HashSet::new()).await;

    assert!(batch.items.is_empty());
    assert_eq!(batch.next_cursor, Some(cursor));
}

#[tokio::test]
async fn non_html_response_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/pins/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server).await;
    let batch = fetcher.fetch("cats", None, &HashSet::new()).await;
    assert!(batch.items.is_empty());
}
