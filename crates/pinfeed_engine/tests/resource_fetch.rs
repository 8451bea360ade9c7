use std::collections::HashSet;

use pinfeed_core::Cursor;
use pinfeed_engine::{Fetcher, HttpSettings, ResourceApiFetcher};
use reqwest::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESOURCE_PATH: &str = "/resource/BaseSearchResource/get/";

fn page(urls: &[&str], bookmark: &str) -> String {
    let results: Vec<serde_json::Value> = urls
        .iter()
        .map(|url| serde_json::json!({ "images": { "orig": { "url": url } } }))
        .collect();
    serde_json::json!({
        "resource_response": {
            "data": { "results": results },
            "bookmark": bookmark,
        }
    })
    .to_string()
}

fn sent_bookmarks(request: &wiremock::Request) -> serde_json::Value {
    let data = request
        .url
        .query_pairs()
        .find(|(key, _)| key == "data")
        .map(|(_, value)| value.into_owned())
        .expect("data parameter");
    let data: serde_json::Value = serde_json::from_str(&data).unwrap();
    data["options"]["bookmarks"].clone()
}

#[tokio::test]
async fn returns_items_and_bookmark_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            page(
                &[
                    "https://i.pinimg.com/originals/a.jpg",
                    "https://i.pinimg.com/originals/b.jpg",
                ],
                "bm-2",
            ),
            "application/json",
        ))
        .mount(&server)
        .await;

    let fetcher =
        ResourceApiFetcher::new(Url::parse(&server.uri()).unwrap(), &HttpSettings::default())
            .unwrap();
    let batch = fetcher.fetch("cats", None, &HashSet::new()).await;
    assert_eq!(batch.items.len(), 2);
    assert_eq!(batch.next_cursor, Some(Cursor::new("bm-2")));

    let cursor = Cursor::new("bm-2");
    fetcher.fetch("cats", Some(&cursor), &HashSet::new()).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(sent_bookmarks(&requests[0]), serde_json::json!([]));
    assert_eq!(sent_bookmarks(&requests[1]), serde_json::json!(["bm-2"]));
}

#[tokio::test]
async fn end_of_results_clears_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            page(&["https://i.pinimg.com/originals/z.jpg"], "-end-"),
            "application/json",
        ))
        .mount(&server)
        .await;

    let fetcher =
        ResourceApiFetcher::new(Url::parse(&server.uri()).unwrap(), &HttpSettings::default())
            .unwrap();
    let cursor = Cursor::new("bm-9");
    let batch = fetcher.fetch("cats", Some(&cursor), &HashSet::new()).await;
    assert_eq!(batch.items.len(), 1);
    assert_eq!(batch.next_cursor, None);
}

#[tokio::test]
async fn malformed_json_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"oops\":", "application/json"))
        .mount(&server)
        .await;

    let fetcher =
        ResourceApiFetcher::new(Url::parse(&server.uri()).unwrap(), &HttpSettings::default())
            .unwrap();
    let cursor = Cursor::new("bm-1");
    let batch = fetcher.fetch("cats", Some(&cursor), &HashSet::new()).await;
    assert!(batch.items.is_empty());
    assert_eq!(batch.next_cursor, Some(cursor));
}
