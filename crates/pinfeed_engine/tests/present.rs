use std::collections::HashSet;
use std::sync::Mutex;

use pinfeed_core::{BlockOutcome, ConsumerId, Item, Notice};
use pinfeed_engine::{present_outcome, Delivery, DeliveryError, DeliveryReport};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sent {
    Item(String),
    Notice(Notice),
    Continue(bool),
}

#[derive(Default)]
struct RecordingDelivery {
    sent: Mutex<Vec<(ConsumerId, Sent)>>,
    broken_items: HashSet<String>,
    broken_notices: bool,
}

impl RecordingDelivery {
    fn take(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .drain(..)
            .map(|(_, sent)| sent)
            .collect()
    }
}

#[async_trait::async_trait]
impl Delivery for RecordingDelivery {
    async fn send_item(&self, consumer: ConsumerId, item: &Item) -> Result<(), DeliveryError> {
        if self.broken_items.contains(&item.url) {
            return Err(DeliveryError::Transport("photo rejected".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((consumer, Sent::Item(item.url.clone())));
        Ok(())
    }

    async fn send_notice(
        &self,
        consumer: ConsumerId,
        notice: Notice,
    ) -> Result<(), DeliveryError> {
        if self.broken_notices {
            return Err(DeliveryError::Transport("chat unavailable".to_string()));
        }
        self.sent.lock().unwrap().push((consumer, Sent::Notice(notice)));
        Ok(())
    }

    async fn offer_continue(
        &self,
        consumer: ConsumerId,
        enabled: bool,
    ) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((consumer, Sent::Continue(enabled)));
        Ok(())
    }
}

fn block(urls: &[&str], can_continue: bool) -> BlockOutcome {
    BlockOutcome::Delivered {
        items: urls.iter().map(|url| Item::from_url(*url)).collect(),
        can_continue,
    }
}

#[tokio::test]
async fn block_is_sent_in_order_then_continue_offered() {
    let delivery = RecordingDelivery::default();
    let report = present_outcome(&delivery, 1, &block(&["https://x/a.jpg", "https://x/b.jpg"], true)).await;

    assert_eq!(
        report,
        DeliveryReport {
            sent: 2,
            fallbacks: 0,
            failed: 0
        }
    );
    assert_eq!(
        delivery.take(),
        vec![
            Sent::Item("https://x/a.jpg".to_string()),
            Sent::Item("https://x/b.jpg".to_string()),
            Sent::Continue(true),
        ]
    );
}

#[tokio::test]
async fn failing_item_gets_link_fallback_and_rest_continue() {
    let delivery = RecordingDelivery {
        broken_items: ["https://x/b.jpg".to_string()].into(),
        ..RecordingDelivery::default()
    };
    let outcome = block(&["https://x/a.jpg", "https://x/b.jpg", "https://x/c.jpg"], false);
    let report = present_outcome(&delivery, 1, &outcome).await;

    assert_eq!(report.sent, 2);
    assert_eq!(report.fallbacks, 1);
    assert_eq!(
        delivery.take(),
        vec![
            Sent::Item("https://x/a.jpg".to_string()),
            Sent::Notice(Notice::ImageLink("https://x/b.jpg".to_string())),
            Sent::Item("https://x/c.jpg".to_string()),
            Sent::Continue(false),
        ]
    );
}

#[tokio::test]
async fn failed_fallback_is_counted_not_fatal() {
    let delivery = RecordingDelivery {
        broken_items: ["https://x/a.jpg".to_string()].into(),
        broken_notices: true,
        ..RecordingDelivery::default()
    };
    let report = present_outcome(&delivery, 1, &block(&["https://x/a.jpg", "https://x/b.jpg"], true)).await;

    assert_eq!(
        report,
        DeliveryReport {
            sent: 1,
            fallbacks: 0,
            failed: 1
        }
    );
    assert_eq!(
        delivery.take(),
        vec![Sent::Item("https://x/b.jpg".to_string()), Sent::Continue(true)]
    );
}

#[tokio::test]
async fn empty_outcomes_pick_the_right_notice() {
    let delivery = RecordingDelivery::default();
    present_outcome(&delivery, 1, &BlockOutcome::Empty { ever_shown: false }).await;
    present_outcome(&delivery, 1, &BlockOutcome::Empty { ever_shown: true }).await;

    assert_eq!(
        delivery.take(),
        vec![
            Sent::Notice(Notice::NothingFound),
            Sent::Notice(Notice::NoMoreItems)
        ]
    );
}
