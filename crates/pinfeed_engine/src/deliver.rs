use pinfeed_core::{BlockOutcome, ConsumerId, Item, Notice};
use pinfeed_logging::{feed_debug, feed_warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("item url rejected: {0}")]
    InvalidItem(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outbound side of the messaging transport.
#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    async fn send_item(&self, consumer: ConsumerId, item: &Item) -> Result<(), DeliveryError>;

    async fn send_notice(&self, consumer: ConsumerId, notice: Notice)
        -> Result<(), DeliveryError>;

    /// Offers (or withdraws) the "show more" affordance after a block.
    async fn offer_continue(&self, consumer: ConsumerId, enabled: bool)
        -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Items sent as images.
    pub sent: usize,
    /// Items that failed and were replaced by a text link.
    pub fallbacks: usize,
    /// Items for which even the fallback failed.
    pub failed: usize,
}

/// Sends an outcome to the consumer. Failures are logged and never abort the block.
pub async fn present_outcome(
    delivery: &dyn Delivery,
    consumer: ConsumerId,
    outcome: &BlockOutcome,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    match outcome {
        BlockOutcome::Delivered {
            items,
            can_continue,
        } => {
            for item in items {
                match delivery.send_item(consumer, item).await {
                    Ok(()) => report.sent += 1,
                    Err(err) => {
                        feed_warn!(
                            "Failed to send item {} to consumer={}: {}",
                            item.key,
                            consumer,
                            err
                        );
                        let fallback = Notice::ImageLink(item.url.clone());
                        match delivery.send_notice(consumer, fallback).await {
                            Ok(()) => report.fallbacks += 1,
                            Err(err) => {
                                feed_warn!("Fallback for {} also failed: {}", item.key, err);
                                report.failed += 1;
                            }
                        }
                    }
                }
            }
            if let Err(err) = delivery.offer_continue(consumer, *can_continue).await {
                feed_warn!("Failed to offer continue to consumer={}: {}", consumer, err);
            }
        }
        BlockOutcome::Empty { ever_shown } => {
            let notice = if *ever_shown {
                Notice::NoMoreItems
            } else {
                Notice::NothingFound
            };
            if let Err(err) = delivery.send_notice(consumer, notice).await {
                feed_warn!("Failed to send notice to consumer={}: {}", consumer, err);
            }
        }
    }
    feed_debug!("Presented to consumer={}: {:?}", consumer, report);
    report
}
