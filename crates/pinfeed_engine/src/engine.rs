use std::sync::Arc;
use std::time::Duration;

use pinfeed_core::{
    BlockOutcome, ConsumerId, Effect, FetchCompletion, FetchRequest, Msg, QueueSettings,
};
use pinfeed_logging::{feed_debug, feed_info, feed_warn};
use tokio::time::Instant;

use crate::store::{SessionSlot, SessionStore};
use crate::{FetchBatch, Fetcher};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub queue: QueueSettings,
    /// Hard limit on a single fetch round trip.
    pub fetch_timeout: Duration,
    /// How long a block request waits on an in-flight fetch when the queue is empty.
    pub block_wait: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue: QueueSettings::default(),
            fetch_timeout: Duration::from_secs(30),
            block_wait: Duration::from_secs(5),
        }
    }
}

/// Drives sessions: executes the effects the core asks for and answers
/// consumer requests with blocks.
///
/// Fetches run as detached tasks. Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct QueueManager {
    fetcher: Arc<dyn Fetcher>,
    store: SessionStore,
    config: EngineConfig,
}

impl QueueManager {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: EngineConfig) -> Self {
        Self {
            fetcher,
            store: SessionStore::new(config.queue),
            config,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// New search text from a consumer: switch the session's query, then serve a block.
    pub async fn handle_query(&self, consumer: ConsumerId, text: &str) -> BlockOutcome {
        let slot = self.store.get_or_create(consumer);
        let effects = slot.apply(Msg::QuerySubmitted(text.to_string())).await;
        self.run_effects(consumer, &slot, effects);

        let view = slot.view().await;
        feed_info!(
            "QuerySubmitted consumer={} query={:?} generation={} queued={}",
            consumer,
            view.query,
            view.generation,
            view.queued
        );
        self.next_block(consumer, &slot).await
    }

    /// "Show more" from a consumer. `None` when the consumer has no session yet.
    pub async fn handle_continue(&self, consumer: ConsumerId) -> Option<BlockOutcome> {
        let Some(slot) = self.store.get(consumer) else {
            feed_debug!("Continue from consumer={} without a session", consumer);
            return None;
        };
        Some(self.next_block(consumer, &slot).await)
    }

    async fn next_block(&self, consumer: ConsumerId, slot: &Arc<SessionSlot>) -> BlockOutcome {
        let deadline = Instant::now() + self.config.block_wait;
        loop {
            let changed = slot.changed();
            let effects = slot.apply(Msg::RefillCheck).await;
            self.run_effects(consumer, slot, effects);

            let (queued, in_flight) = slot
                .inspect(|s| (s.queued_len(), s.is_fetch_in_flight()))
                .await;
            if queued > 0 || !in_flight {
                break;
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                feed_debug!("Block wait timed out for consumer={}", consumer);
                break;
            }
        }

        let effects = slot.apply(Msg::BlockRequested).await;
        let outcome = self
            .run_effects(consumer, slot, effects)
            .unwrap_or(BlockOutcome::Empty { ever_shown: false });
        match &outcome {
            BlockOutcome::Delivered {
                items,
                can_continue,
            } => feed_info!(
                "Block consumer={} items={} can_continue={}",
                consumer,
                items.len(),
                can_continue
            ),
            BlockOutcome::Empty { ever_shown } => {
                feed_info!("Empty block consumer={} ever_shown={}", consumer, ever_shown)
            }
        }
        outcome
    }

    /// Starts requested fetches and returns the presented block, if any.
    fn run_effects(
        &self,
        consumer: ConsumerId,
        slot: &Arc<SessionSlot>,
        effects: Vec<Effect>,
    ) -> Option<BlockOutcome> {
        let mut presented = None;
        for effect in effects {
            match effect {
                Effect::StartFetch(request) => self.spawn_fetch(consumer, Arc::clone(slot), request),
                Effect::Present(outcome) => presented = Some(outcome),
            }
        }
        presented
    }

    fn spawn_fetch(&self, consumer: ConsumerId, slot: Arc<SessionSlot>, request: FetchRequest) {
        feed_info!(
            "StartFetch consumer={} generation={} query={:?} seen={} cursor={}",
            consumer,
            request.generation,
            request.query,
            request.seen.len(),
            request.cursor.is_some()
        );
        let manager = self.clone();
        tokio::spawn(async move {
            let completion =
                run_fetch(manager.fetcher.as_ref(), &request, manager.config.fetch_timeout).await;
            let fetched = completion.items.len();
            let effects = slot.apply(Msg::FetchCompleted(completion)).await;

            let view = slot.view().await;
            if view.generation != request.generation {
                feed_info!(
                    "Discarded stale fetch consumer={} query={:?} generation={} (now {})",
                    consumer,
                    request.query,
                    request.generation,
                    view.generation
                );
            } else {
                feed_info!(
                    "FetchCompleted consumer={} fetched={} queued={} streak={} exhausted={}",
                    consumer,
                    fetched,
                    view.queued,
                    view.failure_streak,
                    view.exhausted
                );
            }

            manager.run_effects(consumer, &slot, effects);
            slot.notify_changed();
        });
    }
}

async fn run_fetch(
    fetcher: &dyn Fetcher,
    request: &FetchRequest,
    limit: Duration,
) -> FetchCompletion {
    let cursor = request.cursor.as_ref();
    let fetch = fetcher.fetch(&request.query, cursor, &request.seen);
    let batch = match tokio::time::timeout(limit, fetch).await {
        Ok(batch) => batch,
        Err(_) => {
            feed_warn!(
                "Fetch for query={:?} timed out after {:?}",
                request.query,
                limit
            );
            FetchBatch::unchanged(request.cursor.clone())
        }
    };

    FetchCompletion {
        generation: request.generation,
        items: batch.items,
        next_cursor: batch.next_cursor,
    }
}
