use std::collections::{HashSet, VecDeque};

use crate::{
    BlockOutcome, FetchCompletion, FetchRequest, Item, ItemKey, QueueSettings, SessionPhase,
    SessionView,
};

/// Per-consumer fetch and delivery state for the active query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    settings: QueueSettings,
    query: String,
    queue: VecDeque<Item>,
    /// Every key ever enqueued or delivered for the current query.
    shown: HashSet<ItemKey>,
    cursor: Option<crate::Cursor>,
    fetch_in_flight: bool,
    fetch_failure_streak: u32,
    exhausted: bool,
    history: Vec<String>,
    /// Bumped on every query change; fetches carry the value they were launched with.
    generation: u64,
    delivered: usize,
}

/// What applying a fetch completion did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The fetch belonged to a previous query and was dropped.
    Stale,
    /// `merged` new items were queued; `exhausted` is set when this
    /// completion spent the last retry.
    Applied { merged: usize, exhausted: bool },
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: QueueSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            query: self.query.clone(),
            phase: self.phase(),
            queued: self.queue.len(),
            shown: self.shown.len(),
            delivered: self.delivered,
            cursor: self.cursor.clone(),
            fetch_in_flight: self.fetch_in_flight,
            failure_streak: self.fetch_failure_streak,
            exhausted: self.exhausted,
            generation: self.generation,
            history: self.history.clone(),
        }
    }

    pub fn settings(&self) -> QueueSettings {
        self.settings
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_fetch_in_flight(&self) -> bool {
        self.fetch_in_flight
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn has_shown(&self, key: &ItemKey) -> bool {
        self.shown.contains(key)
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn phase(&self) -> SessionPhase {
        if self.exhausted {
            SessionPhase::Exhausted
        } else if self.fetch_in_flight {
            SessionPhase::Fetching
        } else {
            SessionPhase::Idle
        }
    }

    /// Switches to `query`, returning whether it differed from the active one.
    ///
    /// A change wipes every query-scoped field and frees the fetch slot. A
    /// fetch still running for the old query completes as stale.
    pub fn set_query(&mut self, query: &str) -> bool {
        self.history.push(query.to_string());
        if query == self.query {
            return false;
        }

        self.query = query.to_string();
        self.queue.clear();
        self.shown.clear();
        self.cursor = None;
        self.fetch_failure_streak = 0;
        self.exhausted = false;
        self.delivered = 0;
        self.fetch_in_flight = false;
        self.generation += 1;
        true
    }

    /// Claims the fetch slot when the queue is below the watermark.
    pub fn ensure_refill(&mut self) -> Option<FetchRequest> {
        if self.query.is_empty()
            || self.exhausted
            || self.fetch_in_flight
            || self.queue.len() >= self.settings.low_watermark
        {
            return None;
        }

        self.fetch_in_flight = true;
        Some(FetchRequest {
            generation: self.generation,
            query: self.query.clone(),
            cursor: self.cursor.clone(),
            seen: self.shown.clone(),
        })
    }

    pub fn on_fetch_complete(&mut self, completion: FetchCompletion) -> CompletionOutcome {
        // The slot belongs to the current generation; a stale completion leaves it alone.
        if completion.generation != self.generation {
            return CompletionOutcome::Stale;
        }
        self.fetch_in_flight = false;

        let mut merged = 0;
        for item in completion.items {
            // `shown` covers the queue as well, so this also skips queued duplicates.
            if self.shown.insert(item.key.clone()) {
                self.queue.push_back(item);
                merged += 1;
            }
        }
        self.cursor = completion.next_cursor;

        let mut exhausted_now = false;
        if merged == 0 {
            self.fetch_failure_streak += 1;
            if !self.exhausted && self.fetch_failure_streak >= self.settings.max_fetch_attempts {
                self.exhausted = true;
                exhausted_now = true;
            }
        } else {
            self.fetch_failure_streak = 0;
        }

        CompletionOutcome::Applied {
            merged,
            exhausted: exhausted_now,
        }
    }

    /// Pops up to one block, FIFO. A short queue yields a short block.
    pub fn take_block(&mut self) -> BlockOutcome {
        if self.queue.is_empty() {
            return BlockOutcome::Empty {
                ever_shown: !self.shown.is_empty(),
            };
        }

        let take = self.settings.block_size.min(self.queue.len());
        let items: Vec<Item> = self.queue.drain(..take).collect();
        self.delivered += items.len();
        BlockOutcome::Delivered {
            items,
            can_continue: !self.exhausted,
        }
    }
}
