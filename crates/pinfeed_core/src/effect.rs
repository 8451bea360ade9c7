use std::collections::HashSet;

use crate::{Cursor, Item, ItemKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run one discovery round trip in the background and report back with
    /// `Msg::FetchCompleted`.
    StartFetch(FetchRequest),
    /// Hand a block (or the lack of one) to the consumer.
    Present(BlockOutcome),
}

/// Everything a fetch needs, captured at launch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub query: String,
    pub cursor: Option<Cursor>,
    pub seen: HashSet<ItemKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Delivered { items: Vec<Item>, can_continue: bool },
    /// Nothing to hand out. `ever_shown` separates "nothing found for this
    /// query" from "everything found has already been shown".
    Empty { ever_shown: bool },
}

impl BlockOutcome {
    pub fn items(&self) -> &[Item] {
        match self {
            BlockOutcome::Delivered { items, .. } => items,
            BlockOutcome::Empty { .. } => &[],
        }
    }
}
