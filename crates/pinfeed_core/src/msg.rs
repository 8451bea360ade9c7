use crate::{Cursor, Item};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Consumer sent a search text.
    QuerySubmitted(String),
    /// Start a background fetch if the queue is running low.
    RefillCheck,
    /// A background fetch finished (successfully or with a normalized failure).
    FetchCompleted(FetchCompletion),
    /// Consumer wants the next block.
    BlockRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCompletion {
    /// Generation the fetch was launched for.
    pub generation: u64,
    pub items: Vec<Item>,
    pub next_cursor: Option<Cursor>,
}
