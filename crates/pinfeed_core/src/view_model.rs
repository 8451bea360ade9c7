use crate::Cursor;

/// Refill state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Fetching,
    /// Retry budget spent; no more fetches until the query changes.
    Exhausted,
}

/// Read-only snapshot of a session, for logging and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub query: String,
    pub phase: SessionPhase,
    pub queued: usize,
    pub shown: usize,
    pub delivered: usize,
    pub cursor: Option<Cursor>,
    pub fetch_in_flight: bool,
    pub failure_streak: u32,
    pub exhausted: bool,
    pub generation: u64,
    pub history: Vec<String>,
}
