/// Sizing of the per-consumer delivery queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Items handed out per block.
    pub block_size: usize,
    /// A refill starts once fewer items than this are queued.
    pub low_watermark: usize,
    /// Consecutive zero-yield fetches before the query counts as exhausted.
    pub max_fetch_attempts: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            block_size: 5,
            low_watermark: 8,
            max_fetch_attempts: 3,
        }
    }
}
