//! Pinfeed engine: fetch strategies, session store and the async queue driver.
mod deliver;
mod engine;
mod fetch;
mod html;
mod resource;
mod store;
mod types;

pub use deliver::{present_outcome, Delivery, DeliveryError, DeliveryReport};
pub use engine::{EngineConfig, QueueManager};
pub use fetch::{Fetcher, HttpSettings};
pub use html::HtmlSearchFetcher;
pub use resource::ResourceApiFetcher;
pub use store::{SessionSlot, SessionStore};
pub use types::{FailureKind, FetchBatch, FetchError};
