//! Pinfeed core: pure per-consumer queue state machine.
mod effect;
mod item;
mod msg;
mod notice;
mod settings;
mod state;
mod update;
mod view_model;

pub use effect::{BlockOutcome, Effect, FetchRequest};
pub use item::{ConsumerId, Cursor, Item, ItemKey};
pub use msg::{FetchCompletion, Msg};
pub use notice::Notice;
pub use settings::QueueSettings;
pub use state::{CompletionOutcome, Session};
pub use update::update;
pub use view_model::{SessionPhase, SessionView};
