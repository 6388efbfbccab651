pub mod broadcaster;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod live;
pub mod monitor;
pub mod traits;

pub use broadcaster::{Broadcaster, Listener, ListenerId, DEFAULT_LISTENER_CAPACITY};
pub use dispatcher::Dispatcher;
pub use error::HeartlogError;
pub use event::{Event, EventType};
pub use live::{CloseReason, FrameEncoder, LiveFeedSession, DEFAULT_KEEPALIVE, MIN_KEEPALIVE};
pub use monitor::{bucketize, timelines, SourceKey, DEFAULT_WINDOW_HOURS};
pub use traits::EventStore;
