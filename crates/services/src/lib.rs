pub mod directory;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod matchmaking;
pub mod model;
pub mod registry;
pub mod relay;
pub mod session;

pub use directory::{NullDirectory, UserDirectory};
pub use error::{ErrorCode, ServiceError};
pub use events::{ClientIntent, ServerEvent, SignalKind};
pub use lifecycle::{EventSink, SessionLifecycle};
pub use matchmaking::MatchmakingQueue;
pub use model::{Participant, QueueEntry, Room, RoomStatus};
pub use registry::RoomRegistry;
pub use relay::SignalingRelay;
pub use session::SessionIndex;
