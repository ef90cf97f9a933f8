pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod ids;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{ChatEvent, ChatSnapshot, SendOutcome, SendRequest, SpaceChat, SpaceContext};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use ids::{Generation, MessageId, SessionId, SpaceId};
