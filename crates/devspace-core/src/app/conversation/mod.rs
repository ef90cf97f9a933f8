pub mod message;
pub mod transcript;

pub use message::{Fingerprint, Message, MessageContent, Origin, Role};
pub use transcript::Transcript;
