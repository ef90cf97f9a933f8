pub mod controller;
pub mod conversation;
pub mod dispatch;
pub mod mode;
pub mod reconcile;
pub mod session_init;
pub mod state;
pub mod tool_model;

#[cfg(test)]
mod tests;

pub use controller::SpaceChat;
pub use conversation::{Message, MessageContent, Origin, Role, Transcript};
pub use dispatch::{DispatchError, SendOutcome, SendRequest};
pub use mode::{ModeDecision, Seed, WizardAction, WizardInputError};
pub use session_init::{InitializedSession, SessionInitError, SessionInitializer, SessionKind};
pub use state::{ChatEvent, ChatSnapshot, SpaceContext};
