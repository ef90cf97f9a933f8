pub mod cli;
pub mod commands;
pub mod error;
pub mod render;
pub mod repl;

pub use devspace_core::{api, app, config, utils};
