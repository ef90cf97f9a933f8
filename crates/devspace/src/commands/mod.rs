use async_trait::async_trait;
use eyre::Result;

pub mod chat;
pub mod config;
pub mod tools;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
