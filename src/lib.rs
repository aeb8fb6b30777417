pub mod command;
pub mod commands;
pub mod config;
pub mod discord;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod handler;
pub mod responder;

#[cfg(test)]
mod testing;

pub use dispatch::{DispatchOutcome, Dispatcher, InteractionContext, RouteTarget};
pub use engine::RoutingEngine;
pub use error::{BuildError, HandlerError, RegistryError};
pub use handler::{block, BoxFuture, HandlerChain, HandlerResult};

/// Custom data shared by every interaction
pub struct Data {
    pub config: config::Config,
    pub started_at: chrono::DateTime<chrono::Utc>,
}
