//! The bot's commands and component responders.

pub mod info;
pub mod ping;
pub mod profile;

use crate::discord::BotContext;
use crate::engine::RoutingEngine;
use crate::error::RegistryError;

/// Load phase: registers every command and responder into `engine`.
pub fn load(engine: &mut RoutingEngine<BotContext>) -> Result<(), RegistryError> {
    ping::register(engine);
    info::register(engine)?;
    profile::register(engine);
    Ok(())
}
