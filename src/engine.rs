use tracing::info;

use crate::command::{CommandRegistry, WireCommand};
use crate::error::BuildError;
use crate::responder::ResponderRouter;

/// Owns both registries.
///
/// Populate it during startup through `&mut`, then share it behind an `Arc`
/// for dispatch. `reset` needs exclusive access again, so it cannot race
/// in-flight interactions.
pub struct RoutingEngine<C> {
    commands: CommandRegistry<C>,
    responders: ResponderRouter<C>,
}

impl<C> Default for RoutingEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RoutingEngine<C> {
    pub fn new() -> Self {
        Self {
            commands: CommandRegistry::new(),
            responders: ResponderRouter::new(),
        }
    }

    pub fn commands(&self) -> &CommandRegistry<C> {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandRegistry<C> {
        &mut self.commands
    }

    pub fn responders(&self) -> &ResponderRouter<C> {
        &self.responders
    }

    pub fn responders_mut(&mut self) -> &mut ResponderRouter<C> {
        &mut self.responders
    }

    pub fn build(&mut self) -> Result<Vec<WireCommand>, BuildError> {
        self.commands.build()
    }

    /// Empties both registries, for hot-reload flows.
    pub fn reset(&mut self) {
        info!(
            "Resetting routing engine ({} commands, {} responder routes)",
            self.commands.len(),
            self.responders.len()
        );
        self.commands.reset();
        self.responders.clear();
    }
}
