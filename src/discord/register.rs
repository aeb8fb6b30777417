//! Submission of the built command schema.

use serenity::all::{GuildId, Http};
use tracing::info;

use crate::command::{BuildScope, CommandRegistry, WireCommand};
use crate::config::{Config, GuildScopes};
use crate::error::BuildError;

/// Where one batch of commands is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Global,
    Guild(GuildId),
}

/// Every schema batch to submit, built up front so build failures surface
/// before the client connects.
#[derive(Debug, Clone, Default)]
pub struct SubmissionPlan {
    pub batches: Vec<(Destination, Vec<WireCommand>)>,
}

impl SubmissionPlan {
    pub fn prepare<C>(
        registry: &mut CommandRegistry<C>,
        config: &Config,
    ) -> Result<Self, BuildError> {
        let mut batches = Vec::new();
        match config.guild_scopes() {
            GuildScopes::Dev(guild) => {
                batches.push((Destination::Guild(guild), registry.build_scope(BuildScope::All)?));
            }
            GuildScopes::AllowList(guilds) => {
                for guild in guilds {
                    let commands = registry.build_scope(BuildScope::Guild(guild))?;
                    batches.push((Destination::Guild(guild), commands));
                }
            }
            GuildScopes::Global => {
                batches.push((Destination::Global, registry.build_scope(BuildScope::Global)?));
                for guild in registry.restricted_guilds() {
                    let commands = registry.build_scope(BuildScope::GuildOnly(guild))?;
                    batches.push((Destination::Guild(guild), commands));
                }
            }
        }
        Ok(Self { batches })
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Overwrites each destination's commands with its batch.
    pub async fn submit(&self, http: &Http) -> serenity::Result<()> {
        for (destination, commands) in &self.batches {
            match destination {
                Destination::Global => {
                    let created = http.create_global_commands(commands).await?;
                    info!("Registered {} global commands", created.len());
                }
                Destination::Guild(guild) => {
                    let created = http.create_guild_commands(*guild, commands).await?;
                    info!("Registered {} commands in guild {}", created.len(), guild);
                }
            }
        }
        Ok(())
    }
}
