//! `serenity` adapter: interaction context, gateway handler, schema submission.

mod context;
mod gateway;
pub mod hooks;
pub mod register;

pub use context::{command_target, leaf_options, subcommand_path, BotContext};
pub use gateway::Handler;
pub use register::SubmissionPlan;
