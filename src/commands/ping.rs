use std::time::Duration;

use serde_json::Value;

use crate::command::CommandDescriptor;
use crate::discord::BotContext;
use crate::engine::RoutingEngine;
use crate::handler::{BoxFuture, HandlerResult};

pub fn register(engine: &mut RoutingEngine<BotContext>) {
    engine.commands_mut().scope(module_path!()).register(
        CommandDescriptor::chat_input("ping", ping)
            .description("Check that the bot is alive")
            .dm_permission(true),
    );
}

/// Uptime rounded down to whole seconds.
pub fn uptime(ctx: &BotContext) -> String {
    let elapsed = chrono::Utc::now() - ctx.data.started_at;
    let seconds = elapsed.num_seconds().max(0) as u64;
    humantime::format_duration(Duration::from_secs(seconds)).to_string()
}

fn ping(ctx: &BotContext, _prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        ctx.reply(format!("Pong! Up for {}.", uptime(ctx))).await?;
        Ok(Value::Null)
    })
}
