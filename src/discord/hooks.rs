//! Dispatch hooks used by the bot binary.

use serde_json::Value;
use tracing::{error, warn};

use super::BotContext;
use crate::error::HandlerError;
use crate::handler::{block, BoxFuture, HandlerResult};

/// Middleware that drops interactions from bot accounts.
pub fn ignore_bots(ctx: &BotContext, prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        match ctx.user() {
            Some(user) if user.bot => block(),
            _ => Ok(prev),
        }
    })
}

/// Answers commands the gateway delivered but the registry does not know,
/// usually left over from an earlier schema.
pub fn not_found(ctx: &BotContext) -> BoxFuture<'_, HandlerResult<()>> {
    Box::pin(async move {
        warn!("Received a command that is no longer registered");
        ctx.reply_ephemeral("This command is no longer available.")
            .await
    })
}

pub fn report_error(ctx: &BotContext, err: HandlerError) -> BoxFuture<'_, HandlerResult<()>> {
    Box::pin(async move {
        error!("Handler failed: {:?}", err);
        ctx.reply_ephemeral(format!("Something went wrong: {}", err))
            .await
    })
}
