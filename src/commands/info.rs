use serde_json::{json, Value};

use crate::command::{CommandChoice, CommandDescriptor, ModuleDescriptor, OptionDescriptor};
use crate::discord::BotContext;
use crate::engine::RoutingEngine;
use crate::error::RegistryError;
use crate::handler::{BoxFuture, HandlerResult};

const ECHO_PRESETS: [&str; 4] = ["hello", "hello world", "ping", "still here"];

pub fn register(engine: &mut RoutingEngine<BotContext>) -> Result<(), RegistryError> {
    let mut scope = engine.commands_mut().scope(module_path!());
    scope.register(CommandDescriptor::chat_input("bot", stamp).description("About this bot"));

    scope.attach_module(
        "bot",
        ModuleDescriptor::group("info")
            .description("Build and runtime details")
            .subcommand_inline(
                ModuleDescriptor::subcommand("version", version)
                    .description("Show the running version"),
            ),
    )?;
    scope.attach_module(
        "bot",
        ModuleDescriptor::subcommand("uptime", uptime)
            .in_group("info")
            .description("Show how long the bot has been up"),
    )?;
    scope.attach_module(
        "bot",
        ModuleDescriptor::subcommand("echo", echo)
            .description("Repeat some text back")
            .option(
                OptionDescriptor::string("text")
                    .description("What to repeat")
                    .required(true)
                    .max_length(200)
                    .autocomplete(echo_presets),
            ),
    )?;
    Ok(())
}

/// First link of every `/bot` chain: records who invoked it.
fn stamp(ctx: &BotContext, _prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let user = ctx.user().map(|user| user.id.get());
        Ok(json!({ "invoked_by": user }))
    })
}

fn version(ctx: &BotContext, _prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        ctx.reply_ephemeral(format!(
            "{} v{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .await?;
        Ok(Value::Null)
    })
}

fn uptime(ctx: &BotContext, _prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        ctx.reply_ephemeral(format!("Up for {}.", super::ping::uptime(ctx)))
            .await?;
        Ok(Value::Null)
    })
}

fn echo(ctx: &BotContext, prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let text = ctx.str_option("text").unwrap_or_default();
        ctx.reply(text.to_string()).await?;
        Ok(prev)
    })
}

fn echo_presets(ctx: &BotContext) -> BoxFuture<'_, HandlerResult<Vec<CommandChoice>>> {
    Box::pin(async move { Ok(matching_presets(ctx.focused_value().unwrap_or_default())) })
}

fn matching_presets(typed: &str) -> Vec<CommandChoice> {
    let typed = typed.to_lowercase();
    ECHO_PRESETS
        .iter()
        .filter(|preset| preset.starts_with(&typed))
        .map(|preset| CommandChoice::new(*preset, *preset))
        .collect()
}
