use serde_json::Value;
use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateInteractionResponseMessage, User,
};

use crate::command::CommandDescriptor;
use crate::discord::BotContext;
use crate::engine::RoutingEngine;
use crate::handler::{BoxFuture, HandlerResult};
use crate::responder::{ResponderDescriptor, RouteMatch};

pub fn register(engine: &mut RoutingEngine<BotContext>) {
    engine
        .commands_mut()
        .scope(module_path!())
        .register(CommandDescriptor::user("Profile", profile));
    engine
        .responders_mut()
        .register(ResponderDescriptor::button("/profile/refresh/:user", refresh));
}

pub fn refresh_id(user: &User) -> String {
    format!("/profile/refresh/{}", user.id)
}

fn describe(user: &User) -> String {
    format!(
        "**{}**\nid: `{}`\ncreated: <t:{}:R>\nbot: {}",
        user.name,
        user.id,
        user.id.created_at().unix_timestamp(),
        if user.bot { "yes" } else { "no" }
    )
}

fn card(user: &User) -> CreateInteractionResponseMessage {
    let refresh = CreateButton::new(refresh_id(user))
        .label("Refresh")
        .style(ButtonStyle::Secondary);
    CreateInteractionResponseMessage::new()
        .content(describe(user))
        .components(vec![CreateActionRow::Buttons(vec![refresh])])
}

fn profile(ctx: &BotContext, _prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move {
        let Some(user) = ctx.target_user() else {
            return Err(anyhow::anyhow!("profile invoked without a target user").into());
        };
        ctx.respond(card(user).ephemeral(true)).await?;
        Ok(Value::Null)
    })
}

fn refresh(ctx: &BotContext, route: RouteMatch) -> BoxFuture<'_, HandlerResult<()>> {
    Box::pin(async move {
        let user_id: u64 = route
            .param("user")
            .and_then(|id| id.parse().ok())
            .filter(|id| *id != 0)
            .ok_or_else(|| anyhow::anyhow!("malformed profile id in `{}`", route.identifier))?;
        let user = ctx.serenity.http.get_user(user_id.into()).await?;
        ctx.update_message(card(&user)).await
    })
}
