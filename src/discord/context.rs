use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    CommandData, CommandDataOption, CommandDataOptionValue, CommandInteraction,
    ComponentInteractionDataKind, Context, CreateAutocompleteResponse, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, Interaction,
    ResolvedTarget, User, UserId,
};

use crate::command::{ChoiceValue, CommandChoice, CommandType};
use crate::dispatch::{InteractionContext, RouteTarget};
use crate::handler::HandlerResult;
use crate::responder::ResponderType;
use crate::Data;

/// One gateway interaction plus what its handlers need to answer it.
pub struct BotContext {
    pub serenity: Context,
    pub interaction: Interaction,
    pub data: Arc<Data>,
    responded: AtomicBool,
}

impl BotContext {
    pub fn new(serenity: Context, interaction: Interaction, data: Arc<Data>) -> Self {
        Self {
            serenity,
            interaction,
            data,
            responded: AtomicBool::new(false),
        }
    }

    fn command(&self) -> Option<&CommandInteraction> {
        match &self.interaction {
            Interaction::Command(command) | Interaction::Autocomplete(command) => Some(command),
            _ => None,
        }
    }

    fn leaf_options(&self) -> &[CommandDataOption] {
        self.command()
            .map(|command| leaf_options(&command.data.options))
            .unwrap_or_default()
    }

    fn option(&self, name: &str) -> Option<&CommandDataOptionValue> {
        self.leaf_options()
            .iter()
            .find(|option| option.name == name)
            .map(|option| &option.value)
    }

    pub fn str_option(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(CommandDataOptionValue::as_str)
    }

    pub fn i64_option(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(CommandDataOptionValue::as_i64)
    }

    pub fn f64_option(&self, name: &str) -> Option<f64> {
        self.option(name).and_then(CommandDataOptionValue::as_f64)
    }

    pub fn bool_option(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(CommandDataOptionValue::as_bool)
    }

    pub fn user_option(&self, name: &str) -> Option<UserId> {
        self.option(name).and_then(CommandDataOptionValue::as_user_id)
    }

    /// What the user has typed so far into the focused option.
    pub fn focused_value(&self) -> Option<&str> {
        self.leaf_options()
            .iter()
            .find_map(|option| match &option.value {
                CommandDataOptionValue::Autocomplete { value, .. } => Some(value.as_str()),
                _ => None,
            })
    }

    /// The user who triggered the interaction. `None` only for pings.
    pub fn user(&self) -> Option<&User> {
        match &self.interaction {
            Interaction::Command(command) | Interaction::Autocomplete(command) => {
                Some(&command.user)
            }
            Interaction::Component(component) => Some(&component.user),
            Interaction::Modal(modal) => Some(&modal.user),
            _ => None,
        }
    }

    /// The user a user context-menu command was invoked on.
    pub fn target_user(&self) -> Option<&User> {
        match self.command()?.data.target()? {
            ResolvedTarget::User(user, _) => Some(user),
            _ => None,
        }
    }

    pub fn has_responded(&self) -> bool {
        self.responded.load(Ordering::Acquire)
    }

    pub async fn reply(&self, content: impl Into<String>) -> HandlerResult<()> {
        self.send(content.into(), false).await
    }

    pub async fn reply_ephemeral(&self, content: impl Into<String>) -> HandlerResult<()> {
        self.send(content.into(), true).await
    }

    /// Replaces the message a component is attached to.
    pub async fn update_message(
        &self,
        message: CreateInteractionResponseMessage,
    ) -> HandlerResult<()> {
        let response = CreateInteractionResponse::UpdateMessage(message);
        let http = &self.serenity.http;
        match &self.interaction {
            Interaction::Component(component) => component.create_response(http, response).await?,
            Interaction::Modal(modal) => modal.create_response(http, response).await?,
            _ => return Err(anyhow::anyhow!("only components can update a message").into()),
        }
        self.responded.store(true, Ordering::Release);
        Ok(())
    }

    /// Sends the initial response, or a followup once one was sent.
    async fn send(&self, content: String, ephemeral: bool) -> HandlerResult<()> {
        let http = &self.serenity.http;
        if self.has_responded() {
            let followup = CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(ephemeral);
            match &self.interaction {
                Interaction::Command(command) => command.create_followup(http, followup).await?,
                Interaction::Component(component) => {
                    component.create_followup(http, followup).await?
                }
                Interaction::Modal(modal) => modal.create_followup(http, followup).await?,
                _ => return Err(anyhow::anyhow!("interaction cannot take a followup").into()),
            };
            return Ok(());
        }

        self.respond(
            CreateInteractionResponseMessage::new()
                .content(content)
                .ephemeral(ephemeral),
        )
        .await
    }

    /// Sends `message` as the initial response.
    pub async fn respond(&self, message: CreateInteractionResponseMessage) -> HandlerResult<()> {
        let response = CreateInteractionResponse::Message(message);
        let http = &self.serenity.http;
        match &self.interaction {
            Interaction::Command(command) => command.create_response(http, response).await?,
            Interaction::Component(component) => component.create_response(http, response).await?,
            Interaction::Modal(modal) => modal.create_response(http, response).await?,
            _ => return Err(anyhow::anyhow!("interaction cannot take a reply").into()),
        }
        self.responded.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl InteractionContext for BotContext {
    fn target(&self) -> RouteTarget {
        match &self.interaction {
            Interaction::Command(command) => command_target(&command.data),
            Interaction::Autocomplete(command) => {
                let Some(focused) = command.data.autocomplete() else {
                    return RouteTarget::Unsupported;
                };
                let (group, subcommand) = subcommand_path(&command.data.options);
                RouteTarget::Autocomplete {
                    name: command.data.name.clone(),
                    group,
                    subcommand,
                    focused: focused.name.to_string(),
                }
            }
            Interaction::Component(component) => {
                let kind = match component.data.kind {
                    ComponentInteractionDataKind::Button => ResponderType::Button,
                    ComponentInteractionDataKind::StringSelect { .. } => {
                        ResponderType::StringSelect
                    }
                    ComponentInteractionDataKind::UserSelect { .. } => ResponderType::UserSelect,
                    ComponentInteractionDataKind::RoleSelect { .. } => ResponderType::RoleSelect,
                    ComponentInteractionDataKind::ChannelSelect { .. } => {
                        ResponderType::ChannelSelect
                    }
                    ComponentInteractionDataKind::MentionableSelect { .. } => {
                        ResponderType::MentionableSelect
                    }
                    _ => return RouteTarget::Unsupported,
                };
                RouteTarget::Component {
                    kind,
                    identifier: component.data.custom_id.clone(),
                }
            }
            Interaction::Modal(modal) => RouteTarget::Component {
                kind: ResponderType::Modal,
                identifier: modal.data.custom_id.clone(),
            },
            _ => RouteTarget::Unsupported,
        }
    }

    async fn suggest(&self, choices: Vec<CommandChoice>) -> HandlerResult<()> {
        let Interaction::Autocomplete(command) = &self.interaction else {
            return Err(anyhow::anyhow!("suggestions need an autocomplete interaction").into());
        };

        let mut response = CreateAutocompleteResponse::new();
        for choice in choices {
            response = match choice.value {
                ChoiceValue::String(value) => response.add_string_choice(choice.name, value),
                ChoiceValue::Integer(value) => response.add_int_choice(choice.name, value),
                ChoiceValue::Number(value) => response.add_number_choice(choice.name, value),
            };
        }
        command
            .create_response(
                &self.serenity.http,
                CreateInteractionResponse::Autocomplete(response),
            )
            .await?;
        self.responded.store(true, Ordering::Release);
        Ok(())
    }
}

/// Route for an invoked command. Command types the registry does not know
/// are unsupported.
pub fn command_target(data: &CommandData) -> RouteTarget {
    let kind = match data.kind {
        serenity::all::CommandType::ChatInput => CommandType::ChatInput,
        serenity::all::CommandType::User => CommandType::UserContextMenu,
        serenity::all::CommandType::Message => CommandType::MessageContextMenu,
        _ => return RouteTarget::Unsupported,
    };
    let (group, subcommand) = subcommand_path(&data.options);
    RouteTarget::Command {
        kind,
        name: data.name.clone(),
        group,
        subcommand,
    }
}

/// Group and subcommand names selected by an invocation's options.
pub fn subcommand_path(options: &[CommandDataOption]) -> (Option<String>, Option<String>) {
    match options.first().map(|option| (&option.name, &option.value)) {
        Some((group, CommandDataOptionValue::SubCommandGroup(inner))) => {
            let subcommand = inner.first().map(|option| option.name.clone());
            (Some(group.clone()), subcommand)
        }
        Some((subcommand, CommandDataOptionValue::SubCommand(_))) => {
            (None, Some(subcommand.clone()))
        }
        _ => (None, None),
    }
}

/// The leaf options of an invocation, below any group and subcommand.
pub fn leaf_options(options: &[CommandDataOption]) -> &[CommandDataOption] {
    match options.first().map(|option| &option.value) {
        Some(CommandDataOptionValue::SubCommandGroup(inner))
        | Some(CommandDataOptionValue::SubCommand(inner)) => leaf_options(inner),
        _ => options,
    }
}
