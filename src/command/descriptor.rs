use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};
use serenity::model::id::GuildId;
use serenity::model::permissions::Permissions;

use crate::handler::{AutocompleteFn, CommandFn};

/// Platform limit on command, option and choice names.
pub const MAX_NAME_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandType {
    ChatInput,
    UserContextMenu,
    MessageContextMenu,
}

impl CommandType {
    /// Label used as the first segment of a resolved path.
    pub fn label(self) -> &'static str {
        match self {
            CommandType::ChatInput => "ChatInput",
            CommandType::UserContextMenu => "User",
            CommandType::MessageContextMenu => "Message",
        }
    }

    pub fn wire_value(self) -> u8 {
        match self {
            CommandType::ChatInput => 1,
            CommandType::UserContextMenu => 2,
            CommandType::MessageContextMenu => 3,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for CommandType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.wire_value())
    }
}

/// Leaf parameter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionKind {
    pub fn wire_value(self) -> u8 {
        match self {
            OptionKind::String => 3,
            OptionKind::Integer => 4,
            OptionKind::Boolean => 5,
            OptionKind::User => 6,
            OptionKind::Channel => 7,
            OptionKind::Role => 8,
            OptionKind::Mentionable => 9,
            OptionKind::Number => 10,
            OptionKind::Attachment => 11,
        }
    }

    /// Only string and numeric options may offer choices or autocomplete.
    pub fn accepts_choices(self) -> bool {
        matches!(
            self,
            OptionKind::String | OptionKind::Integer | OptionKind::Number
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    String(String),
    Integer(i64),
    Number(f64),
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        ChoiceValue::String(value.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(value: String) -> Self {
        ChoiceValue::String(value)
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        ChoiceValue::Integer(value)
    }
}

impl From<i32> for ChoiceValue {
    fn from(value: i32) -> Self {
        ChoiceValue::Integer(value.into())
    }
}

impl From<f64> for ChoiceValue {
    fn from(value: f64) -> Self {
        ChoiceValue::Number(value)
    }
}

/// A fixed choice on an option, or one autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandChoice {
    pub name: String,
    pub value: ChoiceValue,
}

impl CommandChoice {
    pub fn new(name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Numeric validation bound, passed through to the wire unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumericBound {
    Integer(i64),
    Number(f64),
}

impl From<i64> for NumericBound {
    fn from(value: i64) -> Self {
        NumericBound::Integer(value)
    }
}

impl From<i32> for NumericBound {
    fn from(value: i32) -> Self {
        NumericBound::Integer(value.into())
    }
}

impl From<f64> for NumericBound {
    fn from(value: f64) -> Self {
        NumericBound::Number(value)
    }
}

/// Case-folds chat input names and strips whitespace, then caps the length.
/// Context-menu names keep their casing and spaces.
pub fn normalize_name(kind: CommandType, raw: &str) -> String {
    let name: String = match kind {
        CommandType::ChatInput => raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect(),
        _ => raw.trim().to_string(),
    };
    name.chars().take(MAX_NAME_LENGTH).collect()
}

fn normalize_key(raw: &str) -> String {
    normalize_name(CommandType::ChatInput, raw)
}

pub struct OptionDescriptor<C> {
    pub name: String,
    pub description: Option<String>,
    pub kind: OptionKind,
    pub required: bool,
    pub choices: Vec<CommandChoice>,
    pub min_value: Option<NumericBound>,
    pub max_value: Option<NumericBound>,
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
    pub autocomplete: Option<AutocompleteFn<C>>,
}

impl<C> OptionDescriptor<C> {
    pub fn new(kind: OptionKind, name: &str) -> Self {
        Self {
            name: normalize_key(name),
            description: None,
            kind,
            required: false,
            choices: Vec::new(),
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            autocomplete: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(OptionKind::String, name)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(OptionKind::Integer, name)
    }

    pub fn number(name: &str) -> Self {
        Self::new(OptionKind::Number, name)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(OptionKind::Boolean, name)
    }

    pub fn user(name: &str) -> Self {
        Self::new(OptionKind::User, name)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        self.choices.push(CommandChoice::new(name, value));
        self
    }

    pub fn min_value(mut self, bound: impl Into<NumericBound>) -> Self {
        self.min_value = Some(bound.into());
        self
    }

    pub fn max_value(mut self, bound: impl Into<NumericBound>) -> Self {
        self.max_value = Some(bound.into());
        self
    }

    pub fn min_length(mut self, length: u16) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: u16) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn autocomplete(mut self, handler: AutocompleteFn<C>) -> Self {
        self.autocomplete = Some(handler);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Subcommand,
    SubcommandGroup,
}

/// A subcommand or subcommand group attached to a chat input command.
pub struct ModuleDescriptor<C> {
    pub kind: ModuleKind,
    pub name: String,
    pub description: Option<String>,
    /// Parent group name. Only meaningful on subcommands.
    pub group: Option<String>,
    /// Leaf options of a subcommand.
    pub options: Vec<OptionDescriptor<C>>,
    /// Subcommands declared inline on a group.
    pub subcommands: Vec<ModuleDescriptor<C>>,
    pub run: Option<CommandFn<C>>,
}

impl<C> ModuleDescriptor<C> {
    pub fn subcommand(name: &str, run: CommandFn<C>) -> Self {
        Self {
            kind: ModuleKind::Subcommand,
            name: normalize_key(name),
            description: None,
            group: None,
            options: Vec::new(),
            subcommands: Vec::new(),
            run: Some(run),
        }
    }

    pub fn group(name: &str) -> Self {
        Self {
            kind: ModuleKind::SubcommandGroup,
            name: normalize_key(name),
            description: None,
            group: None,
            options: Vec::new(),
            subcommands: Vec::new(),
            run: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Places a separately declared subcommand inside the named group.
    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(normalize_key(group));
        self
    }

    pub fn option(mut self, option: OptionDescriptor<C>) -> Self {
        self.options.push(option);
        self
    }

    pub fn subcommand_inline(mut self, subcommand: ModuleDescriptor<C>) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    pub fn run(mut self, run: CommandFn<C>) -> Self {
        self.run = Some(run);
        self
    }
}

/// Declarative definition of one top-level command.
pub struct CommandDescriptor<C> {
    pub name: String,
    pub kind: CommandType,
    pub description: Option<String>,
    pub default_member_permissions: Option<Permissions>,
    /// `None` until registration applies the "no direct messages" default.
    pub dm_permission: Option<bool>,
    pub nsfw: bool,
    pub restricted_to_guilds: Option<HashSet<GuildId>>,
    pub category: Option<String>,
    pub options: Vec<OptionDescriptor<C>>,
    pub modules: Vec<ModuleDescriptor<C>>,
    pub run: CommandFn<C>,
}

impl<C> CommandDescriptor<C> {
    pub fn new(kind: CommandType, name: &str, run: CommandFn<C>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: None,
            default_member_permissions: None,
            dm_permission: None,
            nsfw: false,
            restricted_to_guilds: None,
            category: None,
            options: Vec::new(),
            modules: Vec::new(),
            run,
        }
    }

    pub fn chat_input(name: &str, run: CommandFn<C>) -> Self {
        Self::new(CommandType::ChatInput, name, run)
    }

    pub fn user(name: &str, run: CommandFn<C>) -> Self {
        Self::new(CommandType::UserContextMenu, name, run)
    }

    pub fn message(name: &str, run: CommandFn<C>) -> Self {
        Self::new(CommandType::MessageContextMenu, name, run)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_member_permissions(mut self, permissions: Permissions) -> Self {
        self.default_member_permissions = Some(permissions);
        self
    }

    pub fn dm_permission(mut self, allowed: bool) -> Self {
        self.dm_permission = Some(allowed);
        self
    }

    pub fn nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    pub fn restrict_to(mut self, guilds: impl IntoIterator<Item = GuildId>) -> Self {
        self.restricted_to_guilds
            .get_or_insert_with(HashSet::new)
            .extend(guilds);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn option(mut self, option: OptionDescriptor<C>) -> Self {
        self.options.push(option);
        self
    }

    pub fn module(mut self, module: ModuleDescriptor<C>) -> Self {
        self.modules.push(module);
        self
    }

    /// Whether this command is submitted for `guild`.
    /// Unrestricted commands are visible everywhere.
    pub fn visible_in(&self, guild: GuildId) -> bool {
        self.restricted_to_guilds
            .as_ref()
            .map_or(true, |guilds| guilds.contains(&guild))
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted_to_guilds.is_some()
    }
}
