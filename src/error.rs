//! Error types for registration, schema building and handler execution.

use thiserror::Error;

use crate::command::{CommandType, OptionKind};

/// Structural violations detected while flattening the command tree.
///
/// These are raised by `build()` instead of silently truncating, since a
/// truncated schema would no longer match what the commands declare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("command `{command}`: subcommand `{subcommand}` references unknown group `{group}`")]
    UnknownGroup {
        command: String,
        group: String,
        subcommand: String,
    },

    #[error("command `{command}`: group `{group}` cannot belong to another group")]
    NestedGroup { command: String, group: String },

    #[error("command `{command}`: {kind} commands cannot carry options or subcommands")]
    ContextMenuOptions { command: String, kind: CommandType },

    #[error("`{path}`: option `{option}` declares {count} choices (max 25)")]
    TooManyChoices {
        path: String,
        option: String,
        count: usize,
    },

    #[error("`{path}`: {count} options at one level (max 25)")]
    TooManyOptions { path: String, count: usize },

    #[error("`{path}`: duplicate name `{name}`")]
    DuplicateName { path: String, name: String },

    #[error("`{path}`: subcommands cannot contain subcommands")]
    TooDeep { path: String },

    #[error("`{path}`: group declares no subcommands")]
    EmptyGroup { path: String },

    #[error("`{path}`: leaf options cannot be mixed with subcommands")]
    MixedOptions { path: String },

    #[error("`{path}`: option `{option}` of kind {kind:?} cannot declare choices or autocomplete")]
    UnsupportedChoices {
        path: String,
        option: String,
        kind: OptionKind,
    },

    #[error("`{path}`: option `{option}` declares both choices and autocomplete")]
    ChoicesWithAutocomplete { path: String, option: String },

    #[error("`{path}`: description is {len} characters (max 100)")]
    DescriptionTooLong { path: String, len: usize },

    #[error("{count} chat input commands in one scope (max 100)")]
    TooManyCommands { count: usize },
}

/// Errors raised while populating the registries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no chat input command named `{0}` is registered")]
    UnknownCommand(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown responder type `{0}`")]
pub struct UnknownResponderType(pub String);

/// Errors flowing out of a handler chain.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Raised through `block()`. Stops the chain without signaling a failure.
    #[error("handler chain blocked")]
    Blocked,

    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, HandlerError::Blocked)
    }
}
