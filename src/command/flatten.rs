//! Flattens declared command trees into the registration schema and stages
//! the handler and autocomplete entries for every concrete path.

use std::collections::HashSet;

use serde::{Serialize, Serializer};

use super::descriptor::{
    CommandChoice, CommandDescriptor, CommandType, ModuleDescriptor, ModuleKind, NumericBound,
    OptionDescriptor, OptionKind,
};
use super::registry::command_path;
use crate::error::BuildError;
use crate::handler::{AutocompleteFn, CommandFn, HandlerChain};

pub const MAX_CHOICES: usize = 25;
pub const MAX_OPTIONS: usize = 25;
pub const MAX_DESCRIPTION_LENGTH: usize = 100;
pub const MAX_CHAT_INPUT_COMMANDS: usize = 100;

/// One command as submitted to the bulk-overwrite registration endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireCommand {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CommandType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<WireOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
    pub dm_permission: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub nsfw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireOptionKind {
    Subcommand,
    SubcommandGroup,
    Leaf(OptionKind),
}

impl WireOptionKind {
    pub fn wire_value(self) -> u8 {
        match self {
            WireOptionKind::Subcommand => 1,
            WireOptionKind::SubcommandGroup => 2,
            WireOptionKind::Leaf(kind) => kind.wire_value(),
        }
    }
}

impl Serialize for WireOptionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.wire_value())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireOption {
    #[serde(rename = "type")]
    pub kind: WireOptionKind,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<CommandChoice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<WireOption>,
    #[serde(skip_serializing_if = "is_false")]
    pub autocomplete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<NumericBound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<NumericBound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Handler and autocomplete writes collected during a build.
/// Committed to the registry only once every command flattened cleanly.
pub(crate) struct Staged<C> {
    pub handlers: Vec<(String, HandlerChain<C>)>,
    pub autocomplete: Vec<(String, AutocompleteFn<C>)>,
}

impl<C> Default for Staged<C> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            autocomplete: Vec::new(),
        }
    }
}

fn describe(description: Option<&String>, name: &str, path: &str) -> Result<String, BuildError> {
    let description = description.map_or(name, String::as_str).to_string();
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LENGTH {
        return Err(BuildError::DescriptionTooLong {
            path: path.to_string(),
            len,
        });
    }
    Ok(description)
}

fn check_level<'n>(path: &str, names: impl IntoIterator<Item = &'n str>) -> Result<(), BuildError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.to_string()) {
            return Err(BuildError::DuplicateName {
                path: path.to_string(),
                name: name.to_string(),
            });
        }
    }
    if seen.len() > MAX_OPTIONS {
        return Err(BuildError::TooManyOptions {
            path: path.to_string(),
            count: seen.len(),
        });
    }
    Ok(())
}

/// Flattens one level of leaf options, keeping declaration order.
/// Autocomplete callbacks are staged at `{path}/{option}`.
fn flatten_options<C>(
    options: &[OptionDescriptor<C>],
    path: &str,
    staged: &mut Staged<C>,
) -> Result<Vec<WireOption>, BuildError> {
    check_level(path, options.iter().map(|o| o.name.as_str()))?;

    let mut wire = Vec::with_capacity(options.len());
    for option in options {
        let has_choices = !option.choices.is_empty();
        let has_autocomplete = option.autocomplete.is_some();

        if (has_choices || has_autocomplete) && !option.kind.accepts_choices() {
            return Err(BuildError::UnsupportedChoices {
                path: path.to_string(),
                option: option.name.clone(),
                kind: option.kind,
            });
        }
        if has_choices && has_autocomplete {
            return Err(BuildError::ChoicesWithAutocomplete {
                path: path.to_string(),
                option: option.name.clone(),
            });
        }
        if option.choices.len() > MAX_CHOICES {
            return Err(BuildError::TooManyChoices {
                path: path.to_string(),
                option: option.name.clone(),
                count: option.choices.len(),
            });
        }

        let option_path = format!("{}/{}", path, option.name);
        if let Some(callback) = option.autocomplete {
            staged.autocomplete.push((option_path.clone(), callback));
        }

        wire.push(WireOption {
            kind: WireOptionKind::Leaf(option.kind),
            name: option.name.clone(),
            description: describe(option.description.as_ref(), &option.name, &option_path)?,
            required: option.required,
            choices: option.choices.clone(),
            options: Vec::new(),
            autocomplete: has_autocomplete,
            min_value: option.min_value,
            max_value: option.max_value,
            min_length: option.min_length,
            max_length: option.max_length,
        });
    }
    Ok(wire)
}

fn flatten_subcommand<C>(
    sub: &ModuleDescriptor<C>,
    path: String,
    chain: [Option<CommandFn<C>>; 3],
    staged: &mut Staged<C>,
) -> Result<WireOption, BuildError> {
    if let Some(child) = sub.subcommands.first() {
        return Err(BuildError::TooDeep {
            path: format!("{}/{}", path, child.name),
        });
    }
    let options = flatten_options(&sub.options, &path, staged)?;
    let description = describe(sub.description.as_ref(), &sub.name, &path)?;
    staged.handlers.push((path, HandlerChain::new(chain)));

    Ok(WireOption {
        kind: WireOptionKind::Subcommand,
        name: sub.name.clone(),
        description,
        required: false,
        choices: Vec::new(),
        options,
        autocomplete: false,
        min_value: None,
        max_value: None,
        min_length: None,
        max_length: None,
    })
}

/// Flattens a command into its wire object and stages its handler chains.
pub(crate) fn flatten_command<C>(
    command: &CommandDescriptor<C>,
    staged: &mut Staged<C>,
) -> Result<WireCommand, BuildError> {
    let base = command_path(command.kind, &command.name, None, None);
    staged
        .handlers
        .push((base.clone(), HandlerChain::new([Some(command.run)])));

    let default_member_permissions = command
        .default_member_permissions
        .map(|permissions| permissions.bits().to_string());
    let dm_permission = command.dm_permission.unwrap_or(false);

    if command.kind != CommandType::ChatInput {
        if !command.options.is_empty() || !command.modules.is_empty() {
            return Err(BuildError::ContextMenuOptions {
                command: command.name.clone(),
                kind: command.kind,
            });
        }
        return Ok(WireCommand {
            name: command.name.clone(),
            kind: command.kind,
            description: None,
            options: Vec::new(),
            default_member_permissions,
            dm_permission,
            nsfw: command.nsfw,
        });
    }

    if !command.options.is_empty() && !command.modules.is_empty() {
        return Err(BuildError::MixedOptions { path: base });
    }

    let description = describe(command.description.as_ref(), &command.name, &base)?;
    let mut options = flatten_options(&command.options, &base, staged)?;

    let group_names: HashSet<&str> = command
        .modules
        .iter()
        .filter(|m| m.kind == ModuleKind::SubcommandGroup)
        .map(|m| m.name.as_str())
        .collect();

    for module in &command.modules {
        match (module.kind, module.group.as_deref()) {
            (ModuleKind::SubcommandGroup, Some(_)) => {
                return Err(BuildError::NestedGroup {
                    command: command.name.clone(),
                    group: module.name.clone(),
                });
            }
            (ModuleKind::Subcommand, Some(group)) if !group_names.contains(group) => {
                return Err(BuildError::UnknownGroup {
                    command: command.name.clone(),
                    group: group.to_string(),
                    subcommand: module.name.clone(),
                });
            }
            _ => {}
        }
    }

    let top_level = command
        .modules
        .iter()
        .filter(|m| m.kind == ModuleKind::SubcommandGroup || m.group.is_none())
        .map(|m| m.name.as_str());
    check_level(&base, top_level)?;

    for module in &command.modules {
        match module.kind {
            ModuleKind::SubcommandGroup => {
                let group_path = format!("{}/{}", base, module.name);
                if !module.options.is_empty() {
                    return Err(BuildError::MixedOptions { path: group_path });
                }
                let stray = module.subcommands.iter().find_map(|m| {
                    m.group
                        .as_deref()
                        .filter(|group| *group != module.name)
                        .map(|group| (group, m))
                });
                if let Some((group, sub)) = stray {
                    return Err(BuildError::UnknownGroup {
                        command: command.name.clone(),
                        group: group.to_string(),
                        subcommand: sub.name.clone(),
                    });
                }

                let members: Vec<&ModuleDescriptor<C>> = module
                    .subcommands
                    .iter()
                    .chain(command.modules.iter().filter(|m| {
                        m.kind == ModuleKind::Subcommand
                            && m.group.as_deref() == Some(module.name.as_str())
                    }))
                    .collect();

                if let Some(nested) = members.iter().find(|m| m.kind != ModuleKind::Subcommand) {
                    return Err(BuildError::NestedGroup {
                        command: command.name.clone(),
                        group: nested.name.clone(),
                    });
                }
                if members.is_empty() {
                    return Err(BuildError::EmptyGroup { path: group_path });
                }
                check_level(&group_path, members.iter().map(|m| m.name.as_str()))?;

                let mut subcommands = Vec::with_capacity(members.len());
                for sub in members {
                    let path = command_path(
                        command.kind,
                        &command.name,
                        Some(&module.name),
                        Some(&sub.name),
                    );
                    let chain = [Some(command.run), module.run, sub.run];
                    subcommands.push(flatten_subcommand(sub, path, chain, staged)?);
                }

                options.push(WireOption {
                    kind: WireOptionKind::SubcommandGroup,
                    name: module.name.clone(),
                    description: describe(module.description.as_ref(), &module.name, &group_path)?,
                    required: false,
                    choices: Vec::new(),
                    options: subcommands,
                    autocomplete: false,
                    min_value: None,
                    max_value: None,
                    min_length: None,
                    max_length: None,
                });
            }
            ModuleKind::Subcommand if module.group.is_none() => {
                let path = command_path(command.kind, &command.name, None, Some(&module.name));
                let chain = [Some(command.run), module.run, None];
                options.push(flatten_subcommand(module, path, chain, staged)?);
            }
            // Grouped subcommands were emitted inside their group.
            ModuleKind::Subcommand => {}
        }
    }

    Ok(WireCommand {
        name: command.name.clone(),
        kind: command.kind,
        description: Some(description),
        options,
        default_member_permissions,
        dm_permission,
        nsfw: command.nsfw,
    })
}
