use std::collections::{BTreeMap, BTreeSet, HashMap};

use serenity::model::id::GuildId;
use tracing::{debug, info};

use super::descriptor::{normalize_name, CommandDescriptor, CommandType, ModuleDescriptor};
use super::flatten::{flatten_command, Staged, WireCommand, MAX_CHAT_INPUT_COMMANDS};
use crate::error::{BuildError, RegistryError};
use crate::handler::{AutocompleteFn, HandlerChain};

/// Category assigned when neither the descriptor nor its module names one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Builds the lookup key `/{type}/{name}[/{group}][/{subcommand}]`.
pub fn command_path(
    kind: CommandType,
    name: &str,
    group: Option<&str>,
    subcommand: Option<&str>,
) -> String {
    let mut path = format!("/{}/{}", kind.label(), name);
    for segment in [group, subcommand].into_iter().flatten() {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// Group, subcommand and option names fold the way chat input names do.
fn normalize_segment(raw: &str) -> String {
    normalize_name(CommandType::ChatInput, raw)
}

/// Which commands a build emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildScope {
    /// Every registered command.
    All,
    /// Commands without a guild restriction.
    Global,
    /// Unrestricted commands plus those restricted to this guild.
    Guild(GuildId),
    /// Only the commands restricted to this guild.
    GuildOnly(GuildId),
}

impl BuildScope {
    fn includes<C>(self, command: &CommandDescriptor<C>) -> bool {
        match self {
            BuildScope::All => true,
            BuildScope::Global => !command.is_restricted(),
            BuildScope::Guild(guild) => command.visible_in(guild),
            BuildScope::GuildOnly(guild) => command.is_restricted() && command.visible_in(guild),
        }
    }
}

/// Keyed store of top-level commands plus the handler and autocomplete
/// tables derived from them.
pub struct CommandRegistry<C> {
    commands: Vec<CommandDescriptor<C>>,
    index: HashMap<(CommandType, String), usize>,
    handlers: HashMap<String, HandlerChain<C>>,
    autocomplete: HashMap<String, AutocompleteFn<C>>,
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CommandRegistry<C> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            index: HashMap::new(),
            handlers: HashMap::new(),
            autocomplete: HashMap::new(),
        }
    }

    /// Stores a command, replacing any earlier one with the same type and name.
    pub fn register(&mut self, mut descriptor: CommandDescriptor<C>) -> &CommandDescriptor<C> {
        descriptor.name = normalize_name(descriptor.kind, &descriptor.name);
        descriptor.dm_permission.get_or_insert(false);

        let base = command_path(descriptor.kind, &descriptor.name, None, None);
        let key = (descriptor.kind, descriptor.name.clone());
        let existing = self.index.get(&key).copied();
        if existing.is_some() {
            debug!("Overwriting previous registration of '{}'", base);
            self.purge_below(&base);
        }

        self.handlers
            .insert(base.clone(), HandlerChain::new([Some(descriptor.run)]));
        for option in &descriptor.options {
            if let Some(callback) = option.autocomplete {
                self.autocomplete
                    .insert(format!("{}/{}", base, option.name), callback);
            }
        }

        info!(
            "Registered {} command '{}' ({} options, {} modules)",
            descriptor.kind,
            descriptor.name,
            descriptor.options.len(),
            descriptor.modules.len()
        );

        let slot = match existing {
            Some(slot) => {
                self.commands[slot] = descriptor;
                slot
            }
            None => {
                self.commands.push(descriptor);
                self.index.insert(key, self.commands.len() - 1);
                self.commands.len() - 1
            }
        };
        &self.commands[slot]
    }

    /// Registration handle that fills in a missing category from `module_path`.
    pub fn scope<'r>(&'r mut self, module_path: &str) -> RegistrationScope<'r, C> {
        let category = module_path
            .rsplit("::")
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();
        RegistrationScope {
            registry: self,
            category,
        }
    }

    /// Appends a subcommand or group to a registered chat input command.
    /// Nothing is flattened until `build`.
    pub fn attach_module(
        &mut self,
        command_name: &str,
        module: ModuleDescriptor<C>,
    ) -> Result<(), RegistryError> {
        let name = normalize_name(CommandType::ChatInput, command_name);
        let slot = self
            .index
            .get(&(CommandType::ChatInput, name.clone()))
            .copied()
            .ok_or(RegistryError::UnknownCommand(name))?;
        self.commands[slot].modules.push(module);
        Ok(())
    }

    /// Flattens every registered command into the registration schema.
    pub fn build(&mut self) -> Result<Vec<WireCommand>, BuildError> {
        self.build_scope(BuildScope::All)
    }

    /// Flattens the commands selected by `scope`.
    ///
    /// Handler chains and autocomplete callbacks are written for every
    /// command regardless of scope, and only when the whole build succeeds.
    /// Writes are keyed by path, so repeated builds leave the tables unchanged.
    pub fn build_scope(&mut self, scope: BuildScope) -> Result<Vec<WireCommand>, BuildError> {
        let mut staged = Staged::default();
        let mut wire = Vec::new();
        for command in &self.commands {
            let flattened = flatten_command(command, &mut staged)?;
            if scope.includes(command) {
                wire.push(flattened);
            }
        }

        let chat_inputs = wire
            .iter()
            .filter(|command| command.kind == CommandType::ChatInput)
            .count();
        if chat_inputs > MAX_CHAT_INPUT_COMMANDS {
            return Err(BuildError::TooManyCommands { count: chat_inputs });
        }

        self.handlers.extend(staged.handlers);
        self.autocomplete.extend(staged.autocomplete);
        debug!("Built {} commands for {:?}", wire.len(), scope);
        Ok(wire)
    }

    /// Resolves the chain for a path, falling back to the bare command chain.
    pub fn get_handler(
        &self,
        kind: CommandType,
        command_name: &str,
        group: Option<&str>,
        subcommand: Option<&str>,
    ) -> Option<&HandlerChain<C>> {
        let name = normalize_name(kind, command_name);
        let group = group.map(normalize_segment);
        let subcommand = subcommand.map(normalize_segment);
        let full = command_path(kind, &name, group.as_deref(), subcommand.as_deref());
        self.handlers.get(&full).or_else(|| {
            let base = command_path(kind, &name, None, None);
            self.handlers.get(&base)
        })
    }

    /// Resolves the autocomplete callback for the focused option, trying the
    /// full path first and then the option on the bare command.
    pub fn get_autocomplete_handler(
        &self,
        command_name: &str,
        group: Option<&str>,
        subcommand: Option<&str>,
        focused_option: &str,
    ) -> Option<AutocompleteFn<C>> {
        let kind = CommandType::ChatInput;
        let name = normalize_name(kind, command_name);
        let group = group.map(normalize_segment);
        let subcommand = subcommand.map(normalize_segment);
        let focused_option = normalize_segment(focused_option);
        let full = format!(
            "{}/{}",
            command_path(kind, &name, group.as_deref(), subcommand.as_deref()),
            focused_option
        );
        self.autocomplete.get(&full).copied().or_else(|| {
            let bare = format!("{}/{}", command_path(kind, &name, None, None), focused_option);
            self.autocomplete.get(&bare).copied()
        })
    }

    pub fn get(&self, kind: CommandType, name: &str) -> Option<&CommandDescriptor<C>> {
        let name = normalize_name(kind, name);
        self.index
            .get(&(kind, name))
            .map(|&slot| &self.commands[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor<C>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Guilds named by any command restriction.
    pub fn restricted_guilds(&self) -> BTreeSet<GuildId> {
        self.commands
            .iter()
            .filter_map(|command| command.restricted_to_guilds.as_ref())
            .flatten()
            .copied()
            .collect()
    }

    /// Command names grouped by category, for help listings.
    pub fn categories(&self) -> BTreeMap<String, Vec<String>> {
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for command in &self.commands {
            let category = command
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            categories
                .entry(category)
                .or_default()
                .push(command.name.clone());
        }
        categories
    }

    /// Drops every command and both lookup tables.
    pub fn reset(&mut self) {
        info!("Resetting command registry ({} commands)", self.commands.len());
        self.commands.clear();
        self.index.clear();
        self.handlers.clear();
        self.autocomplete.clear();
    }

    /// Removes table entries left over from an overwritten command.
    fn purge_below(&mut self, base: &str) {
        let prefix = format!("{}/", base);
        self.handlers
            .retain(|path, _| path != base && !path.starts_with(&prefix));
        self.autocomplete.retain(|path, _| !path.starts_with(&prefix));
    }
}

/// Registers commands on behalf of one source module.
pub struct RegistrationScope<'r, C> {
    registry: &'r mut CommandRegistry<C>,
    category: String,
}

impl<'r, C> RegistrationScope<'r, C> {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn register(&mut self, mut descriptor: CommandDescriptor<C>) -> &CommandDescriptor<C> {
        if descriptor.category.is_none() {
            descriptor.category = Some(self.category.clone());
        }
        self.registry.register(descriptor)
    }

    pub fn attach_module(
        &mut self,
        command_name: &str,
        module: ModuleDescriptor<C>,
    ) -> Result<(), RegistryError> {
        self.registry.attach_module(command_name, module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::descriptor::{CommandChoice, OptionDescriptor};
    use crate::command::flatten::WireOption;
    use crate::handler::{BoxFuture, HandlerResult};
    use crate::testing::{tag_a, tag_b, tag_c, tags};
    use serde_json::{json, Value};

    fn suggest(_ctx: &()) -> BoxFuture<'_, HandlerResult<Vec<CommandChoice>>> {
        Box::pin(async move { Ok(vec![CommandChoice::new("top", "top")]) })
    }

    fn suggest_nested(_ctx: &()) -> BoxFuture<'_, HandlerResult<Vec<CommandChoice>>> {
        Box::pin(async move { Ok(vec![CommandChoice::new("nested", "nested")]) })
    }

    async fn run_chain(chain: &HandlerChain<()>) -> Vec<String> {
        let result = chain.run(&(), Value::Null).await.unwrap();
        tags(&result).into_iter().map(String::from).collect()
    }

    fn shop_registry() -> CommandRegistry<()> {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        registry.register(CommandDescriptor::chat_input("shop", tag_a));
        registry
            .attach_module(
                "shop",
                ModuleDescriptor::group("admin")
                    .run(tag_b)
                    .subcommand_inline(ModuleDescriptor::subcommand("additem", tag_c)),
            )
            .unwrap();
        registry
            .attach_module("shop", ModuleDescriptor::subcommand("list", tag_c))
            .unwrap();
        registry
    }

    /// Every subcommand path reachable in the wire output.
    fn emitted_paths(command: &WireCommand) -> Vec<(Option<String>, Option<String>)> {
        fn walk(
            options: &[WireOption],
            group: Option<&str>,
            out: &mut Vec<(Option<String>, Option<String>)>,
        ) {
            for option in options {
                match option.kind.wire_value() {
                    1 => out.push((group.map(String::from), Some(option.name.clone()))),
                    2 => walk(&option.options, Some(&option.name), out),
                    _ => {}
                }
            }
        }
        let mut out = vec![(None, None)];
        walk(&command.options, None, &mut out);
        out
    }

    #[tokio::test]
    async fn test_daily_scenario() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        registry.register(CommandDescriptor::chat_input("daily", tag_a));
        let wire = registry.build().unwrap();

        assert_eq!(wire.len(), 1);
        assert_eq!(
            serde_json::to_value(&wire[0]).unwrap(),
            json!({"name": "daily", "type": 1, "description": "daily", "dm_permission": false})
        );

        let chain = registry
            .get_handler(CommandType::ChatInput, "daily", None, None)
            .unwrap();
        assert_eq!(run_chain(chain).await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_shop_scenario() {
        let mut registry = shop_registry();
        let wire = registry.build().unwrap();
        let json = serde_json::to_value(&wire[0]).unwrap();

        let options = json["options"].as_array().unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0]["type"], 2);
        assert_eq!(options[0]["name"], "admin");
        assert_eq!(options[0]["options"].as_array().unwrap().len(), 1);
        assert_eq!(options[0]["options"][0]["type"], 1);
        assert_eq!(options[0]["options"][0]["name"], "additem");
        assert_eq!(options[1]["type"], 1);
        assert_eq!(options[1]["name"], "list");

        let grouped = registry
            .get_handler(CommandType::ChatInput, "shop", Some("admin"), Some("additem"))
            .unwrap();
        assert_eq!(grouped.len(), 3);
        assert_eq!(run_chain(grouped).await, vec!["a", "b", "c"]);

        let ungrouped = registry
            .get_handler(CommandType::ChatInput, "shop", None, Some("list"))
            .unwrap();
        assert_eq!(ungrouped.len(), 2);
        assert_eq!(run_chain(ungrouped).await, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_lookup_segments_are_normalized() {
        let mut registry = shop_registry();
        registry.register(CommandDescriptor::chat_input("item", tag_a).module(
            ModuleDescriptor::subcommand("buy", tag_b)
                .option(OptionDescriptor::string("name").autocomplete(suggest_nested)),
        ));
        registry.build().unwrap();

        let grouped = registry
            .get_handler(CommandType::ChatInput, "Shop", Some("Admin"), Some("Add Item"))
            .unwrap();
        assert_eq!(run_chain(grouped).await, vec!["a", "b", "c"]);

        let nested = registry
            .get_autocomplete_handler("ITEM", None, Some("Buy"), "Name")
            .unwrap();
        assert_eq!(nested(&()).await.unwrap()[0].name, "nested");
    }

    #[test]
    fn test_every_emitted_path_has_a_chain() {
        let mut registry = shop_registry();
        registry.register(CommandDescriptor::chat_input("daily", tag_a));
        registry.register(CommandDescriptor::user("Profile", tag_b));
        let wire = registry.build().unwrap();

        for command in &wire {
            for (group, sub) in emitted_paths(command) {
                let chain = registry
                    .get_handler(command.kind, &command.name, group.as_deref(), sub.as_deref())
                    .unwrap();
                assert!(!chain.is_empty(), "{} {:?} {:?}", command.name, group, sub);
            }
        }
    }

    #[tokio::test]
    async fn test_bare_command_fallback() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        registry.register(CommandDescriptor::chat_input("daily", tag_a));
        registry.build().unwrap();

        let bare = registry
            .get_handler(CommandType::ChatInput, "daily", None, None)
            .unwrap();
        let fallback = registry
            .get_handler(CommandType::ChatInput, "daily", Some("any"), Some("thing"))
            .unwrap();
        assert_eq!(fallback.len(), bare.len());
        assert_eq!(run_chain(fallback).await, run_chain(bare).await);
        assert!(registry
            .get_handler(CommandType::ChatInput, "missing", None, None)
            .is_none());
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut registry = shop_registry();
        let first = serde_json::to_string(&registry.build().unwrap()).unwrap();
        let handlers_after_first = registry.handlers.len();
        let second = serde_json::to_string(&registry.build().unwrap()).unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.handlers.len(), handlers_after_first);
        assert_eq!(
            registry
                .get_handler(CommandType::ChatInput, "shop", Some("admin"), Some("additem"))
                .map(HandlerChain::len),
            Some(3)
        );
    }

    #[test]
    fn test_inline_and_tagged_subcommands_merge() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        registry.register(
            CommandDescriptor::chat_input("shop", tag_a)
                .module(
                    ModuleDescriptor::group("admin")
                        .subcommand_inline(ModuleDescriptor::subcommand("additem", tag_b))
                        .subcommand_inline(ModuleDescriptor::subcommand("removeitem", tag_b)),
                )
                .module(ModuleDescriptor::subcommand("restock", tag_c).in_group("admin")),
        );
        registry
            .attach_module(
                "shop",
                ModuleDescriptor::subcommand("prices", tag_c).in_group("admin"),
            )
            .unwrap();

        let wire = registry.build().unwrap();
        let admin = &wire[0].options[0];
        let names: Vec<&str> = admin.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["additem", "removeitem", "restock", "prices"]);
        assert_eq!(wire[0].options.len(), 1);

        for name in names {
            assert_eq!(
                registry
                    .get_handler(CommandType::ChatInput, "shop", Some("admin"), Some(name))
                    .map(HandlerChain::len),
                Some(2)
            );
        }
    }

    #[test]
    fn test_failed_build_commits_nothing() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        registry.register(CommandDescriptor::chat_input("good", tag_a));
        registry.register(
            CommandDescriptor::chat_input("bad", tag_a)
                .module(ModuleDescriptor::subcommand("orphan", tag_b).in_group("nowhere")),
        );
        assert!(registry.build().is_err());
        assert!(registry
            .get_handler(CommandType::ChatInput, "bad", Some("nowhere"), Some("orphan"))
            .map_or(true, |chain| chain.len() == 1));
        assert_eq!(registry.handlers.len(), 2);
    }

    #[tokio::test]
    async fn test_autocomplete_resolution() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        registry.register(
            CommandDescriptor::chat_input("item", tag_a)
                .option(OptionDescriptor::string("name").autocomplete(suggest)),
        );
        registry.register(CommandDescriptor::chat_input("shop", tag_a).module(
            ModuleDescriptor::subcommand("buy", tag_b)
                .option(OptionDescriptor::string("item").autocomplete(suggest_nested)),
        ));

        // Top-level options are available right after registration.
        let top = registry
            .get_autocomplete_handler("item", None, None, "name")
            .unwrap();
        assert_eq!(top(&()).await.unwrap()[0].name, "top");

        assert!(registry
            .get_autocomplete_handler("shop", None, Some("buy"), "item")
            .is_none());
        registry.build().unwrap();
        let nested = registry
            .get_autocomplete_handler("shop", None, Some("buy"), "item")
            .unwrap();
        assert_eq!(nested(&()).await.unwrap()[0].name, "nested");

        // Unknown subcommand falls back to the bare command's option.
        let fallback = registry
            .get_autocomplete_handler("item", None, Some("ghost"), "name")
            .unwrap();
        assert_eq!(fallback(&()).await.unwrap()[0].name, "top");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_previous_registration() {
        let mut registry = shop_registry();
        registry.build().unwrap();
        registry.register(CommandDescriptor::chat_input("shop", tag_b));
        assert_eq!(registry.len(), 1);

        // The old subcommand paths no longer resolve to their own chains.
        let chain = registry
            .get_handler(CommandType::ChatInput, "shop", Some("admin"), Some("additem"))
            .unwrap();
        assert_eq!(run_chain(chain).await, vec!["b"]);
    }

    #[test]
    fn test_register_normalizes_and_defaults() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        let stored = registry.register(CommandDescriptor::chat_input("Daily Bonus", tag_a));
        assert_eq!(stored.name, "dailybonus");
        assert_eq!(stored.dm_permission, Some(false));

        let stored =
            registry.register(CommandDescriptor::chat_input("dm", tag_a).dm_permission(true));
        assert_eq!(stored.dm_permission, Some(true));
        assert!(registry.get(CommandType::ChatInput, "DAILY BONUS").is_some());
    }

    #[test]
    fn test_same_name_different_types_coexist() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        registry.register(CommandDescriptor::chat_input("profile", tag_a));
        registry.register(CommandDescriptor::user("profile", tag_b));
        assert_eq!(registry.len(), 2);
        assert!(registry
            .get_handler(CommandType::UserContextMenu, "profile", None, None)
            .is_some());
    }

    #[test]
    fn test_attach_to_unknown_command_fails() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        let err = registry
            .attach_module("ghost", ModuleDescriptor::subcommand("x", tag_a))
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownCommand("ghost".to_string()));
    }

    #[test]
    fn test_scope_infers_category() {
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        {
            let mut scope = registry.scope("switchboard::commands::economy");
            assert_eq!(scope.category(), "economy");
            scope.register(CommandDescriptor::chat_input("daily", tag_a));
            scope.register(CommandDescriptor::chat_input("shop", tag_a).category("store"));
        }
        let categories = registry.categories();
        assert_eq!(categories["economy"], vec!["daily"]);
        assert_eq!(categories["store"], vec!["shop"]);
    }

    #[test]
    fn test_build_scopes() {
        let dev = GuildId::new(1);
        let other = GuildId::new(2);
        let mut registry: CommandRegistry<()> = CommandRegistry::new();
        registry.register(CommandDescriptor::chat_input("daily", tag_a));
        registry.register(CommandDescriptor::chat_input("debug", tag_a).restrict_to([dev]));

        let names = |wire: Vec<WireCommand>| -> Vec<String> {
            wire.into_iter().map(|command| command.name).collect()
        };
        assert_eq!(names(registry.build().unwrap()), vec!["daily", "debug"]);
        assert_eq!(names(registry.build_scope(BuildScope::Global).unwrap()), vec!["daily"]);
        assert_eq!(
            names(registry.build_scope(BuildScope::Guild(dev)).unwrap()),
            vec!["daily", "debug"]
        );
        assert_eq!(names(registry.build_scope(BuildScope::Guild(other)).unwrap()), vec!["daily"]);
        assert_eq!(
            names(registry.build_scope(BuildScope::GuildOnly(dev)).unwrap()),
            vec!["debug"]
        );
        assert_eq!(registry.restricted_guilds().into_iter().collect::<Vec<_>>(), vec![dev]);

        // Restricted commands still dispatch even when built for another scope.
        assert!(registry
            .get_handler(CommandType::ChatInput, "debug", None, None)
            .is_some());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut registry = shop_registry();
        registry.build().unwrap();
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry
            .get_handler(CommandType::ChatInput, "shop", None, None)
            .is_none());
    }
}
