//! Dispatch façade: turns an inbound interaction into a handler invocation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::command::{CommandChoice, CommandType};
use crate::engine::RoutingEngine;
use crate::error::HandlerError;
use crate::handler::{BoxFuture, CommandFn, HandlerResult};
use crate::responder::ResponderType;

/// Most suggestions the platform accepts in one autocomplete response.
pub const MAX_SUGGESTIONS: usize = 25;

/// What an interaction asks the router for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    Command {
        kind: CommandType,
        name: String,
        group: Option<String>,
        subcommand: Option<String>,
    },
    Autocomplete {
        name: String,
        group: Option<String>,
        subcommand: Option<String>,
        focused: String,
    },
    Component {
        kind: ResponderType,
        identifier: String,
    },
    Unsupported,
}

/// The connection-side view of one interaction.
#[async_trait]
pub trait InteractionContext: Send + Sync {
    fn target(&self) -> RouteTarget;

    /// Relays autocomplete suggestions. Called at most once per interaction.
    async fn suggest(&self, choices: Vec<CommandChoice>) -> HandlerResult<()>;
}

pub type NotFoundFn<C> = for<'a> fn(&'a C) -> BoxFuture<'a, HandlerResult<()>>;
pub type ErrorFn<C> = for<'a> fn(&'a C, HandlerError) -> BoxFuture<'a, HandlerResult<()>>;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The chain ran to completion with this final result.
    Completed(Value),
    /// Middleware or a chain link called `block()`.
    Blocked,
    /// No chain for the command; `on_not_found` ran if set.
    NotFound,
    /// This many suggestions were relayed.
    Suggested(usize),
    /// A component responder ran.
    Responded,
    /// Nothing matched an autocomplete or component interaction.
    Dropped,
    /// A handler failed and `on_error` took the error.
    Recovered,
}

pub struct Dispatcher<C> {
    engine: Arc<RoutingEngine<C>>,
    middleware: Option<CommandFn<C>>,
    on_not_found: Option<NotFoundFn<C>>,
    on_error: Option<ErrorFn<C>>,
}

impl<C: InteractionContext> Dispatcher<C> {
    pub fn new(engine: Arc<RoutingEngine<C>>) -> Self {
        Self {
            engine,
            middleware: None,
            on_not_found: None,
            on_error: None,
        }
    }

    /// Runs before every command chain; its result seeds the first link.
    pub fn middleware(mut self, middleware: CommandFn<C>) -> Self {
        self.middleware = Some(middleware);
        self
    }

    pub fn on_not_found(mut self, hook: NotFoundFn<C>) -> Self {
        self.on_not_found = Some(hook);
        self
    }

    pub fn on_error(mut self, hook: ErrorFn<C>) -> Self {
        self.on_error = Some(hook);
        self
    }

    pub fn engine(&self) -> &Arc<RoutingEngine<C>> {
        &self.engine
    }

    /// Routes one interaction.
    ///
    /// Handler failures are returned only when no `on_error` hook is set.
    pub async fn dispatch(&self, ctx: &C) -> HandlerResult<DispatchOutcome> {
        match ctx.target() {
            RouteTarget::Command {
                kind,
                name,
                group,
                subcommand,
            } => {
                self.dispatch_command(ctx, kind, &name, group.as_deref(), subcommand.as_deref())
                    .await
            }
            RouteTarget::Autocomplete {
                name,
                group,
                subcommand,
                focused,
            } => {
                self.dispatch_autocomplete(
                    ctx,
                    &name,
                    group.as_deref(),
                    subcommand.as_deref(),
                    &focused,
                )
                .await
            }
            RouteTarget::Component { kind, identifier } => {
                self.dispatch_component(ctx, kind, &identifier).await
            }
            RouteTarget::Unsupported => Ok(DispatchOutcome::Dropped),
        }
    }

    async fn dispatch_command(
        &self,
        ctx: &C,
        kind: CommandType,
        name: &str,
        group: Option<&str>,
        subcommand: Option<&str>,
    ) -> HandlerResult<DispatchOutcome> {
        let Some(chain) = self
            .engine
            .commands()
            .get_handler(kind, name, group, subcommand)
        else {
            debug!("No handler for {} command '{}'", kind, name);
            if let Some(hook) = self.on_not_found {
                if let Err(e) = hook(ctx).await {
                    return self.settle(ctx, e).await;
                }
            }
            return Ok(DispatchOutcome::NotFound);
        };

        let mut result = Value::Null;
        if let Some(middleware) = self.middleware {
            result = match middleware(ctx, result).await {
                Ok(value) => value,
                Err(e) => return self.settle(ctx, e).await,
            };
        }

        match chain.run(ctx, result).await {
            Ok(value) => Ok(DispatchOutcome::Completed(value)),
            Err(e) => self.settle(ctx, e).await,
        }
    }

    async fn dispatch_autocomplete(
        &self,
        ctx: &C,
        name: &str,
        group: Option<&str>,
        subcommand: Option<&str>,
        focused: &str,
    ) -> HandlerResult<DispatchOutcome> {
        let Some(callback) = self
            .engine
            .commands()
            .get_autocomplete_handler(name, group, subcommand, focused)
        else {
            debug!("No autocomplete for '{}' option '{}'", name, focused);
            return Ok(DispatchOutcome::Dropped);
        };

        let mut choices = match callback(ctx).await {
            Ok(choices) => choices,
            Err(e) => return self.settle(ctx, e).await,
        };
        choices.truncate(MAX_SUGGESTIONS);
        let count = choices.len();
        match ctx.suggest(choices).await {
            Ok(()) => Ok(DispatchOutcome::Suggested(count)),
            Err(e) => self.settle(ctx, e).await,
        }
    }

    async fn dispatch_component(
        &self,
        ctx: &C,
        kind: ResponderType,
        identifier: &str,
    ) -> HandlerResult<DispatchOutcome> {
        let Some(resolved) = self.engine.responders().resolve(kind, identifier) else {
            debug!("Dropping stale {} interaction '{}'", kind, identifier);
            return Ok(DispatchOutcome::Dropped);
        };

        match (resolved.descriptor.handler)(ctx, resolved.route).await {
            Ok(()) => Ok(DispatchOutcome::Responded),
            Err(e) => self.settle(ctx, e).await,
        }
    }

    /// Swallows blocks, hands failures to `on_error`, or returns them.
    async fn settle(&self, ctx: &C, error: HandlerError) -> HandlerResult<DispatchOutcome> {
        if error.is_blocked() {
            return Ok(DispatchOutcome::Blocked);
        }
        match self.on_error {
            Some(hook) => {
                hook(ctx, error).await?;
                Ok(DispatchOutcome::Recovered)
            }
            None => {
                warn!("Unhandled interaction error: {}", error);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandDescriptor, ModuleDescriptor, OptionDescriptor};
    use crate::handler::block;
    use crate::responder::{ResponderDescriptor, RouteMatch};
    use crate::testing::{tag_a, tag_b, tag_c, tags};
    use serde_json::json;
    use std::sync::Mutex;

    struct MockContext {
        target: RouteTarget,
        events: Mutex<Vec<String>>,
        suggested: Mutex<Option<Vec<CommandChoice>>>,
    }

    impl MockContext {
        fn new(target: RouteTarget) -> Self {
            Self {
                target,
                events: Mutex::new(Vec::new()),
                suggested: Mutex::new(None),
            }
        }

        fn command(name: &str, group: Option<&str>, subcommand: Option<&str>) -> Self {
            Self::new(RouteTarget::Command {
                kind: CommandType::ChatInput,
                name: name.to_string(),
                group: group.map(String::from),
                subcommand: subcommand.map(String::from),
            })
        }

        fn component(kind: ResponderType, identifier: &str) -> Self {
            Self::new(RouteTarget::Component {
                kind,
                identifier: identifier.to_string(),
            })
        }

        fn record(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InteractionContext for MockContext {
        fn target(&self) -> RouteTarget {
            self.target.clone()
        }

        async fn suggest(&self, choices: Vec<CommandChoice>) -> HandlerResult<()> {
            *self.suggested.lock().unwrap() = Some(choices);
            Ok(())
        }
    }

    fn deny(ctx: &MockContext, _prev: Value) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            ctx.record("denied");
            block()
        })
    }

    fn guard(ctx: &MockContext, _prev: Value) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            ctx.record("guard");
            Ok(json!(["guard"]))
        })
    }

    fn fail(_ctx: &MockContext, _prev: Value) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move { Err(anyhow::anyhow!("inventory unavailable").into()) })
    }

    fn report(ctx: &MockContext, error: HandlerError) -> BoxFuture<'_, HandlerResult<()>> {
        Box::pin(async move {
            ctx.record(format!("error: {}", error));
            Ok(())
        })
    }

    fn not_found(ctx: &MockContext) -> BoxFuture<'_, HandlerResult<()>> {
        Box::pin(async move {
            ctx.record("not found");
            Ok(())
        })
    }

    fn many_items(_ctx: &MockContext) -> BoxFuture<'_, HandlerResult<Vec<CommandChoice>>> {
        Box::pin(async move {
            Ok((0..40)
                .map(|i| CommandChoice::new(format!("item {}", i), i))
                .collect())
        })
    }

    fn buy(ctx: &MockContext, route: RouteMatch) -> BoxFuture<'_, HandlerResult<()>> {
        Box::pin(async move {
            ctx.record(format!("buy {}", route.rest().unwrap_or("-")));
            Ok(())
        })
    }

    fn shop_engine() -> Arc<RoutingEngine<MockContext>> {
        let mut engine: RoutingEngine<MockContext> = RoutingEngine::new();
        let commands = engine.commands_mut();
        commands.register(CommandDescriptor::<MockContext>::chat_input("shop", tag_a));
        commands
            .attach_module(
                "shop",
                ModuleDescriptor::<MockContext>::group("admin")
                    .run(tag_b)
                    .subcommand_inline(ModuleDescriptor::<MockContext>::subcommand(
                        "additem", tag_c,
                    )),
            )
            .unwrap();
        commands
            .attach_module("shop", ModuleDescriptor::subcommand("refund", fail))
            .unwrap();
        commands
            .attach_module("shop", ModuleDescriptor::subcommand("vault", deny))
            .unwrap();
        commands.register(
            CommandDescriptor::<MockContext>::chat_input("item", tag_a)
                .option(OptionDescriptor::string("name").autocomplete(many_items)),
        );
        engine.build().unwrap();
        engine
            .responders_mut()
            .register(ResponderDescriptor::button("/shop/buy", buy));
        Arc::new(engine)
    }

    #[tokio::test]
    async fn test_chain_threads_result() {
        let dispatcher = Dispatcher::new(shop_engine());
        let ctx = MockContext::command("shop", Some("admin"), Some("additem"));

        let outcome = dispatcher.dispatch(&ctx).await.unwrap();
        let DispatchOutcome::Completed(result) = outcome else {
            panic!("expected completion, got {:?}", outcome);
        };
        assert_eq!(tags(&result), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_middleware_seeds_chain() {
        let dispatcher = Dispatcher::new(shop_engine()).middleware(guard);
        let ctx = MockContext::command("shop", None, None);

        let outcome = dispatcher.dispatch(&ctx).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Completed(json!(["guard", "a"])));
    }

    #[tokio::test]
    async fn test_middleware_block_vetoes_chain() {
        let dispatcher = Dispatcher::new(shop_engine()).middleware(deny);
        let ctx = MockContext::command("shop", Some("admin"), Some("additem"));

        let outcome = dispatcher.dispatch(&ctx).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Blocked);
        assert_eq!(ctx.events(), vec!["denied"]);
    }

    #[tokio::test]
    async fn test_block_inside_chain_is_not_an_error() {
        let dispatcher = Dispatcher::new(shop_engine()).on_error(report);
        let ctx = MockContext::command("shop", None, Some("vault"));

        let outcome = dispatcher.dispatch(&ctx).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Blocked);
        // on_error never saw the block.
        assert_eq!(ctx.events(), vec!["denied"]);
    }

    #[tokio::test]
    async fn test_failure_goes_to_on_error() {
        let dispatcher = Dispatcher::new(shop_engine()).on_error(report);
        let ctx = MockContext::command("shop", None, Some("refund"));

        let outcome = dispatcher.dispatch(&ctx).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Recovered);
        assert_eq!(ctx.events(), vec!["error: inventory unavailable"]);
    }

    #[tokio::test]
    async fn test_failure_without_hook_is_returned() {
        let dispatcher = Dispatcher::new(shop_engine());
        let ctx = MockContext::command("shop", None, Some("refund"));

        let err = dispatcher.dispatch(&ctx).await.unwrap_err();
        assert!(matches!(err, HandlerError::Failed(_)));
    }

    #[tokio::test]
    async fn test_unknown_command_calls_not_found() {
        let dispatcher = Dispatcher::new(shop_engine()).on_not_found(not_found);
        let ctx = MockContext::command("bank", None, None);

        let outcome = dispatcher.dispatch(&ctx).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::NotFound);
        assert_eq!(ctx.events(), vec!["not found"]);
    }

    #[tokio::test]
    async fn test_autocomplete_is_truncated() {
        let dispatcher = Dispatcher::new(shop_engine());
        let ctx = MockContext::new(RouteTarget::Autocomplete {
            name: "item".to_string(),
            group: None,
            subcommand: None,
            focused: "name".to_string(),
        });

        let outcome = dispatcher.dispatch(&ctx).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Suggested(25));
        let suggested = ctx.suggested.lock().unwrap().clone().unwrap();
        assert_eq!(suggested.len(), 25);
        assert_eq!(suggested[0].name, "item 0");
    }

    #[tokio::test]
    async fn test_missing_autocomplete_is_silent() {
        let dispatcher = Dispatcher::new(shop_engine()).on_not_found(not_found);
        let ctx = MockContext::new(RouteTarget::Autocomplete {
            name: "item".to_string(),
            group: None,
            subcommand: None,
            focused: "quantity".to_string(),
        });

        let outcome = dispatcher.dispatch(&ctx).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Dropped);
        assert!(ctx.suggested.lock().unwrap().is_none());
        assert!(ctx.events().is_empty());
    }

    #[tokio::test]
    async fn test_component_routing() {
        let dispatcher = Dispatcher::new(shop_engine());

        let ctx = MockContext::component(ResponderType::Button, "shop/buy/sword");
        assert_eq!(
            dispatcher.dispatch(&ctx).await.unwrap(),
            DispatchOutcome::Responded
        );
        assert_eq!(ctx.events(), vec!["buy sword"]);

        let stale = MockContext::component(ResponderType::StringSelect, "/shop/buy");
        assert_eq!(
            dispatcher.dispatch(&stale).await.unwrap(),
            DispatchOutcome::Dropped
        );
        assert!(stale.events().is_empty());
    }
}
