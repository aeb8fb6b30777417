//! Handler signatures shared by the command registry, the responder router
//! and the dispatch façade.
//!
//! Handlers are plain function pointers returning boxed futures, generic over
//! the application's interaction context `C`. Non-capturing closures coerce to
//! them:
//!
//! ```ignore
//! let run: CommandFn<BotContext> = |ctx, _prev| Box::pin(async move {
//!     ctx.reply("Pong!").await?;
//!     Ok(serde_json::Value::Null)
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::command::CommandChoice;
use crate::error::HandlerError;
use crate::responder::RouteMatch;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type HandlerResult<T = Value> = Result<T, HandlerError>;

/// One link of a command chain. Receives the previous link's result.
pub type CommandFn<C> = for<'a> fn(&'a C, Value) -> BoxFuture<'a, HandlerResult>;

/// Produces suggestions for the focused option of an autocomplete request.
pub type AutocompleteFn<C> = for<'a> fn(&'a C) -> BoxFuture<'a, HandlerResult<Vec<CommandChoice>>>;

/// Handles a component interaction matched by the responder router.
pub type ResponderFn<C> = for<'a> fn(&'a C, RouteMatch) -> BoxFuture<'a, HandlerResult<()>>;

/// Halts the running chain without an error.
pub fn block<T>() -> HandlerResult<T> {
    Err(HandlerError::Blocked)
}

/// Ordered handlers for one resolved command path:
/// command-level, then group-level, then subcommand-level.
pub struct HandlerChain<C> {
    links: Vec<CommandFn<C>>,
}

impl<C> HandlerChain<C> {
    /// Builds a chain, dropping absent links.
    pub fn new(links: impl IntoIterator<Item = Option<CommandFn<C>>>) -> Self {
        Self {
            links: links.into_iter().flatten().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[CommandFn<C>] {
        &self.links
    }

    /// Runs every link in order, feeding each one the previous result.
    ///
    /// Stops at the first error, including `HandlerError::Blocked`.
    pub async fn run(&self, ctx: &C, seed: Value) -> HandlerResult {
        let mut result = seed;
        for link in &self.links {
            result = link(ctx, result).await?;
        }
        Ok(result)
    }
}

impl<C> Clone for HandlerChain<C> {
    fn clone(&self) -> Self {
        Self {
            links: self.links.clone(),
        }
    }
}

impl<C> fmt::Debug for HandlerChain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("links", &self.links.len())
            .finish()
    }
}
