use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::path::PathTree;
use super::{normalize_path, ResponderDescriptor, ResponderType, RouteMatch};

/// A resolved responder together with its match context.
pub struct Resolved<'r, C> {
    pub descriptor: &'r ResponderDescriptor<C>,
    pub route: RouteMatch,
}

/// Responder descriptors indexed by type, then by path.
pub struct ResponderRouter<C> {
    routes: HashMap<ResponderType, PathTree<Arc<ResponderDescriptor<C>>>>,
}

impl<C> Default for ResponderRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ResponderRouter<C> {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Inserts the descriptor under each of its types. A later registration
    /// at the same type and path replaces the earlier one.
    pub fn register(&mut self, mut descriptor: ResponderDescriptor<C>) {
        descriptor.path = normalize_path(&descriptor.path);
        if descriptor.types.is_empty() {
            warn!("Responder '{}' declares no types, ignoring", descriptor.path);
            return;
        }

        let descriptor = Arc::new(descriptor);
        for kind in &descriptor.types {
            let replaced = self
                .routes
                .entry(*kind)
                .or_default()
                .insert(&descriptor.path, Arc::clone(&descriptor));
            if replaced.is_some() {
                debug!("Replaced {} responder at '{}'", kind, descriptor.path);
            }
        }
        info!(
            "Registered responder '{}' for {:?}",
            descriptor.path, descriptor.types
        );
    }

    pub fn resolve(&self, kind: ResponderType, identifier: &str) -> Option<Resolved<'_, C>> {
        let identifier = normalize_path(identifier);
        let found = self.routes.get(&kind)?.get(&identifier)?;
        let route = RouteMatch {
            path: found.pattern.to_string(),
            identifier,
            params: found.params.into_iter().collect(),
            rest: found.rest,
        };
        Some(Resolved {
            descriptor: found.value.as_ref(),
            route,
        })
    }

    /// Resolves with a type name in any casing; unknown names never match.
    pub fn resolve_named(&self, kind: &str, identifier: &str) -> Option<Resolved<'_, C>> {
        let kind = kind.parse().ok()?;
        self.resolve(kind, identifier)
    }

    /// Number of `(type, path)` entries.
    pub fn len(&self) -> usize {
        self.routes.values().map(PathTree::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        info!("Clearing {} responder routes", self.len());
        self.routes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxFuture, HandlerResult};

    fn noop(_ctx: &(), _route: RouteMatch) -> BoxFuture<'_, HandlerResult<()>> {
        Box::pin(async move { Ok(()) })
    }

    fn other(_ctx: &(), _route: RouteMatch) -> BoxFuture<'_, HandlerResult<()>> {
        Box::pin(async move { Ok(()) })
    }

    #[test]
    fn test_multi_type_registration() {
        let mut router = ResponderRouter::new();
        router.register(
            ResponderDescriptor::new("/shop/buy", noop)
                .on_all([ResponderType::Button, ResponderType::Modal]),
        );

        assert!(router.resolve(ResponderType::Button, "/shop/buy").is_some());
        assert!(router.resolve(ResponderType::Modal, "/shop/buy").is_some());
        assert!(router.resolve(ResponderType::StringSelect, "/shop/buy").is_none());
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_identifier_normalization() {
        let mut router = ResponderRouter::new();
        router.register(ResponderDescriptor::button("shop/buy", noop));

        let with_slash = router.resolve(ResponderType::Button, "/shop/buy").unwrap();
        let without = router.resolve(ResponderType::Button, "shop/buy").unwrap();
        assert_eq!(with_slash.route, without.route);
        assert_eq!(without.route.identifier, "/shop/buy");
        assert_eq!(without.descriptor.path, "/shop/buy");
    }

    #[test]
    fn test_type_names_are_case_insensitive() {
        let mut router = ResponderRouter::new();
        router.register(ResponderDescriptor::button("/shop/buy", noop));
        assert!(router.resolve_named("button", "shop/buy").is_some());
        assert!(router.resolve_named("Button", "/shop/buy").is_some());
        assert!(router.resolve_named("lever", "/shop/buy").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let mut router = ResponderRouter::new();
        router.register(ResponderDescriptor::button("/confirm", noop));
        router.register(ResponderDescriptor::button("/confirm", other));

        let resolved = router.resolve(ResponderType::Button, "/confirm").unwrap();
        let expected: crate::handler::ResponderFn<()> = other;
        assert_eq!(resolved.descriptor.handler as usize, expected as usize);
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_dynamic_identifier_context() {
        let mut router = ResponderRouter::new();
        router.register(ResponderDescriptor::button("/shop/buy", noop));
        router.register(ResponderDescriptor::button("/bp/:id", noop));

        let resolved = router
            .resolve(ResponderType::Button, "/shop/buy/item-7")
            .unwrap();
        assert_eq!(resolved.route.path, "/shop/buy");
        assert_eq!(resolved.route.rest(), Some("item-7"));

        let resolved = router.resolve(ResponderType::Button, "bp/12").unwrap();
        assert_eq!(resolved.route.param("id"), Some("12"));
        assert_eq!(resolved.route.rest(), None);
    }

    #[test]
    fn test_descriptor_without_types_is_ignored() {
        let mut router = ResponderRouter::new();
        router.register(ResponderDescriptor::new("/nothing", noop));
        assert!(router.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut router = ResponderRouter::new();
        router.register(ResponderDescriptor::button("/a", noop));
        router.clear();
        assert!(router.resolve(ResponderType::Button, "/a").is_none());
    }
}
