//! Component responders: handlers bound to buttons, select menus and modals
//! through opaque, application-chosen identifiers.

pub mod path;
mod router;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

pub use router::{Resolved, ResponderRouter};

use crate::error::UnknownResponderType;
use crate::handler::ResponderFn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResponderType {
    Button,
    StringSelect,
    UserSelect,
    RoleSelect,
    ChannelSelect,
    MentionableSelect,
    Modal,
    ModalComponent,
}

impl ResponderType {
    pub const ALL: [ResponderType; 8] = [
        ResponderType::Button,
        ResponderType::StringSelect,
        ResponderType::UserSelect,
        ResponderType::RoleSelect,
        ResponderType::ChannelSelect,
        ResponderType::MentionableSelect,
        ResponderType::Modal,
        ResponderType::ModalComponent,
    ];

    /// Stored key casing.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponderType::Button => "BUTTON",
            ResponderType::StringSelect => "STRING_SELECT",
            ResponderType::UserSelect => "USER_SELECT",
            ResponderType::RoleSelect => "ROLE_SELECT",
            ResponderType::ChannelSelect => "CHANNEL_SELECT",
            ResponderType::MentionableSelect => "MENTIONABLE_SELECT",
            ResponderType::Modal => "MODAL",
            ResponderType::ModalComponent => "MODAL_COMPONENT",
        }
    }
}

impl fmt::Display for ResponderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; accepts `button`, `StringSelect`, `string_select`, `MODAL-COMPONENT`.
impl FromStr for ResponderType {
    type Err = UnknownResponderType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let folded: String = raw
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect();
        ResponderType::ALL
            .into_iter()
            .find(|kind| kind.as_str().replace('_', "") == folded)
            .ok_or_else(|| UnknownResponderType(raw.to_string()))
    }
}

/// Prefixes a `/` when missing and drops a trailing one.
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub struct ResponderDescriptor<C> {
    pub path: String,
    pub types: BTreeSet<ResponderType>,
    pub handler: ResponderFn<C>,
}

impl<C> ResponderDescriptor<C> {
    pub fn new(path: &str, handler: ResponderFn<C>) -> Self {
        Self {
            path: normalize_path(path),
            types: BTreeSet::new(),
            handler,
        }
    }

    pub fn button(path: &str, handler: ResponderFn<C>) -> Self {
        Self::new(path, handler).on(ResponderType::Button)
    }

    pub fn modal(path: &str, handler: ResponderFn<C>) -> Self {
        Self::new(path, handler).on(ResponderType::Modal)
    }

    pub fn on(mut self, kind: ResponderType) -> Self {
        self.types.insert(kind);
        self
    }

    pub fn on_all(mut self, kinds: impl IntoIterator<Item = ResponderType>) -> Self {
        self.types.extend(kinds);
        self
    }
}

/// Match context handed to a responder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMatch {
    /// Registered pattern that matched.
    pub path: String,
    /// Normalized inbound identifier.
    pub identifier: String,
    pub params: HashMap<String, String>,
    /// Identifier segments past the registered path.
    pub rest: Option<String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn rest(&self) -> Option<&str> {
        self.rest.as_deref()
    }
}
