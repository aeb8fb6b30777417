//! Command registry: declarative command trees, schema flattening and
//! handler-chain lookup.

pub mod descriptor;
pub mod flatten;
pub mod registry;

pub use descriptor::{
    normalize_name, ChoiceValue, CommandChoice, CommandDescriptor, CommandType, ModuleDescriptor,
    ModuleKind, NumericBound, OptionDescriptor, OptionKind,
};
pub use flatten::{WireCommand, WireOption, WireOptionKind};
pub use registry::{command_path, BuildScope, CommandRegistry, RegistrationScope};
