//! TOML schema files describing an [`App`](crate::App) tree, used by the
//! `argmatch` driver.

mod build;
mod loader;
mod types;

pub use build::{BoundCommand, ParseReport};
pub use loader::SchemaError;
pub use types::{CommandSchema, OptionKind, OptionSchema, PathCheck, SchemaFile};
