//! Match a command line against a declared tree of options, positionals and
//! subcommands, then convert, validate and bind the values.

pub mod app;
pub mod classifier;
mod engine;
pub mod error;
pub mod option;
mod pipeline;
pub mod registry;
mod requirements;
pub mod schema;
pub mod tokenize;
pub mod validate;
pub mod value;

pub use app::App;
pub use classifier::Classifier;
pub use error::{EarlyExit, ParseError};
pub use option::{Arity, Destination, MultiOptionPolicy, Opt, OptionId};
pub use registry::{parse_names, NameKind, OptionName};
pub use tokenize::split_line;
pub use validate::{shared_set, IsMember, SharedSet, Validator};
pub use value::{flag_value, ArgValue, Binding, FlagValue};
