use serde::{Deserialize, Serialize};

use crate::option::MultiOptionPolicy;

/// Root of a schema file: the top-level command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaFile {
    pub command: CommandSchema,
}

/// One command and its children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSchema {
    pub name: String,
    pub description: String,
    /// Unset settings keep what the parent command passes down.
    pub allow_extras: Option<bool>,
    /// Accept `/name` and `/name:value`.
    pub windows_style: Option<bool>,
    pub positionals_at_end: Option<bool>,
    pub ignore_case: Option<bool>,
    pub ignore_underscore: Option<bool>,
    pub require_subcommand: Option<bool>,
    pub options: Vec<OptionSchema>,
    pub subcommands: Vec<CommandSchema>,
}

/// Destination shape of an option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    /// Integer flag; dispositions are summed.
    Flag,
    /// One text value.
    #[default]
    Value,
    /// Every text value, in order.
    List,
}

/// Filesystem check applied to every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCheck {
    File,
    Dir,
    Exists,
    Missing,
}

/// One option, in name-list syntax (`-c,--count`, `!--no-color`, `file`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionSchema {
    pub names: String,
    pub kind: OptionKind,
    pub description: String,
    pub required: bool,
    /// Signed value count, see `Opt::expected`.
    pub expected: Option<i32>,
    pub policy: Option<MultiOptionPolicy>,
    pub env: Option<String>,
    pub default: Option<String>,
    pub delimiter: Option<char>,
    pub choices: Vec<String>,
    /// Match choices ignoring case and underscores.
    pub loose_choices: bool,
    /// Inclusive numeric bounds.
    pub range: Option<[f64; 2]>,
    pub check: Option<PathCheck>,
    /// Names of options that must also be given.
    pub needs: Vec<String>,
    /// Names of options that must not be given alongside.
    pub excludes: Vec<String>,
}
