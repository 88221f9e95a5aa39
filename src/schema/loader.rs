use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ParseError;
use crate::schema::types::{CommandSchema, SchemaFile};

/// Errors that can occur when loading or building a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse schema file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Schema validation failed: {message}")]
    ValidationError { message: String },

    #[error("Schema declares an unusable option: {0}")]
    Construction(#[from] ParseError),
}

impl SchemaFile {
    /// `~/.config/argmatch/schema.toml` or the platform equivalent.
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("argmatch").join("schema.toml")
    }

    pub fn load_from(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let schema = Self::from_toml(&content).map_err(|e| SchemaError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        schema.validate()?;
        tracing::debug!(path = %path.display(), command = %schema.command.name, "Loaded schema");
        Ok(schema)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Structural checks the option builder cannot make on its own.
    ///
    /// - Every command has a name
    /// - needs/excludes refer to options of the same command
    pub fn validate(&self) -> Result<(), SchemaError> {
        validate_command(&self.command)
    }
}

fn validate_command(command: &CommandSchema) -> Result<(), SchemaError> {
    if command.name.trim().is_empty() {
        return Err(SchemaError::ValidationError {
            message: "every command needs a name".to_string(),
        });
    }

    let declared: Vec<&str> = command
        .options
        .iter()
        .flat_map(|o| o.names.split(','))
        .map(|n| n.trim().trim_start_matches('!'))
        .map(|n| n.split('{').next().unwrap_or(n))
        .collect();

    for option in &command.options {
        for target in option.needs.iter().chain(&option.excludes) {
            if !declared.contains(&target.as_str()) {
                return Err(SchemaError::ValidationError {
                    message: format!(
                        "option '{}' in '{}' refers to unknown option '{}'",
                        option.names, command.name, target
                    ),
                });
            }
        }
    }

    command.subcommands.iter().try_for_each(validate_command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{OptionKind, PathCheck};

    const SAMPLE: &str = r#"
name = "tool"
allow_extras = true

[[options]]
names = "-v,--verbose"
kind = "flag"

[[options]]
names = "-o,--output"
check = "missing"
needs = ["--verbose"]

[[subcommands]]
name = "run"

[[subcommands.options]]
names = "targets"
kind = "list"
required = true
"#;

    #[test]
    fn parses_nested_commands() {
        let schema = SchemaFile::from_toml(SAMPLE).unwrap();
        assert_eq!(schema.command.name, "tool");
        assert_eq!(schema.command.allow_extras, Some(true));
        assert_eq!(schema.command.options[0].kind, OptionKind::Flag);
        assert_eq!(schema.command.options[1].kind, OptionKind::Value);
        assert_eq!(schema.command.options[1].check, Some(PathCheck::Missing));
        assert_eq!(schema.command.subcommands[0].options[0].kind, OptionKind::List);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_needs_target() {
        let content = SAMPLE.replace(r#"needs = ["--verbose"]"#, r#"needs = ["--quiet"]"#);
        let schema = SchemaFile::from_toml(&content).unwrap();
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::ValidationError { .. })
        ));
    }

    #[test]
    fn load_from_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchemaFile::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SchemaError::ReadError { .. }));
    }

    #[test]
    fn load_from_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.toml");
        std::fs::write(&path, "name = [").unwrap();
        assert!(matches!(
            SchemaFile::load_from(&path),
            Err(SchemaError::ParseError { .. })
        ));
    }

    #[test]
    fn default_path_ends_with_crate_dir() {
        let path = SchemaFile::default_path();
        assert!(path.ends_with("argmatch/schema.toml"));
    }
}
