use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::app::App;
use crate::option::OptionId;
use crate::schema::loader::SchemaError;
use crate::schema::types::{CommandSchema, OptionKind, OptionSchema, PathCheck, SchemaFile};
use crate::validate::{IsMember, Validator};
use crate::value::Binding;

enum Slot {
    Flag(Binding<i64>),
    Value(Binding<String>),
    List(Binding<Vec<String>>),
}

/// The bindings created for one command, mirroring the App tree.
pub struct BoundCommand {
    name: String,
    slots: Vec<(OptionId, Slot)>,
    subcommands: Vec<BoundCommand>,
}

/// Parsed values of one command level, as printed by the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseReport {
    pub command: String,
    pub values: BTreeMap<String, Value>,
    pub remaining: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<Box<ParseReport>>,
}

impl SchemaFile {
    /// Declare the schema as an App, with one binding per option.
    pub fn build(&self) -> Result<(App, BoundCommand), SchemaError> {
        let mut app = App::new(self.command.name.as_str(), self.command.description.as_str());
        let bound = build_command(&mut app, &self.command)?;
        Ok((app, bound))
    }
}

fn build_command(app: &mut App, schema: &CommandSchema) -> Result<BoundCommand, SchemaError> {
    if let Some(value) = schema.allow_extras {
        app.allow_extras(value);
    }
    if let Some(value) = schema.windows_style {
        app.allow_windows_style_options(value);
    }
    if let Some(value) = schema.positionals_at_end {
        app.positionals_at_end(value);
    }
    if let Some(value) = schema.ignore_case {
        app.ignore_case(value);
    }
    if let Some(value) = schema.ignore_underscore {
        app.ignore_underscore(value);
    }
    if let Some(value) = schema.require_subcommand {
        app.require_subcommand(value);
    }

    let slots = schema
        .options
        .iter()
        .map(|option| add_option(app, option))
        .collect::<Result<Vec<_>, _>>()?;

    for (option, (id, _)) in schema.options.iter().zip(&slots) {
        for target in &option.needs {
            let other = resolve(app, schema, target)?;
            if let Some(opt) = app.option_mut(*id) {
                opt.needs(other)?;
            }
        }
        for target in &option.excludes {
            let other = resolve(app, schema, target)?;
            if let Some(opt) = app.option_mut(*id) {
                opt.excludes(other)?;
            }
        }
    }

    let mut subcommands = Vec::new();
    for sub in &schema.subcommands {
        let child = app.add_subcommand(&sub.name, &sub.description)?;
        subcommands.push(build_command(child, sub)?);
    }

    Ok(BoundCommand {
        name: schema.name.clone(),
        slots,
        subcommands,
    })
}

fn resolve(app: &App, schema: &CommandSchema, target: &str) -> Result<OptionId, SchemaError> {
    app.option_id(target).ok_or_else(|| SchemaError::ValidationError {
        message: format!("'{}' has no option named '{target}'", schema.name),
    })
}

fn add_option(app: &mut App, option: &OptionSchema) -> Result<(OptionId, Slot), SchemaError> {
    let (opt, slot) = match option.kind {
        OptionKind::Flag => {
            let binding = Binding::new(0i64);
            (app.add_flag_to(&option.names, &binding)?, Slot::Flag(binding))
        }
        OptionKind::Value => {
            let binding = Binding::new(String::new());
            (app.add_option(&option.names, &binding)?, Slot::Value(binding))
        }
        OptionKind::List => {
            let binding = Binding::new(Vec::new());
            (app.add_option_vec(&option.names, &binding)?, Slot::List(binding))
        }
    };

    opt.description(option.description.as_str());
    opt.mandatory(option.required);
    if let Some(n) = option.expected {
        opt.expected(n)?;
    }
    if let Some(policy) = option.policy {
        opt.multi_option_policy(policy);
    }
    if let Some(env) = &option.env {
        opt.envname(env.as_str());
    }
    if let Some(default) = &option.default {
        opt.default_str(default.as_str());
    }
    if let Some(delimiter) = option.delimiter {
        opt.delimiter(delimiter);
    }
    if !option.choices.is_empty() {
        let mut member = IsMember::new(option.choices.iter().cloned());
        if option.loose_choices {
            member = member.ignore_case().ignore_underscore();
        }
        opt.check(member);
    }
    if let Some([low, high]) = option.range {
        opt.check(Validator::range(low, high));
    }
    if let Some(check) = option.check {
        opt.check(match check {
            PathCheck::File => Validator::existing_file(),
            PathCheck::Dir => Validator::existing_directory(),
            PathCheck::Exists => Validator::existing_path(),
            PathCheck::Missing => Validator::nonexistent_path(),
        });
    }

    Ok((opt.id(), slot))
}

impl BoundCommand {
    /// Collect the values bound by the last parse of `app`.
    pub fn report(&self, app: &App) -> ParseReport {
        let values = self
            .slots
            .iter()
            .filter_map(|(id, slot)| {
                let opt = app.option(*id)?;
                let value = match slot {
                    Slot::Flag(binding) => Value::from(binding.get()),
                    Slot::Value(binding) => {
                        let text = binding.get();
                        if opt.count() == 0 && text.is_empty() {
                            Value::Null
                        } else {
                            Value::String(text)
                        }
                    }
                    Slot::List(binding) => Value::from(binding.get()),
                };
                Some((opt.name(), value))
            })
            .collect();

        let subcommand = app.invoked_subcommand().and_then(|sub| {
            self.subcommands
                .iter()
                .find(|bound| bound.name == sub.name())
                .map(|bound| Box::new(bound.report(sub)))
        });

        ParseReport {
            command: self.name.clone(),
            values,
            remaining: app.extras().to_vec(),
            subcommand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(content: &str) -> (App, BoundCommand) {
        SchemaFile::from_toml(content).unwrap().build().unwrap()
    }

    #[test]
    fn report_collects_bound_values() {
        let (mut app, bound) = build(
            r#"
name = "tool"

[[options]]
names = "-v,--verbose"
kind = "flag"

[[options]]
names = "-n,--name"

[[options]]
names = "files"
kind = "list"
"#,
        );
        app.parse(["-vv", "--name", "x", "a", "b"]).unwrap();
        let report = bound.report(&app);
        assert_eq!(report.values["--verbose"], Value::from(2));
        assert_eq!(report.values["--name"], Value::from("x"));
        assert_eq!(report.values["files"], Value::from(vec!["a", "b"]));
        assert!(report.subcommand.is_none());
    }

    #[test]
    fn unset_value_reports_null() {
        let (mut app, bound) = build("name = \"tool\"\n[[options]]\nnames = \"--opt\"\n");
        app.parse(Vec::<String>::new()).unwrap();
        assert_eq!(bound.report(&app).values["--opt"], Value::Null);
    }

    #[test]
    fn needs_are_wired() {
        let (mut app, _) = build(
            r#"
name = "tool"

[[options]]
names = "--a"
kind = "flag"
needs = ["--b"]

[[options]]
names = "--b"
kind = "flag"
"#,
        );
        let err = app.parse(["--a"]).unwrap_err();
        assert_eq!(err.to_string(), "--a requires --b");
    }

    #[test]
    fn subcommand_report_nests() {
        let (mut app, bound) = build(
            r#"
name = "tool"
allow_extras = true

[[subcommands]]
name = "run"

[[subcommands.options]]
names = "-q"
kind = "flag"
"#,
        );
        app.parse(["run", "-q", "stray"]).unwrap();
        let report = bound.report(&app);
        let sub = report.subcommand.unwrap();
        assert_eq!(sub.command, "run");
        assert_eq!(sub.values["-q"], Value::from(1));
        assert_eq!(sub.remaining, vec!["stray".to_string()]);
    }

    #[test]
    fn bad_construction_surfaces() {
        let err = SchemaFile::from_toml("name = \"tool\"\n[[options]]\nnames = \"-v\"\nkind = \"flag\"\nexpected = 2\n")
            .unwrap()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::Construction(_)));
    }
}
