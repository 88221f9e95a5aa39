//! The command tree: declared options, subcommands and per-parse session
//! state.
//!
//! An `App` is built once and parsed many times. Every parse starts by
//! clearing the whole subtree, so reads after a parse only reflect that
//! parse.

use crate::error::ParseError;
use crate::option::{Arity, Destination, MultiOptionPolicy, Opt, OptionId};
use crate::registry::{parse_names, NameKind, NameMatch, NameTable};
use crate::tokenize::split_line;
use crate::value::{ArgValue, Bind, Binding, Container, Flag, FlagValue, Raw, Scalar, Sink};

#[derive(Debug)]
pub struct App {
    name: String,
    description: String,
    parent: Option<String>,
    pub(crate) options: Vec<Option<Opt>>,
    pub(crate) names: NameTable,
    pub(crate) subcommands: Vec<App>,
    pub(crate) allow_extras: bool,
    pub(crate) allow_windows_style_options: bool,
    pub(crate) positionals_at_end: bool,
    ignore_case: bool,
    ignore_underscore: bool,
    pub(crate) require_subcommand: bool,
    pub(crate) extras: Vec<String>,
    pub(crate) parse_order: Vec<OptionId>,
    pub(crate) invoked: Option<usize>,
}

impl App {
    /// An empty command with no options, subcommands or settings enabled.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parent: None,
            options: Vec::new(),
            names: NameTable::default(),
            subcommands: Vec::new(),
            allow_extras: false,
            allow_windows_style_options: false,
            positionals_at_end: false,
            ignore_case: false,
            ignore_underscore: false,
            require_subcommand: false,
            extras: Vec::new(),
            parse_order: Vec::new(),
            invoked: None,
        }
    }

    /// The command name, also used to match it as a subcommand.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description given at construction.
    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// Name of the App this one was added to.
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Keep unmatched tokens instead of failing with [`ParseError::Extras`].
    pub fn allow_extras(&mut self, value: bool) -> &mut Self {
        self.allow_extras = value;
        self
    }

    /// Also accept `/name` and `/name:value` for registered names.
    pub fn allow_windows_style_options(&mut self, value: bool) -> &mut Self {
        self.allow_windows_style_options = value;
        self
    }

    /// After the first positional, every token is positional.
    pub fn positionals_at_end(&mut self, value: bool) -> &mut Self {
        self.positionals_at_end = value;
        self
    }

    /// Match long names, positional names and subcommands case-insensitively.
    pub fn ignore_case(&mut self, value: bool) -> &mut Self {
        self.ignore_case = value;
        self
    }

    /// Ignore `_` when matching long names, positional names and subcommands.
    pub fn ignore_underscore(&mut self, value: bool) -> &mut Self {
        self.ignore_underscore = value;
        self
    }

    /// Fail with [`ParseError::Required`] unless a subcommand is given.
    pub fn require_subcommand(&mut self, value: bool) -> &mut Self {
        self.require_subcommand = value;
        self
    }

    /// Whether unmatched tokens are kept.
    pub fn get_allow_extras(&self) -> bool {
        self.allow_extras
    }

    pub(crate) fn matcher(&self) -> NameMatch {
        NameMatch {
            ignore_case: self.ignore_case,
            ignore_underscore: self.ignore_underscore,
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    fn register(
        &mut self,
        spec: &str,
        destination: Destination,
        arity: Arity,
        value_tokens: usize,
        binder: Option<Box<dyn Bind>>,
    ) -> Result<&mut Opt, ParseError> {
        let names = parse_names(spec)?;
        let is_flag = destination == Destination::Flag;

        if is_flag && names.iter().any(|n| n.kind() == NameKind::Positional) {
            return Err(ParseError::construction(spec, "flags cannot have positional names"));
        }
        if !is_flag && names.iter().any(|n| n.flag_default().is_some()) {
            return Err(ParseError::construction(spec, "only flags take default flag values"));
        }
        self.names.check_free(&names, self.matcher())?;

        let id = OptionId(self.options.len());
        self.names.insert(id, &names);
        let opt = Opt::new(id, names, destination, arity, value_tokens, binder);
        tracing::trace!(app = %self.name, option = %opt.name(), "Registered option");

        self.options.push(None);
        Ok(self.options[id.0].insert(opt))
    }

    /// Flag counted but not bound anywhere.
    pub fn add_flag(&mut self, names: &str) -> Result<&mut Opt, ParseError> {
        self.register(names, Destination::Flag, Arity::Fixed(0), 1, None)
    }

    /// Flag written into a bool or integer.
    pub fn add_flag_to<T: FlagValue>(&mut self, names: &str, target: &Binding<T>) -> Result<&mut Opt, ParseError> {
        let binder = Flag(Sink::Binding(target.clone()));
        let opt = self.register(names, Destination::Flag, Arity::Fixed(0), 1, Some(Box::new(binder)))?;
        Ok(opt.multi_option_policy(T::DEFAULT_POLICY))
    }

    /// Flag whose summed value is handed to `f`, only when it was given.
    pub fn add_flag_fn<F>(&mut self, names: &str, f: F) -> Result<&mut Opt, ParseError>
    where
        F: FnMut(i64) -> Result<(), ParseError> + 'static,
    {
        let binder = Flag::<i64>(Sink::Callback(Box::new(f)));
        let opt = self.register(names, Destination::Flag, Arity::Fixed(0), 1, Some(Box::new(binder)))?;
        Ok(opt.multi_option_policy(MultiOptionPolicy::Sum))
    }

    /// One value of type `T`.
    pub fn add_option<T: ArgValue>(&mut self, names: &str, target: &Binding<T>) -> Result<&mut Opt, ParseError> {
        let binder = Scalar(Sink::Binding(target.clone()));
        self.register(names, Destination::Scalar, Arity::Fixed(T::TOKENS), T::TOKENS, Some(Box::new(binder)))
    }

    /// Every value, appended in command-line order.
    pub fn add_option_vec<T: ArgValue>(
        &mut self,
        names: &str,
        target: &Binding<Vec<T>>,
    ) -> Result<&mut Opt, ParseError> {
        let binder = Container(Sink::Binding(target.clone()));
        self.register(names, Destination::Container, Arity::AtLeast(T::TOKENS), T::TOKENS, Some(Box::new(binder)))
    }

    /// One value of type `T`, handed to `f` when given.
    pub fn add_option_fn<T, F>(&mut self, names: &str, f: F) -> Result<&mut Opt, ParseError>
    where
        T: ArgValue,
        F: FnMut(T) -> Result<(), ParseError> + 'static,
    {
        let binder: Scalar<T> = Scalar(Sink::Callback(Box::new(f)));
        self.register(names, Destination::Scalar, Arity::Fixed(T::TOKENS), T::TOKENS, Some(Box::new(binder)))
    }

    /// Every value, handed to `f` as one list when given.
    pub fn add_option_vec_fn<T, F>(&mut self, names: &str, f: F) -> Result<&mut Opt, ParseError>
    where
        T: ArgValue,
        F: FnMut(Vec<T>) -> Result<(), ParseError> + 'static,
    {
        let binder: Container<T> = Container(Sink::Callback(Box::new(f)));
        self.register(names, Destination::Container, Arity::AtLeast(T::TOKENS), T::TOKENS, Some(Box::new(binder)))
    }

    /// Hands the processed tokens to `f` unconverted.
    pub fn add_option_raw<F>(&mut self, names: &str, f: F) -> Result<&mut Opt, ParseError>
    where
        F: FnMut(&[String]) -> Result<(), ParseError> + 'static,
    {
        let binder = Raw(Box::new(f));
        self.register(names, Destination::Callback, Arity::AtLeast(1), 1, Some(Box::new(binder)))
    }

    /// Add a child command. It inherits extras, windows-style and name
    /// matching settings as they are now.
    pub fn add_subcommand(&mut self, name: &str, description: &str) -> Result<&mut App, ParseError> {
        if name.is_empty() || name.starts_with('-') || name.chars().any(char::is_whitespace) {
            return Err(ParseError::construction(name, "invalid subcommand name"));
        }
        if self.find_subcommand(name).is_some() {
            return Err(ParseError::construction(name, "subcommand already added"));
        }

        let mut child = App::new(name, description);
        child.parent = Some(self.name.clone());
        child.allow_extras = self.allow_extras;
        child.allow_windows_style_options = self.allow_windows_style_options;
        child.ignore_case = self.ignore_case;
        child.ignore_underscore = self.ignore_underscore;

        self.subcommands.push(child);
        let index = self.subcommands.len() - 1;
        Ok(&mut self.subcommands[index])
    }

    /// Drop an option and every needs/excludes edge pointing at it.
    pub fn remove_option(&mut self, id: OptionId) -> bool {
        let removed = self.options.get_mut(id.0).and_then(Option::take);
        if removed.is_none() {
            return false;
        }
        self.names.remove(id);
        for opt in self.options.iter_mut().flatten() {
            opt.needs.remove(&id);
            opt.excludes.remove(&id);
        }
        true
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolve `-c`, `--count` or a positional name.
    pub fn option_id(&self, name: &str) -> Option<OptionId> {
        self.names.lookup(name, self.matcher())
    }

    /// The live option behind `id`, if it was not removed.
    pub fn option(&self, id: OptionId) -> Option<&Opt> {
        self.options.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access for builder calls after registration.
    pub fn option_mut(&mut self, id: OptionId) -> Option<&mut Opt> {
        self.options.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Live options in declaration order.
    pub fn options(&self) -> impl Iterator<Item = &Opt> {
        self.options.iter().flatten()
    }

    pub(crate) fn find_subcommand(&self, name: &str) -> Option<usize> {
        let matcher = self.matcher();
        self.subcommands.iter().position(|s| matcher.same(&s.name, name))
    }

    /// A direct child by name.
    pub fn subcommand(&self, name: &str) -> Option<&App> {
        self.find_subcommand(name).map(|i| &self.subcommands[i])
    }

    /// Mutable access to a direct child by name.
    pub fn subcommand_mut(&mut self, name: &str) -> Option<&mut App> {
        self.find_subcommand(name).map(|i| &mut self.subcommands[i])
    }

    /// Direct children in the order they were added.
    pub fn subcommands(&self) -> &[App] {
        &self.subcommands
    }

    // ------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------

    /// Parse arguments that do not include the program name.
    pub fn parse<I, S>(&mut self, args: I) -> Result<(), ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        self.run(&tokens)
    }

    /// Parse a full argv; the first element is the program name.
    pub fn parse_argv<I, S>(&mut self, argv: I) -> Result<(), ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = argv.into_iter().skip(1).map(Into::into).collect();
        self.run(&tokens)
    }

    /// Tokenize a single command line, then parse it.
    pub fn parse_line(&mut self, line: &str, program_name_included: bool) -> Result<(), ParseError> {
        let mut tokens = split_line(line);
        if program_name_included && !tokens.is_empty() {
            tokens.remove(0);
        }
        self.run(&tokens)
    }

    fn run(&mut self, tokens: &[String]) -> Result<(), ParseError> {
        self.clear();
        tracing::debug!(app = %self.name, tokens = tokens.len(), "Parsing arguments");

        self.match_tokens(tokens)?;
        self.process_values()?;
        self.check_requirements()?;
        self.check_extras()
    }

    /// Forget everything recorded by the last parse, recursively.
    pub fn clear(&mut self) {
        for opt in self.options.iter_mut().flatten() {
            opt.clear();
        }
        self.extras.clear();
        self.parse_order.clear();
        self.invoked = None;
        for sub in &mut self.subcommands {
            sub.clear();
        }
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Recorded tokens for a declared name.
    pub fn count(&self, name: &str) -> Result<usize, ParseError> {
        self.option_id(name)
            .and_then(|id| self.option(id))
            .map(Opt::count)
            .ok_or_else(|| ParseError::OptionNotFound { name: name.to_string() })
    }

    /// Options in the order they were matched, one entry per occurrence.
    pub fn parse_order(&self) -> &[OptionId] {
        &self.parse_order
    }

    /// Unmatched tokens of this App only.
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// Unmatched tokens of this App followed by those of the invoked
    /// subcommand.
    pub fn remaining(&self) -> Vec<String> {
        let mut out = self.extras.clone();
        if let Some(sub) = self.invoked_subcommand() {
            out.extend(sub.remaining());
        }
        out
    }

    /// The child chosen by the last parse.
    pub fn invoked_subcommand(&self) -> Option<&App> {
        self.invoked.map(|i| &self.subcommands[i])
    }

    /// True when the last parse invoked the named child.
    pub fn got_subcommand(&self, name: &str) -> bool {
        self.invoked_subcommand()
            .is_some_and(|sub| self.matcher().same(&sub.name, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let mut app = App::new("test", "");
        app.add_flag("-c,--count").unwrap();
        assert!(matches!(
            app.add_flag("--count"),
            Err(ParseError::IncorrectConstruction { .. })
        ));
        assert!(app.add_flag("-C").is_ok());
    }

    #[test]
    fn flags_cannot_be_positional() {
        let mut app = App::new("test", "");
        assert!(app.add_flag("hi").is_err());
        let target = Binding::new(String::new());
        assert!(app.add_option("-s{7}", &target).is_err());
    }

    #[test]
    fn subcommands_inherit_settings() {
        let mut app = App::new("test", "");
        app.allow_extras(true).ignore_case(true);
        let sub = app.add_subcommand("sub1", "first").unwrap();
        assert!(sub.get_allow_extras());
        assert_eq!(sub.parent_name(), Some("test"));
        assert!(app.add_subcommand("SUB1", "").is_err());
        assert!(app.add_subcommand("-bad", "").is_err());
    }

    #[test]
    fn remove_option_scrubs_edges() {
        let mut app = App::new("test", "");
        let one = app.add_flag("--one").unwrap().id();
        let two = app.add_flag("--two").unwrap().id();
        app.option_mut(one).unwrap().needs(two).unwrap().excludes(two).unwrap();

        assert!(app.remove_option(two));
        assert!(!app.remove_option(two));
        assert!(app.option(one).unwrap().needs.is_empty());
        assert!(app.option_id("--two").is_none());
        assert!(matches!(app.count("--two"), Err(ParseError::OptionNotFound { .. })));
    }
}
