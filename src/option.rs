//! The option model: names, arity, policy, pipeline stages and the
//! occurrences recorded by the last parse.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::registry::{NameKind, OptionName};
use crate::validate::Validator;
use crate::value::{flag_value, Bind};

/// Handle to an option inside its [`App`](crate::App).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptionId(pub(crate) usize);

/// How many tokens an option takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many per occurrence.
    Fixed(usize),
    /// At least this many in total, in whole groups.
    AtLeast(usize),
}

impl Arity {
    /// Smallest token count that satisfies the rule.
    pub fn min(&self) -> usize {
        match *self {
            Arity::Fixed(n) | Arity::AtLeast(n) => n,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Arity::AtLeast(_))
    }
}

/// What happens when an option collects more values than it holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiOptionPolicy {
    #[default]
    Throw,
    TakeLast,
    TakeFirst,
    Join,
    Sum,
}

/// Kind of destination behind the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Flag,
    Scalar,
    Container,
    Callback,
}

/// One recorded token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Captured {
    pub(crate) value: String,
    /// Index in the App's token slice; `None` for attached or injected values.
    pub(crate) index: Option<usize>,
}

/// One match of an option on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Token index and offset inside a short cluster.
    pub(crate) position: (usize, usize),
    pub(crate) tokens: Vec<Captured>,
    /// Consumed more than its minimum and may give tokens back.
    pub(crate) greedy: bool,
    /// Tokens this occurrence must keep during reallocation.
    pub(crate) floor: usize,
}

impl Occurrence {
    /// Tokens captured by this match, in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

type EachFn = Box<dyn FnMut(&str)>;

/// A declared option or positional.
pub struct Opt {
    pub(crate) id: OptionId,
    pub(crate) names: Vec<OptionName>,
    description: String,
    pub(crate) destination: Destination,
    pub(crate) arity: Arity,
    /// Tokens per value.
    pub(crate) group: usize,
    /// Tokens the destination type converts at once.
    value_tokens: usize,
    pub(crate) policy: MultiOptionPolicy,
    pub(crate) required: bool,
    pub(crate) envname: Option<String>,
    pub(crate) default_str: Option<String>,
    pub(crate) delimiter: Option<char>,
    pub(crate) transforms: Vec<Validator>,
    pub(crate) validators: Vec<Validator>,
    pub(crate) each: Vec<EachFn>,
    pub(crate) needs: BTreeSet<OptionId>,
    pub(crate) excludes: BTreeSet<OptionId>,
    pub(crate) binder: Option<Box<dyn Bind>>,
    pub(crate) occurrences: Vec<Occurrence>,
}

impl fmt::Debug for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opt")
            .field("id", &self.id)
            .field("names", &self.names)
            .field("destination", &self.destination)
            .field("arity", &self.arity)
            .field("policy", &self.policy)
            .field("required", &self.required)
            .field("occurrences", &self.occurrences)
            .finish_non_exhaustive()
    }
}

impl Opt {
    pub(crate) fn new(
        id: OptionId,
        names: Vec<OptionName>,
        destination: Destination,
        arity: Arity,
        value_tokens: usize,
        binder: Option<Box<dyn Bind>>,
    ) -> Self {
        Self {
            id,
            names,
            description: String::new(),
            destination,
            arity,
            group: value_tokens,
            value_tokens,
            policy: MultiOptionPolicy::default(),
            required: false,
            envname: None,
            default_str: None,
            delimiter: None,
            transforms: Vec::new(),
            validators: Vec::new(),
            each: Vec::new(),
            needs: BTreeSet::new(),
            excludes: BTreeSet::new(),
            binder,
            occurrences: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------

    /// Fail the parse unless this option matches or reads its env variable.
    pub fn required(&mut self) -> &mut Self {
        self.required = true;
        self
    }

    /// Set or unset [`Opt::required`].
    pub fn mandatory(&mut self, value: bool) -> &mut Self {
        self.required = value;
        self
    }

    /// Number of values: positive is exact, negative is a minimum.
    pub fn expected(&mut self, n: i32) -> Result<&mut Self, ParseError> {
        if self.is_flag() {
            return Err(ParseError::construction(self.name(), "flags do not take a value count"));
        }
        if n == 0 {
            return Err(ParseError::construction(self.name(), "expected(0) is not allowed"));
        }
        if self.destination == Destination::Scalar {
            if n != 1 {
                return Err(ParseError::construction(
                    self.name(),
                    "a single-value destination only accepts expected(1)",
                ));
            }
            return Ok(self);
        }
        let count = n.unsigned_abs() as usize * self.group;
        self.arity = if n > 0 { Arity::Fixed(count) } else { Arity::AtLeast(count) };
        Ok(self)
    }

    /// Tokens per value: positive is one fixed group, negative repeats.
    pub fn type_size(&mut self, k: i32) -> Result<&mut Self, ParseError> {
        if self.is_flag() {
            return Err(ParseError::construction(self.name(), "flags do not take a type size"));
        }
        if k == 0 {
            return Err(ParseError::construction(self.name(), "type_size(0) is not allowed"));
        }
        let size = k.unsigned_abs() as usize;
        let compatible = match self.destination {
            Destination::Scalar => size == self.value_tokens,
            Destination::Container => size % self.value_tokens == 0,
            Destination::Flag | Destination::Callback => true,
        };
        if !compatible {
            return Err(ParseError::construction(
                self.name(),
                format!("destination converts {} token(s) per value", self.value_tokens),
            ));
        }
        self.group = size;
        self.arity = if k < 0 || self.destination == Destination::Container {
            Arity::AtLeast(size)
        } else {
            Arity::Fixed(size)
        };
        Ok(self)
    }

    /// How repeated values are reduced for the destination.
    pub fn multi_option_policy(&mut self, policy: MultiOptionPolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    /// Shorthand for [`MultiOptionPolicy::TakeLast`].
    pub fn take_last(&mut self) -> &mut Self {
        self.multi_option_policy(MultiOptionPolicy::TakeLast)
    }

    /// Shorthand for [`MultiOptionPolicy::TakeFirst`].
    pub fn take_first(&mut self) -> &mut Self {
        self.multi_option_policy(MultiOptionPolicy::TakeFirst)
    }

    /// Shorthand for [`MultiOptionPolicy::Join`].
    pub fn join(&mut self) -> &mut Self {
        self.multi_option_policy(MultiOptionPolicy::Join)
    }

    /// Read the value from this environment variable when not given.
    pub fn envname(&mut self, name: impl Into<String>) -> &mut Self {
        self.envname = Some(name.into());
        self
    }

    /// Run this text through the pipeline when the option is absent.
    pub fn default_str(&mut self, value: impl Into<String>) -> &mut Self {
        self.default_str = Some(value.into());
        self
    }

    /// Rewrite every value before validation; an error fails as validation.
    pub fn transform<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        let name = format!("transform#{}", self.transforms.len());
        self.transforms.push(Validator::transform(name, f));
        self
    }

    /// Add a validator or an [`IsMember`](crate::IsMember) set.
    pub fn check(&mut self, validator: impl Into<Validator>) -> &mut Self {
        self.validators.push(validator.into());
        self
    }

    /// Called with every processed value, after validation.
    pub fn each(&mut self, f: impl FnMut(&str) + 'static) -> &mut Self {
        self.each.push(Box::new(f));
        self
    }

    /// Split every value on this character.
    pub fn delimiter(&mut self, delimiter: char) -> &mut Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Fail when this option is given without `other`.
    pub fn needs(&mut self, other: OptionId) -> Result<&mut Self, ParseError> {
        if other == self.id {
            return Err(ParseError::construction(self.name(), "an option cannot need itself"));
        }
        self.needs.insert(other);
        Ok(self)
    }

    /// Fail when this option and `other` are both given.
    pub fn excludes(&mut self, other: OptionId) -> Result<&mut Self, ParseError> {
        if other == self.id {
            return Err(ParseError::construction(self.name(), "an option cannot exclude itself"));
        }
        self.excludes.insert(other);
        Ok(self)
    }

    /// Free-form text for callers building their own help.
    pub fn description(&mut self, text: impl Into<String>) -> &mut Self {
        self.description = text.into();
        self
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Handle for lookups and needs/excludes links.
    pub fn id(&self) -> OptionId {
        self.id
    }

    /// Primary name as typed: first long name, else short, else positional.
    pub fn name(&self) -> String {
        [NameKind::Long, NameKind::Short, NameKind::Positional]
            .iter()
            .find_map(|kind| self.names.iter().find(|n| n.kind() == *kind))
            .map(OptionName::spelled)
            .unwrap_or_default()
    }

    /// Every declared name, in declaration order.
    pub fn names(&self) -> &[OptionName] {
        &self.names
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// Recorded result tokens; each flag match counts once.
    pub fn count(&self) -> usize {
        self.occurrences.iter().map(Occurrence::len).sum()
    }

    /// Every recorded token across occurrences, in order.
    pub fn results(&self) -> Vec<String> {
        self.occurrences
            .iter()
            .flat_map(|o| o.values().map(str::to_string))
            .collect()
    }

    /// Matches recorded by the last parse.
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Token count rule after `expected` and `type_size`.
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Values expected, as a signed count in the style of [`Opt::expected`].
    pub fn get_expected(&self) -> i32 {
        let groups = (self.arity.min() / self.group.max(1)) as i32;
        if self.arity.is_unlimited() {
            -groups
        } else {
            groups
        }
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// The active [`MultiOptionPolicy`].
    pub fn policy(&self) -> MultiOptionPolicy {
        self.policy
    }

    /// Whether [`Opt::required`] was set.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Flags take no values of their own.
    pub fn is_flag(&self) -> bool {
        self.destination == Destination::Flag
    }

    /// Declares a positional name.
    pub fn is_positional(&self) -> bool {
        self.positional_name().is_some()
    }

    pub(crate) fn positional_name(&self) -> Option<&OptionName> {
        self.names.iter().find(|n| n.kind() == NameKind::Positional)
    }

    /// A fixed count of two or more under TakeFirst/TakeLast consumes as
    /// many tokens as it can and lets the policy pick.
    pub(crate) fn greedy_fixed(&self) -> bool {
        matches!(self.arity, Arity::Fixed(n) if n >= 2)
            && matches!(self.policy, MultiOptionPolicy::TakeFirst | MultiOptionPolicy::TakeLast)
    }

    /// Tokens a scalar keeps under TakeFirst/TakeLast and allows under Throw.
    /// Also trims the chosen occurrence of a greedy fixed count.
    pub(crate) fn keep(&self) -> usize {
        self.arity.min().max(self.group)
    }

    /// The token recorded for a flag matched through `names[slot]`.
    pub(crate) fn flag_result(&self, slot: usize, attached: Option<&str>) -> String {
        let name = &self.names[slot];
        match attached {
            None => name.flag_default().unwrap_or("true").to_string(),
            Some(value) if name.is_negated() => match flag_value(value) {
                Ok(1) => "false".to_string(),
                Ok(-1) => "true".to_string(),
                Ok(n) => (-n).to_string(),
                Err(_) => value.to_string(),
            },
            Some(value) => value.to_string(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.occurrences.clear();
    }
}
