//! Destination types and the binders that write converted values into them.
//!
//! Values land in [`Binding`]s shared between the schema and the caller, or
//! are handed to a callback. Each option owns exactly one binder.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ParseError;
use crate::option::MultiOptionPolicy;

/// A type that can be built from one or more raw tokens.
pub trait ArgValue: Sized + 'static {
    /// Shown in conversion errors.
    const TYPE_NAME: &'static str;
    /// Tokens consumed per value.
    const TOKENS: usize = 1;

    fn parse_arg(s: &str) -> Result<Self, String>;

    fn from_tokens(tokens: &[String]) -> Result<Self, String> {
        match tokens {
            [single] => Self::parse_arg(single),
            _ => Err(format!("expected {} token(s), got {}", Self::TOKENS, tokens.len())),
        }
    }

    /// Combine two values under [`MultiOptionPolicy::Sum`].
    fn add(self, _other: Self) -> Result<Self, String> {
        Err(format!("values of type {} cannot be summed", Self::TYPE_NAME))
    }
}

impl ArgValue for String {
    const TYPE_NAME: &'static str = "TEXT";

    fn parse_arg(s: &str) -> Result<Self, String> {
        Ok(s.to_string())
    }

    fn add(mut self, other: Self) -> Result<Self, String> {
        self.push_str(&other);
        Ok(self)
    }
}

impl ArgValue for PathBuf {
    const TYPE_NAME: &'static str = "PATH";

    fn parse_arg(s: &str) -> Result<Self, String> {
        Ok(PathBuf::from(s))
    }
}

impl ArgValue for char {
    const TYPE_NAME: &'static str = "CHAR";

    fn parse_arg(s: &str) -> Result<Self, String> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(format!("'{s}' is not a single character")),
        }
    }
}

impl ArgValue for bool {
    const TYPE_NAME: &'static str = "BOOLEAN";

    fn parse_arg(s: &str) -> Result<Self, String> {
        flag_value(s).map(|v| v > 0)
    }
}

macro_rules! numeric_arg_value {
    ($name:literal, $add:expr => $($t:ty),*) => {
        $(
            impl ArgValue for $t {
                const TYPE_NAME: &'static str = $name;

                fn parse_arg(s: &str) -> Result<Self, String> {
                    s.trim().parse::<$t>().map_err(|e| e.to_string())
                }

                fn add(self, other: Self) -> Result<Self, String> {
                    let add: fn($t, $t) -> Option<$t> = $add;
                    add(self, other).ok_or_else(|| format!("{self} + {other} overflows"))
                }
            }
        )*
    };
}

numeric_arg_value!("INT", |a, b| a.checked_add(b) => i8, i16, i32, i64, isize);
numeric_arg_value!("UINT", |a, b| a.checked_add(b) => u8, u16, u32, u64, usize);
numeric_arg_value!("FLOAT", |a, b| Some(a + b) => f32, f64);

impl<A: ArgValue, B: ArgValue> ArgValue for (A, B) {
    const TYPE_NAME: &'static str = "[VALUE VALUE]";
    const TOKENS: usize = 2;

    fn parse_arg(s: &str) -> Result<Self, String> {
        Err(format!("'{s}' is a single token, a pair needs two"))
    }

    fn from_tokens(tokens: &[String]) -> Result<Self, String> {
        match tokens {
            [a, b] => Ok((A::parse_arg(a)?, B::parse_arg(b)?)),
            _ => Err(format!("expected 2 tokens, got {}", tokens.len())),
        }
    }
}

/// Interpret a flag value string as a signed disposition.
///
/// `true`/`on`/`yes`/`enable` and `1 t y +` are 1, `false`/`off`/`no`/`disable`
/// and `0 f n -` are -1; anything else must be an integer.
pub fn flag_value(s: &str) -> Result<i64, String> {
    let lower = s.trim().to_ascii_lowercase();
    match lower.as_str() {
        "true" | "on" | "yes" | "enable" | "1" | "t" | "y" | "+" => Ok(1),
        "false" | "off" | "no" | "disable" | "0" | "f" | "n" | "-" => Ok(-1),
        other => other
            .parse::<i64>()
            .map_err(|_| format!("'{s}' is not a valid flag value")),
    }
}

/// A type a flag can write: booleans and integers.
pub trait FlagValue: Sized + 'static {
    /// Policy applied when the option does not set one.
    const DEFAULT_POLICY: MultiOptionPolicy;

    fn from_flag_values(values: &[i64], policy: MultiOptionPolicy) -> Result<Self, String>;
}

impl FlagValue for bool {
    const DEFAULT_POLICY: MultiOptionPolicy = MultiOptionPolicy::TakeLast;

    fn from_flag_values(values: &[i64], policy: MultiOptionPolicy) -> Result<Self, String> {
        if policy == MultiOptionPolicy::Throw && values.len() > 1 {
            return Err(format!("flag given {} times, only once allowed", values.len()));
        }
        let chosen = match policy {
            MultiOptionPolicy::TakeFirst => values.first(),
            _ => values.last(),
        };
        Ok(chosen.is_some_and(|v| *v > 0))
    }
}

macro_rules! integer_flag_value {
    ($($t:ty),*) => {
        $(
            impl FlagValue for $t {
                const DEFAULT_POLICY: MultiOptionPolicy = MultiOptionPolicy::Sum;

                fn from_flag_values(values: &[i64], policy: MultiOptionPolicy) -> Result<Self, String> {
                    let total = match policy {
                        MultiOptionPolicy::Throw if values.len() > 1 => {
                            return Err(format!("flag given {} times, only once allowed", values.len()));
                        }
                        MultiOptionPolicy::TakeFirst => values.first().copied().unwrap_or(0),
                        MultiOptionPolicy::TakeLast | MultiOptionPolicy::Throw => {
                            values.last().copied().unwrap_or(0)
                        }
                        MultiOptionPolicy::Sum | MultiOptionPolicy::Join => values
                            .iter()
                            .try_fold(0i64, |acc, v| acc.checked_add(*v))
                            .ok_or_else(|| "flag total overflows".to_string())?,
                    };
                    <$t>::try_from(total).map_err(|_| format!("{total} does not fit the destination"))
                }
            }
        )*
    };
}

integer_flag_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Shared handle to a destination value.
///
/// The parser keeps one clone, the caller keeps another and reads it after
/// the parse.
pub struct Binding<T>(Arc<Mutex<T>>);

impl<T> Binding<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    pub fn set(&self, value: T) {
        *self.0.lock() = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.lock())
    }
}

impl<T: Clone> Binding<T> {
    pub fn get(&self) -> T {
        self.0.lock().clone()
    }
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Binding<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binding").field(&*self.0.lock()).finish()
    }
}

pub(crate) type Callback<T> = Box<dyn FnMut(T) -> Result<(), ParseError>>;

/// Where a converted value goes.
pub(crate) enum Sink<T> {
    Binding(Binding<T>),
    Callback(Callback<T>),
}

impl<T> Sink<T> {
    fn deliver(&mut self, value: T) -> Result<(), ParseError> {
        match self {
            Sink::Binding(binding) => {
                binding.set(value);
                Ok(())
            }
            Sink::Callback(callback) => callback(value),
        }
    }
}

/// Processed values of one option, ready for conversion.
pub(crate) struct BindInput<'a> {
    pub(crate) name: &'a str,
    /// One group of values per occurrence, in command-line order.
    pub(crate) groups: &'a [Vec<String>],
    pub(crate) policy: MultiOptionPolicy,
    /// Tokens a scalar retains under `TakeFirst` / `TakeLast` (and allows under `Throw`).
    pub(crate) keep: usize,
    /// Trim for fixed counts consumed greedily: the chosen group keeps this many tokens.
    pub(crate) cap: Option<usize>,
}

/// The first or last `keep` tokens, depending on the policy.
fn trim(values: &[String], policy: MultiOptionPolicy, keep: usize) -> &[String] {
    let keep = keep.min(values.len());
    match policy {
        MultiOptionPolicy::TakeFirst => &values[..keep],
        MultiOptionPolicy::TakeLast => &values[values.len() - keep..],
        _ => values,
    }
}

impl BindInput<'_> {
    /// Every value, occurrence boundaries dropped.
    fn values(&self) -> Vec<String> {
        self.groups.concat()
    }

    /// What a container or raw callback receives: under `TakeFirst` /
    /// `TakeLast` one occurrence's group, otherwise every value in order.
    fn selected(&self) -> Vec<String> {
        let chosen = match self.policy {
            MultiOptionPolicy::TakeFirst => self.groups.first(),
            MultiOptionPolicy::TakeLast => self.groups.last(),
            _ => return self.values(),
        };
        let group = chosen.map(Vec::as_slice).unwrap_or_default();
        match self.cap {
            Some(keep) => trim(group, self.policy, keep).to_vec(),
            None => group.to_vec(),
        }
    }

    fn convert<T: ArgValue>(&self, tokens: &[String]) -> Result<T, ParseError> {
        T::from_tokens(tokens).map_err(|e| {
            ParseError::conversion(
                self.name,
                format!("could not convert '{}' to {}: {e}", tokens.join(" "), T::TYPE_NAME),
            )
        })
    }

    fn convert_all<T: ArgValue>(&self, tokens: &[String]) -> Result<Vec<T>, ParseError> {
        if tokens.len() % T::TOKENS != 0 {
            return Err(ParseError::mismatch(
                self.name,
                format!("{} values do not form groups of {}", tokens.len(), T::TOKENS),
            ));
        }
        tokens.chunks(T::TOKENS).map(|chunk| self.convert(chunk)).collect()
    }

    fn sum<T: ArgValue>(&self, values: &[String]) -> Result<T, ParseError> {
        let mut values = self.convert_all::<T>(values)?.into_iter();
        let first = values
            .next()
            .ok_or_else(|| ParseError::conversion(self.name, "nothing to sum"))?;
        values.try_fold(first, |acc, v| {
            acc.add(v).map_err(|e| ParseError::conversion(self.name, e))
        })
    }

    fn joined<T: ArgValue>(&self, values: &[String]) -> Result<T, ParseError> {
        let joined = values.join("\n");
        T::parse_arg(&joined).map_err(|e| {
            ParseError::conversion(self.name, format!("could not convert joined value to {}: {e}", T::TYPE_NAME))
        })
    }
}

/// Converts processed values and delivers them.
pub(crate) trait Bind {
    fn bind(&mut self, input: &BindInput<'_>) -> Result<(), ParseError>;
}

/// One value of type `T`.
pub(crate) struct Scalar<T>(pub(crate) Sink<T>);

impl<T: ArgValue> Bind for Scalar<T> {
    fn bind(&mut self, input: &BindInput<'_>) -> Result<(), ParseError> {
        let values = input.values();
        let value = match input.policy {
            MultiOptionPolicy::Throw if values.len() > input.keep => {
                return Err(ParseError::mismatch(
                    input.name,
                    format!("expected {} value(s), got {}", input.keep, values.len()),
                ));
            }
            MultiOptionPolicy::Join => input.joined(&values)?,
            MultiOptionPolicy::Sum => input.sum(&values)?,
            _ => input.convert(trim(&values, input.policy, input.keep))?,
        };
        self.0.deliver(value)
    }
}

/// Every value, in order. Only `TakeFirst` / `TakeLast` narrow it down.
pub(crate) struct Container<T>(pub(crate) Sink<Vec<T>>);

impl<T: ArgValue> Bind for Container<T> {
    fn bind(&mut self, input: &BindInput<'_>) -> Result<(), ParseError> {
        let values = input.convert_all(&input.selected())?;
        self.0.deliver(values)
    }
}

/// Flag dispositions folded into a bool or integer.
pub(crate) struct Flag<T>(pub(crate) Sink<T>);

impl<T: FlagValue> Bind for Flag<T> {
    fn bind(&mut self, input: &BindInput<'_>) -> Result<(), ParseError> {
        let values = input
            .groups
            .iter()
            .flatten()
            .map(String::as_str)
            .map(flag_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ParseError::conversion(input.name, e))?;
        let value = T::from_flag_values(&values, input.policy)
            .map_err(|e| ParseError::conversion(input.name, e))?;
        self.0.deliver(value)
    }
}

/// Hands the raw token list to a custom assembler.
pub(crate) struct Raw(pub(crate) Box<dyn FnMut(&[String]) -> Result<(), ParseError>>);

impl Bind for Raw {
    fn bind(&mut self, input: &BindInput<'_>) -> Result<(), ParseError> {
        (self.0)(&input.selected())
    }
}
