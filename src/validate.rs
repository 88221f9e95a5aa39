//! Value checks and transforms applied before conversion.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::registry::NameMatch;
use crate::value::ArgValue;

/// A set of allowed values that can change between parses.
pub type SharedSet = Arc<RwLock<BTreeSet<String>>>;

/// Build a [`SharedSet`] from any list of strings.
pub fn shared_set<I, S>(items: I) -> SharedSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(RwLock::new(items.into_iter().map(Into::into).collect()))
}

/// How a failed check is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckKind {
    /// Reported as a validation error.
    Check,
    /// Reported as a conversion error: the text is not one of the choices.
    Membership,
}

type CheckFn = dyn Fn(&mut String) -> Result<(), String> + Send + Sync;

/// A named check that may also rewrite the value it inspects.
#[derive(Clone)]
pub struct Validator {
    name: String,
    kind: CheckKind,
    func: Arc<CheckFn>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// Read-only check; the error text becomes the validation message.
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: CheckKind::Check,
            func: Arc::new(move |value: &mut String| check(value)),
        }
    }

    /// Replace the value with the closure's output.
    pub fn transform<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: CheckKind::Check,
            func: Arc::new(move |value: &mut String| {
                *value = transform(value)?;
                Ok(())
            }),
        }
    }

    /// Inclusive numeric range. Values that do not parse fail too.
    pub fn range<T>(min: T, max: T) -> Self
    where
        T: ArgValue + PartialOrd + fmt::Display + Send + Sync,
    {
        let name = format!("RANGE({min} - {max})");
        Self::new(name, move |value| match T::parse_arg(value) {
            Ok(v) if v >= min && v <= max => Ok(()),
            Ok(_) => Err(format!("Value {value} not in range {min} to {max}")),
            Err(_) => Err(format!("Value {value} could not be converted")),
        })
    }

    pub fn existing_file() -> Self {
        Self::new("FILE", |value| {
            let path = Path::new(value);
            if !path.exists() {
                Err(format!("File does not exist: {value}"))
            } else if path.is_dir() {
                Err(format!("File is actually a directory: {value}"))
            } else {
                Ok(())
            }
        })
    }

    pub fn existing_directory() -> Self {
        Self::new("DIR", |value| {
            let path = Path::new(value);
            if !path.exists() {
                Err(format!("Directory does not exist: {value}"))
            } else if !path.is_dir() {
                Err(format!("Directory is actually a file: {value}"))
            } else {
                Ok(())
            }
        })
    }

    pub fn existing_path() -> Self {
        Self::new("PATH(existing)", |value| {
            if Path::new(value).exists() {
                Ok(())
            } else {
                Err(format!("Path does not exist: {value}"))
            }
        })
    }

    pub fn nonexistent_path() -> Self {
        Self::new("PATH(non-existing)", |value| {
            if Path::new(value).exists() {
                Err(format!("Path already exists: {value}"))
            } else {
                Ok(())
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> CheckKind {
        self.kind
    }

    pub(crate) fn apply(&self, value: &mut String) -> Result<(), String> {
        (self.func)(value)
    }
}

#[derive(Debug, Clone)]
enum Members {
    Fixed(Vec<String>),
    Shared(SharedSet),
}

/// Restricts a value to a set of choices.
///
/// A matching value is rewritten to the set's own spelling, so with
/// `ignore_case` the input `ONE` lands as `one`.
#[derive(Debug, Clone)]
pub struct IsMember {
    members: Members,
    matcher: NameMatch,
}

impl IsMember {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: Members::Fixed(items.into_iter().map(Into::into).collect()),
            matcher: NameMatch::default(),
        }
    }

    /// Check against the set's contents at parse time, not at declaration.
    pub fn shared(set: &SharedSet) -> Self {
        Self {
            members: Members::Shared(Arc::clone(set)),
            matcher: NameMatch::default(),
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.matcher.ignore_case = true;
        self
    }

    pub fn ignore_underscore(mut self) -> Self {
        self.matcher.ignore_underscore = true;
        self
    }

    fn canonical(&self, value: &str) -> Result<String, String> {
        let found = match &self.members {
            Members::Fixed(items) => items.iter().find(|i| self.matcher.same(i, value)).cloned(),
            Members::Shared(set) => set.read().iter().find(|i| self.matcher.same(i, value)).cloned(),
        };
        found.ok_or_else(|| format!("{value} not in {{{}}}", self.listing()))
    }

    fn listing(&self) -> String {
        match &self.members {
            Members::Fixed(items) => items.join(","),
            Members::Shared(set) => set.read().iter().cloned().collect::<Vec<_>>().join(","),
        }
    }
}

impl From<IsMember> for Validator {
    fn from(member: IsMember) -> Self {
        Validator {
            name: format!("{{{}}}", member.listing()),
            kind: CheckKind::Membership,
            func: Arc::new(move |value: &mut String| {
                *value = member.canonical(value)?;
                Ok(())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(validator: &Validator, input: &str) -> Result<String, String> {
        let mut value = input.to_string();
        validator.apply(&mut value).map(|_| value)
    }

    #[test]
    fn range_is_inclusive() {
        let v = Validator::range(3, 6);
        assert!(run(&v, "3").is_ok());
        assert!(run(&v, "6").is_ok());
        assert!(run(&v, "7").is_err());
        assert!(run(&v, "x").unwrap_err().contains("could not be converted"));
        assert_eq!(v.kind(), CheckKind::Check);
    }

    #[test]
    fn membership_canonicalizes() {
        let v: Validator = IsMember::new(["one", "Two_Three"]).ignore_case().ignore_underscore().into();
        assert_eq!(run(&v, "ONE"), Ok("one".to_string()));
        assert_eq!(run(&v, "twothree"), Ok("Two_Three".to_string()));
        assert!(run(&v, "four").is_err());
        assert_eq!(v.kind(), CheckKind::Membership);
    }

    #[test]
    fn shared_set_is_read_at_check_time() {
        let set = shared_set(["a"]);
        let v: Validator = IsMember::shared(&set).into();
        assert!(run(&v, "b").is_err());
        set.write().insert("b".to_string());
        assert!(run(&v, "b").is_ok());
    }

    #[test]
    fn path_checks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("present.txt");
        std::fs::write(&file, "x").unwrap();
        let missing = dir.path().join("missing.txt");
        let dir_str = dir.path().to_string_lossy().to_string();
        let file_str = file.to_string_lossy().to_string();
        let missing_str = missing.to_string_lossy().to_string();

        assert!(run(&Validator::existing_file(), &file_str).is_ok());
        assert!(run(&Validator::existing_file(), &dir_str).is_err());
        assert!(run(&Validator::existing_directory(), &dir_str).is_ok());
        assert!(run(&Validator::existing_directory(), &file_str).is_err());
        assert!(run(&Validator::existing_path(), &missing_str).is_err());
        assert!(run(&Validator::nonexistent_path(), &missing_str).is_ok());
        assert!(run(&Validator::nonexistent_path(), &file_str).is_err());
    }

    #[test]
    fn transform_rewrites() {
        let v = Validator::transform("upper", |s| Ok(s.to_uppercase()));
        assert_eq!(run(&v, "abc"), Ok("ABC".to_string()));
        assert_eq!(v.name(), "upper");
    }
}
