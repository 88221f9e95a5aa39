//! Per-command name table mapping spelled names to options.
//!
//! Entries keep registration order, which decides precedence when the
//! windows-style view merges short and long names.

use crate::classifier::{valid_first_char, valid_name_string};
use crate::error::ParseError;
use crate::option::OptionId;

/// How a name is spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// `-x`
    Short,
    /// `--name`
    Long,
    /// Bare name, matched by position.
    Positional,
}

/// One declared name of an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionName {
    name: String,
    kind: NameKind,
    flag_default: Option<String>,
}

impl OptionName {
    /// The bare name, without dashes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NameKind {
        self.kind
    }

    /// Value recorded when a flag is matched through this name without an
    /// attached value. `Some("false")` marks a negated name.
    pub fn flag_default(&self) -> Option<&str> {
        self.flag_default.as_deref()
    }

    pub fn is_negated(&self) -> bool {
        self.flag_default.as_deref() == Some("false")
    }

    /// The name as typed on a command line.
    pub fn spelled(&self) -> String {
        match self.kind {
            NameKind::Short => format!("-{}", self.name),
            NameKind::Long => format!("--{}", self.name),
            NameKind::Positional => self.name.clone(),
        }
    }
}

/// Parse a comma-separated name list such as `-c,--count,!--no-count`.
///
/// A leading `!` or a trailing `{false}` negates a name; any other
/// `{value}` suffix sets the value recorded when the flag matches.
pub fn parse_names(spec: &str) -> Result<Vec<OptionName>, ParseError> {
    let mut names = Vec::new();

    for piece in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (body, mut flag_default) = match piece.strip_prefix('!') {
            Some(rest) => (rest, Some("false".to_string())),
            None => (piece, None),
        };

        let body = match body.split_once('{') {
            Some((head, tail)) => {
                let value = tail.strip_suffix('}').ok_or_else(|| {
                    ParseError::construction(piece, "unterminated default flag value")
                })?;
                if flag_default.is_some() {
                    return Err(ParseError::construction(piece, "name is negated twice"));
                }
                flag_default = Some(value.to_string());
                head
            }
            None => body,
        };

        let (name, kind) = if let Some(long) = body.strip_prefix("--") {
            (long, NameKind::Long)
        } else if let Some(short) = body.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if valid_first_char(c) => (short, NameKind::Short),
                _ => {
                    return Err(ParseError::construction(
                        piece,
                        "short names must be a single valid character",
                    ))
                }
            }
        } else {
            (body, NameKind::Positional)
        };

        if !valid_name_string(name) && kind != NameKind::Short {
            return Err(ParseError::construction(piece, "invalid name"));
        }
        if kind == NameKind::Positional && flag_default.is_some() {
            return Err(ParseError::construction(piece, "positional names cannot carry flag values"));
        }

        names.push(OptionName {
            name: name.to_string(),
            kind,
            flag_default,
        });
    }

    if names.is_empty() {
        return Err(ParseError::construction(spec, "an option needs at least one name"));
    }
    if names.iter().filter(|n| n.kind == NameKind::Positional).count() > 1 {
        return Err(ParseError::construction(spec, "only one positional name is allowed"));
    }
    Ok(names)
}

/// Case and underscore sensitivity for name comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NameMatch {
    pub(crate) ignore_case: bool,
    pub(crate) ignore_underscore: bool,
}

impl NameMatch {
    pub(crate) fn normalize(&self, s: &str) -> String {
        let mut out: String = if self.ignore_underscore {
            s.chars().filter(|c| *c != '_').collect()
        } else {
            s.to_string()
        };
        if self.ignore_case {
            out = out.to_lowercase();
        }
        out
    }

    pub(crate) fn same(&self, a: &str, b: &str) -> bool {
        if !self.ignore_case && !self.ignore_underscore {
            return a == b;
        }
        self.normalize(a) == self.normalize(b)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    kind: NameKind,
    id: OptionId,
    slot: usize,
}

/// Ordered name table of one command.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameTable {
    entries: Vec<Entry>,
}

impl NameTable {
    /// Fail if any of `names` is already taken.
    pub(crate) fn check_free(&self, names: &[OptionName], matcher: NameMatch) -> Result<(), ParseError> {
        for name in names {
            if self.find(name.kind, &name.name, matcher).is_some() {
                return Err(ParseError::construction(name.spelled(), "option already added"));
            }
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, id: OptionId, names: &[OptionName]) {
        for (slot, name) in names.iter().enumerate() {
            self.entries.push(Entry {
                name: name.name.clone(),
                kind: name.kind,
                id,
                slot,
            });
        }
    }

    /// Find by kind; short names always compare exactly.
    pub(crate) fn find(&self, kind: NameKind, name: &str, matcher: NameMatch) -> Option<(OptionId, usize)> {
        self.entries
            .iter()
            .find(|e| e.kind == kind && Self::matches(e, name, matcher))
            .map(|e| (e.id, e.slot))
    }

    /// Merged short+long view; the earliest registration wins.
    pub(crate) fn find_windows(&self, name: &str, matcher: NameMatch) -> Option<(OptionId, usize)> {
        self.entries
            .iter()
            .find(|e| e.kind != NameKind::Positional && Self::matches(e, name, matcher))
            .map(|e| (e.id, e.slot))
    }

    /// Resolve a name as spelled by a caller: `-c`, `--count` or `posit`.
    /// A bare name falls back to a long name of the same spelling.
    pub(crate) fn lookup(&self, spelled: &str, matcher: NameMatch) -> Option<OptionId> {
        let found = if let Some(long) = spelled.strip_prefix("--") {
            self.find(NameKind::Long, long, matcher)
        } else if let Some(short) = spelled.strip_prefix('-') {
            self.find(NameKind::Short, short, matcher)
        } else {
            self.find(NameKind::Positional, spelled, matcher)
                .or_else(|| self.find(NameKind::Long, spelled, matcher))
        };
        found.map(|(id, _)| id)
    }

    pub(crate) fn remove(&mut self, id: OptionId) {
        self.entries.retain(|e| e.id != id);
    }

    fn matches(entry: &Entry, name: &str, matcher: NameMatch) -> bool {
        match entry.kind {
            NameKind::Short => entry.name == name,
            NameKind::Long | NameKind::Positional => matcher.same(&entry.name, name),
        }
    }
}
