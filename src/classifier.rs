//! Token classification and the name-splitting helpers.
//!
//! Classification is syntactic first: `--name` is a long option whether or
//! not `name` is registered (unknown ones end up as extras). Windows-style
//! `/name` tokens only count as options when the name is registered.

/// Kind of a token, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classifier {
    /// The literal `--`.
    Separator,
    /// `/name` or `/name:value` with a registered name.
    Windows,
    /// `--name` or `--name=value`.
    Long,
    /// `-x`, `-xyz`, `-xvalue`.
    Short,
    /// A declared subcommand name.
    Subcommand,
    /// Anything else.
    Positional,
}

/// Characters allowed to start an option name.
pub fn valid_first_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '?' || c == '@'
}

/// Characters allowed after the first one.
pub fn valid_later_char(c: char) -> bool {
    valid_first_char(c) || c.is_ascii_digit() || c == '.' || c == '-'
}

/// Check a whole name (without dashes).
pub fn valid_name_string(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if valid_first_char(first) => chars.all(valid_later_char),
        _ => false,
    }
}

/// Split `--name=value` into `("name", Some("value"))`.
pub fn split_long(token: &str) -> Option<(&str, Option<&str>)> {
    let body = token.strip_prefix("--")?;
    if !body.chars().next().is_some_and(valid_first_char) {
        return None;
    }
    match body.split_once('=') {
        Some((name, value)) => Some((name, Some(value))),
        None => Some((body, None)),
    }
}

/// Split `-xrest` into `("x", "rest")`.
pub fn split_short(token: &str) -> Option<(&str, &str)> {
    let body = token.strip_prefix('-')?;
    let first = body.chars().next()?;
    if !valid_first_char(first) {
        return None;
    }
    Some(body.split_at(first.len_utf8()))
}

/// Split `/name:value` into `("name", Some("value"))`.
pub fn split_windows(token: &str) -> Option<(&str, Option<&str>)> {
    let body = token.strip_prefix('/')?;
    if !body.chars().next().is_some_and(valid_first_char) {
        return None;
    }
    match body.split_once(':') {
        Some((name, value)) => Some((name, Some(value))),
        None => Some((body, None)),
    }
}

/// True when the token is syntactically a long or short option.
pub fn is_option_shaped(token: &str) -> bool {
    split_long(token).is_some() || split_short(token).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_splits_at_first_equals() {
        assert_eq!(split_long("--count"), Some(("count", None)));
        assert_eq!(split_long("--count=7"), Some(("count", Some("7"))));
        assert_eq!(split_long("--s=a=b"), Some(("s", Some("a=b"))));
        assert_eq!(split_long("--"), None);
        assert_eq!(split_long("---x"), None);
        assert_eq!(split_long("-t"), None);
    }

    #[test]
    fn short_takes_one_character() {
        assert_eq!(split_short("-zzyzyz"), Some(("z", "zyzyz")));
        assert_eq!(split_short("-i4"), Some(("i", "4")));
        assert_eq!(split_short("--two"), None);
        assert_eq!(split_short("-"), None);
    }

    #[test]
    fn negative_numbers_are_not_options() {
        assert!(!is_option_shaped("-7"));
        assert!(!is_option_shaped("-354.356"));
        assert!(is_option_shaped("-x"));
    }

    #[test]
    fn windows_splits_at_first_colon() {
        assert_eq!(split_windows("/string:a:b"), Some(("string", Some("a:b"))));
        assert_eq!(split_windows("/q4"), Some(("q4", None)));
        assert_eq!(split_windows("/"), None);
        assert_eq!(split_windows("-t"), None);
    }

    #[test]
    fn name_strings() {
        assert!(valid_name_string("count"));
        assert!(valid_name_string("my-opt.2"));
        assert!(!valid_name_string("2fast"));
        assert!(!valid_name_string("has space"));
        assert!(!valid_name_string(""));
    }
}
