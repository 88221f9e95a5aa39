//! Integration tests for subcommand dispatch and per-level checks.

use argmatch::{App, Binding, ParseError};

fn tool() -> App {
    let mut app = App::new("tool", "");
    app.add_flag("-v,--verbose").unwrap();
    app.add_subcommand("sub1", "first").unwrap().add_flag("-q").unwrap();
    app.add_subcommand("sub2", "second").unwrap();
    app
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// DISPATCH
// =============================================================================

#[test]
fn rest_of_line_goes_to_subcommand() {
    let mut app = tool();

    app.parse(["-v", "sub1", "-q"]).unwrap();
    assert!(app.got_subcommand("sub1"));
    assert!(!app.got_subcommand("sub2"));
    assert_eq!(app.count("-v").unwrap(), 1);
    assert_eq!(app.subcommand("sub1").unwrap().count("-q").unwrap(), 1);
}

#[test]
fn reparse_clears_previous_subcommand() {
    let mut app = tool();
    app.parse(["sub1", "-q"]).unwrap();

    app.parse(["sub2"]).unwrap();
    assert_eq!(app.invoked_subcommand().unwrap().name(), "sub2");
    assert_eq!(app.subcommand("sub1").unwrap().count("-q").unwrap(), 0);

    app.parse(Vec::<String>::new()).unwrap();
    assert!(app.invoked_subcommand().is_none());
}

#[test]
fn parent_options_after_subcommand_are_extras() {
    let mut app = tool();
    match app.parse(["sub1", "-v"]) {
        Err(ParseError::Extras { extras }) => assert_eq!(extras, strings(&["-v"])),
        other => panic!("expected extras error, got {other:?}"),
    }
}

#[test]
fn program_name_is_skipped() {
    let mut app = tool();
    app.parse_argv(["tool", "-v", "sub2"]).unwrap();
    assert_eq!(app.count("--verbose").unwrap(), 1);
    assert!(app.got_subcommand("sub2"));
}

#[test]
fn ignore_case_reaches_subcommand_names() {
    let mut app = App::new("tool", "");
    app.ignore_case(true);
    app.add_subcommand("Sub", "").unwrap();

    app.parse(["SUB"]).unwrap();
    assert!(app.got_subcommand("sub"));
}

#[test]
fn parent_positional_before_subcommand() {
    let mut app = tool();
    let file = Binding::new(String::new());
    app.add_option("file", &file).unwrap();

    app.parse(["a.txt", "sub2"]).unwrap();
    assert_eq!(file.get(), "a.txt");
    assert!(app.got_subcommand("sub2"));
}

// =============================================================================
// SUBCOMMAND NAMES AS VALUES
// =============================================================================

#[test]
fn fixed_count_option_takes_subcommand_name() {
    let mut app = tool();
    let name = Binding::new(String::new());
    app.add_option("--name", &name).unwrap();

    app.parse(["--name", "sub1"]).unwrap();
    assert_eq!(name.get(), "sub1");
    assert!(app.invoked_subcommand().is_none());
}

#[test]
fn unlimited_option_stops_at_subcommand_name() {
    let mut app = tool();
    let list: Binding<Vec<String>> = Binding::default();
    app.add_option_vec("--list", &list).unwrap();

    app.parse(["--list", "a", "b", "sub1", "-q"]).unwrap();
    assert_eq!(list.get(), strings(&["a", "b"]));
    assert!(app.got_subcommand("sub1"));
}

// =============================================================================
// REQUIREMENTS AND EXTRAS PER LEVEL
// =============================================================================

#[test]
fn required_subcommand() {
    let mut app = tool();
    app.require_subcommand(true);

    let err = app.parse(["-v"]).unwrap_err();
    assert!(matches!(err, ParseError::Required { .. }));
    assert_eq!(err.to_string(), "A subcommand is required");
    app.parse(["sub2"]).unwrap();
}

#[test]
fn child_requirements_only_when_invoked() {
    let mut app = tool();
    app.subcommand_mut("sub2").unwrap().add_flag("--must").unwrap().required();

    app.parse(["sub1"]).unwrap();
    assert!(matches!(app.parse(["sub2"]), Err(ParseError::Required { .. })));
    app.parse(["sub2", "--must"]).unwrap();
}

#[test]
fn remaining_collects_every_level() {
    let mut app = App::new("tool", "");
    app.allow_extras(true);
    app.add_subcommand("sub1", "").unwrap();

    app.parse(["stray", "sub1", "other", "--x"]).unwrap();
    assert_eq!(app.extras(), strings(&["stray"]).as_slice());
    assert_eq!(app.remaining(), strings(&["stray", "other", "--x"]));
}

#[test]
fn child_can_refuse_extras() {
    let mut app = App::new("tool", "");
    app.allow_extras(true);
    app.add_subcommand("strict", "").unwrap().allow_extras(false);

    app.parse(["stray"]).unwrap();
    match app.parse(["strict", "x"]) {
        Err(ParseError::Extras { extras }) => assert_eq!(extras, strings(&["x"])),
        other => panic!("expected extras error, got {other:?}"),
    }
}

#[test]
fn parent_values_are_processed_first() {
    let log: Binding<Vec<String>> = Binding::default();
    let mut app = App::new("tool", "");

    let parent_log = log.clone();
    app.add_flag_fn("-p", move |_| {
        parent_log.with(|l| l.push("parent".to_string()));
        Ok(())
    })
    .unwrap();

    let child_log = log.clone();
    app.add_subcommand("sub1", "")
        .unwrap()
        .add_flag_fn("-c", move |_| {
            child_log.with(|l| l.push("child".to_string()));
            Ok(())
        })
        .unwrap();

    app.parse(["-p", "sub1", "-c"]).unwrap();
    assert_eq!(log.get(), strings(&["parent", "child"]));
}

#[test]
fn child_exit_stops_before_requirements() {
    let mut app = App::new("tool", "");
    app.add_flag("--needed").unwrap().required();
    app.add_subcommand("version", "")
        .unwrap()
        .add_flag_fn("--show", |_| Err(ParseError::success()))
        .unwrap();

    assert!(matches!(app.parse(["version"]), Err(ParseError::Required { .. })));
    assert_eq!(app.parse(["version", "--show"]), Err(ParseError::success()));
}
