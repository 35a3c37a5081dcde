use super::*;
use std::path::Path;

/// A fatal missing-include diagnostic resolves `<stdin>` to the source hint
/// and keeps the caret lines and trailing summary as the body.
#[test]
fn fatal_file_not_found() {
    let raw = "<stdin>:2:10: fatal error: 'bpf/bpf_helpers.hh' file not found\n\
               #include <bpf/bpf_helpers.hh>\n\
               \u{20}        ^~~~~~~~~~~~~~~~~~~~\n\
               1 error generated.\n";
    let report = parse(raw, Path::new("/file.c"));
    assert_eq!(report.files.len(), 1);
    let group = &report.files[0];
    assert_eq!(group.file, Path::new("/file.c"));
    assert_eq!(group.errors.len(), 1);

    let error = &group.errors[0];
    assert_eq!(error.line, 2);
    assert_eq!(error.column, 10);
    assert_eq!(
        error.header,
        "fatal error: 'bpf/bpf_helpers.hh' file not found"
    );
    assert_eq!(
        error.body,
        "#include <bpf/bpf_helpers.hh>\n         ^~~~~~~~~~~~~~~~~~~~\n1 error generated."
    );
    assert_eq!(error.severity, Severity::Fatal);
    assert!(error.severity.is_error());
}

#[test]
fn error_with_caret_body() {
    let raw = "<stdin>:6:12: error: expected function body after function declarator\n\
               int func() sdf;\n\
               \u{20}          ^\n\
               1 error generated.\n";
    let report = parse(raw, Path::new("a/file.c"));
    let error = &report.files[0].errors[0];
    assert_eq!(error.file, Path::new("a/file.c"));
    assert_eq!(error.line, 6);
    assert_eq!(error.column, 12);
    assert_eq!(
        error.header,
        "error: expected function body after function declarator"
    );
    assert_eq!(error.severity, Severity::Error);
}

/// A message whose text itself contains colons still splits at the location
/// fields only.
#[test]
fn header_message_may_contain_colons() {
    let raw = "<stdin>:7:12: error: call to undeclared function 'int2'; ISO C99 and later do not support implicit function declarations [-Wimplicit-function-declaration]\n\
               \u{20}   return int2();\n\
               \u{20}          ^\n";
    let report = parse(raw, Path::new("a/file.c"));
    let error = &report.files[0].errors[0];
    assert_eq!(error.line, 7);
    assert_eq!(error.column, 12);
    assert!(error.header.starts_with("error: call to undeclared function 'int2'"));
    assert_eq!(error.body, "    return int2();\n           ^");
}

/// Consecutive diagnostics against the same file stay in one group in
/// emission order; the trailing summary joins the last body.
#[test]
fn multiple_diagnostics_in_one_file() {
    let raw = "<stdin>:7:12: error: call to undeclared function 'int2'\n\
               \u{20}   return int2();\n\
               \u{20}          ^\n\
               <stdin>:10:5: error: redefinition of 'func'\n\
               int func() {\n\
               \u{20}   ^\n\
               <stdin>:6:5: note: previous definition is here\n\
               int func() {\n\
               \u{20}   ^\n\
               2 errors generated.\n";
    let report = parse(raw, Path::new("a/file.c"));
    assert_eq!(report.files.len(), 1);
    let errors = &report.files[0].errors;
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0].line, 7);
    assert_eq!(errors[1].header, "error: redefinition of 'func'");
    assert_eq!(errors[1].body, "int func() {\n    ^");
    assert_eq!(errors[2].severity, Severity::Note);
    assert!(errors[2].severity.is_note());
    assert_eq!(errors[2].body, "int func() {\n    ^\n2 errors generated.");
    assert!(report.has_errors());
}

/// Diagnostics from several files group by distinct file in first-seen
/// order, even when the compiler interleaves them.
#[test]
fn groups_by_distinct_file_in_first_seen_order() {
    let raw = "<stdin>:1:1: error: first\n\
               /usr/include/foo.h:3:2: warning: second\n\
               <stdin>:9:4: error: third\n";
    let report = parse(raw, Path::new("prog.c"));
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].file, Path::new("prog.c"));
    assert_eq!(report.files[0].errors.len(), 2);
    assert_eq!(report.files[0].errors[1].header, "error: third");
    assert_eq!(report.files[1].file, Path::new("/usr/include/foo.h"));
    assert_eq!(report.files[1].errors[0].severity, Severity::Warning);
}

/// A header immediately followed by another header has an empty body.
#[test]
fn back_to_back_headers_have_empty_bodies() {
    let raw = "<stdin>:1:1: error: one\n<stdin>:2:2: error: two\n";
    let report = parse(raw, Path::new("p.c"));
    let errors = &report.files[0].errors;
    assert_eq!(errors[0].body, "");
    assert_eq!(errors[1].body, "");
}

/// Output with no header at all becomes a single opaque note so nothing is
/// dropped.
#[test]
fn headerless_output_becomes_opaque_note() {
    let raw = "clang: error: unable to execute command\nkilled by signal 9\n";
    let report = parse(raw, Path::new("p.c"));
    assert_eq!(report.files.len(), 1);
    let note = &report.files[0].errors[0];
    assert_eq!(note.file, Path::new("p.c"));
    assert_eq!(note.line, 0);
    assert_eq!(note.column, 0);
    assert_eq!(note.header, "clang: error: unable to execute command");
    assert_eq!(note.body, "killed by signal 9");
    assert_eq!(note.severity, Severity::Note);
    assert!(!report.has_errors());
}

/// Preamble lines before the first header become an opaque note ahead of
/// the parsed diagnostics.
#[test]
fn preamble_before_first_header_is_kept() {
    let raw = "In file included from prog.c:1:\n\
               <stdin>:4:2: warning: something\n";
    let report = parse(raw, Path::new("prog.c"));
    let errors = &report.files[0].errors;
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].header, "In file included from prog.c:1:");
    assert_eq!(errors[0].line, 0);
    assert_eq!(errors[1].severity, Severity::Warning);
}

#[test]
fn empty_output_is_an_empty_report() {
    let report = parse("", Path::new("p.c"));
    assert!(report.is_empty());
    assert!(!report.has_errors());
    let blank = parse("\n\n", Path::new("p.c"));
    assert!(blank.is_empty());
}

/// A location-like line whose line or column is not numeric is body text,
/// not a header.
#[test]
fn non_numeric_position_is_not_a_header() {
    let raw = "<stdin>:1:1: error: real\nfoo.c:x:1: error: fake\n";
    let report = parse(raw, Path::new("p.c"));
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].errors[0].body, "foo.c:x:1: error: fake");
}

#[test]
fn summary_counts_and_pluralizes() {
    let raw = "<stdin>:1:1: fatal error: a\n\
               <stdin>:2:1: error: b\n\
               <stdin>:3:1: error: c\n\
               <stdin>:4:1: warning: d\n\
               <stdin>:5:1: note: e\n";
    let report = parse(raw, Path::new("p.c"));
    assert_eq!(
        report.files[0].summary(),
        "1 fatal error, 2 errors, 1 warning"
    );
}

#[test]
fn display_includes_location_and_body() {
    let raw = "<stdin>:2:10: error: bad\nint x\n";
    let report = parse(raw, Path::new("/file.c"));
    let error = &report.files[0].errors[0];
    assert_eq!(error.to_string(), "/file.c:2:10: error: bad\nint x");
    let rendered = report.files[0].to_string();
    assert!(rendered.starts_with("/file.c has problems:\nSummary: 1 error"));
}

/// Reports serialize to JSON and back without loss.
#[test]
fn json_round_trip() {
    let raw = "<stdin>:2:10: fatal error: 'bits/libc-header-start.h' file not found\nbody line\n";
    let report = parse(raw, Path::new("/file.c"));
    let json = report.to_json().unwrap();
    let back: Report = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn known_complaints_get_suggestions() {
    let raw = "<stdin>:1:1: fatal error: 'bits/libc-header-start.h' file not found\n";
    let report = parse(raw, Path::new("p.c"));
    let suggestions = suggestions_for(&report.files[0].errors[0]);
    assert_eq!(suggestions, vec!["Try to install gcc-multilib".to_string()]);

    let raw = "<stdin>:1:1: fatal error: 'bpf_helpers.h' file not found\n";
    let report = parse(raw, Path::new("p.c"));
    assert_eq!(suggestions_for(&report.files[0].errors[0]).len(), 1);

    let raw = "<stdin>:1:1: error: something else\n";
    let report = parse(raw, Path::new("p.c"));
    assert!(suggestions_for(&report.files[0].errors[0]).is_empty());
}
