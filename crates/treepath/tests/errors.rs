mod common;

use common::*;
use rstest::rstest;
use treepath::{
    build_expr, exec, must_build_expr, read_xml, ContextSettings, Error, XmlOptions,
};

#[rstest]
#[case::empty("")]
#[case::dangling_operator("1 +")]
#[case::unclosed_call("foo(")]
#[case::unclosed_predicate("a[")]
#[case::bare_at("@")]
#[case::bare_dollar("$")]
#[case::trailing_slash("/root/")]
fn malformed_expressions(#[case] expr: &str) {
    assert!(matches!(build_expr(expr), Err(Error::Syntax(_))));
}

#[test]
fn unbound_variables_are_reported() {
    let err = exec(
        &read("<r/>"),
        &must_build_expr("$nope"),
        &ContextSettings::new(),
    )
    .expect_err("unbound variable");
    assert!(matches!(err, Error::UnboundVariable(_)));
}

#[test]
fn unknown_functions_are_reported() {
    let err = exec(
        &read("<r/>"),
        &must_build_expr("no-such-function()"),
        &ContextSettings::new(),
    )
    .expect_err("unknown function");
    assert!(matches!(err, Error::UnboundFunction(_)));
}

#[test]
fn unknown_prefix_on_variables_is_a_namespace_error() {
    let err = exec(
        &read("<r/>"),
        &must_build_expr("$nope:var"),
        &ContextSettings::new(),
    )
    .expect_err("unknown prefix");
    assert!(matches!(err, Error::Namespace(_)));
}

#[test]
fn unknown_prefix_on_wildcard_tests_is_a_namespace_error() {
    let err = exec(
        &read("<r/>"),
        &must_build_expr("//nope:*"),
        &ContextSettings::new(),
    )
    .expect_err("unknown prefix");
    assert!(matches!(err, Error::Namespace(_)));
}

#[rstest]
#[case::scalar_union("1 | 2")]
#[case::half_scalar_union("//a | 'b'")]
fn union_requires_node_sets(#[case] expr: &str) {
    let err = exec(&read("<r/>"), &must_build_expr(expr), &ContextSettings::new())
        .expect_err("union of scalars");
    assert!(matches!(err, Error::Type(_)));
}

#[test]
fn strict_xml_rejects_mismatched_tags() {
    let err = read_xml("<a><b></a>".as_bytes(), XmlOptions::default()).expect_err("mismatch");
    assert!(matches!(err, Error::Source(_)));
}

#[test]
fn lenient_xml_accepts_mismatched_tags() {
    read_xml("<a><b></a>".as_bytes(), XmlOptions::lenient()).expect("lenient parse");
}

#[test]
fn arithmetic_edge_cases_are_values_not_errors() {
    for expr in ["0 div 0", "1 div 0", "4 mod 0", "number('x')"] {
        query_xml(expr, "<r/>", &ContextSettings::new());
    }
}
