mod common;

use common::*;
use rstest::rstest;
use treepath::{CallCtx, ContextSettings, Error, Node, Value};

#[test]
fn last_selects_the_final_node() {
    let xml = "<root><a>a</a><a>b</a></root>";
    assert_eq!(xml_string("/root/a[last()]", xml), "b");
}

#[test]
fn position_is_one_based() {
    let xml = "<root><a>a</a><a>b</a><a>c</a></root>";
    assert_eq!(xml_string("/root/a[position() = 2]", xml), "b");
}

#[test]
fn count_counts_nodes() {
    let xml = "<root><a>a</a><a>b</a><a>c</a></root>";
    assert_eq!(xml_string("count(/root/a)", xml), "3");
}

#[rstest]
#[case::step("/root/local-name()")]
#[case::argument("local-name(/root)")]
fn local_name_of_element(#[case] expr: &str) {
    assert_eq!(xml_string(expr, "<root></root>"), "root");
}

#[rstest]
#[case::step("/*/namespace-uri()")]
#[case::argument("namespace-uri(/*)")]
fn namespace_uri_of_element(#[case] expr: &str) {
    assert_eq!(
        xml_string(expr, r#"<root xmlns="http://foo"></root>"#),
        "http://foo"
    );
}

#[test]
fn name_spells_out_non_empty_namespaces() {
    assert_eq!(xml_string("name(/*)", "<root></root>"), "root");
    assert_eq!(
        xml_string("name(/*)", r#"<root xmlns="http://foo"></root>"#),
        "{http://foo}root"
    );
}

#[rstest]
#[case::argument("string(/root)")]
#[case::step("/root/string()")]
fn string_of_nodeset(#[case] expr: &str) {
    assert_eq!(xml_string(expr, "<root>1</root>"), "1");
}

#[test]
fn concat_joins_all_arguments() {
    assert_eq!(xml_string("concat('foo', 'bar')", "<r/>"), "foobar");
    assert_eq!(xml_string("concat('a', 'b', 'c', 'd')", "<r/>"), "abcd");
}

#[rstest]
#[case::prefix("starts-with('abcd', 'ab')", true)]
#[case::not_prefix("starts-with('abcd', 'b')", false)]
#[case::inside("contains('abcd', 'bc')", true)]
#[case::missing("contains('abcd', 'z')", false)]
fn string_predicates(#[case] expr: &str, #[case] expected: bool) {
    assert_eq!(xml_value(expr, "<r/>"), Value::Boolean(expected));
}

#[rstest]
#[case::before(r#"substring-before("1999/04/01","/")"#, "1999")]
#[case::before_missing(r#"substring-before("1999/04/01","2")"#, "")]
#[case::after(r#"substring-after("1999/04/01","/")"#, "04/01")]
#[case::after_prefix(r#"substring-after("1999/04/01","19")"#, "99/04/01")]
#[case::after_missing(r#"substring-after("1999/04/01","a")"#, "")]
fn substring_before_and_after(#[case] expr: &str, #[case] expected: &str) {
    assert_eq!(xml_string(expr, "<r/>"), expected);
}

#[rstest]
#[case::plain(r#"substring("12345", 2, 3)"#, "234")]
#[case::to_end(r#"substring("12345", 2)"#, "2345")]
#[case::negative_start(r#"substring('abcd', -2, 5)"#, "ab")]
#[case::zero_start(r#"substring('abcd', 0)"#, "abcd")]
#[case::full(r#"substring('abcd', 1, 4)"#, "abcd")]
#[case::rounding(r#"substring("12345", 1.5, 2.6)"#, "234")]
#[case::nan_start(r#"substring("12345", 0 div 0, 3)"#, "")]
#[case::nan_length(r#"substring("12345", 1, 0 div 0)"#, "")]
#[case::infinite_length(r#"substring("12345", -42, 1 div 0)"#, "12345")]
#[case::infinite_both(r#"substring("12345", -1 div 0, 1 div 0)"#, "")]
fn substring_corner_cases(#[case] expr: &str, #[case] expected: &str) {
    assert_eq!(xml_string(expr, "<r/>"), expected);
}

#[rstest]
#[case::argument("string-length(/root)")]
#[case::step("/root/string-length()")]
fn string_length(#[case] expr: &str) {
    assert_eq!(xml_string(expr, "<root>1234</root>"), "4");
}

#[rstest]
#[case::argument("normalize-space(/root)")]
#[case::step("/root/normalize-space()")]
fn normalize_space(#[case] expr: &str) {
    assert_eq!(xml_string(expr, "<root>  12  34   </root>"), "12 34");
}

#[rstest]
#[case::mapping(r#"translate("bar","abc","ABC")"#, "BAr")]
#[case::removal(r#"translate("--aaa--","abc-","ABC")"#, "AAA")]
fn translate(#[case] expr: &str, #[case] expected: &str) {
    assert_eq!(xml_string(expr, "<r/>"), expected);
}

#[rstest]
#[case::not_true("not(1)", false)]
#[case::not_false("not(0)", true)]
#[case::truth("true()", true)]
#[case::falsity("false()", false)]
#[case::boolean_of_string("boolean('x')", true)]
#[case::boolean_of_empty("boolean('')", false)]
fn boolean_family(#[case] expr: &str, #[case] expected: bool) {
    assert_eq!(xml_value(expr, "<r/>"), Value::Boolean(expected));
}

#[rstest]
#[case::base_language("count(//p[lang('en')])", "3")]
#[case::text_nodes("count(//text()[lang('en-GB')])", "1")]
#[case::exact("count(//p[lang('en-US')])", "1")]
#[case::other_language("count(//p[lang('de')])", "0")]
#[case::undeclared("count(/p1[lang('en')])", "0")]
fn lang_matches_ancestor_declarations(#[case] expr: &str, #[case] expected: &str) {
    let xml = r#"<p1><p xml:lang="en">I went up a floor.</p><p xml:lang="en-GB">I took the lift.</p><p xml:lang="en-US">I rode the elevator.</p></p1>"#;
    assert_eq!(xml_string(expr, xml), expected);
}

#[rstest]
#[case::argument("number(/root)")]
#[case::step("/root/number()")]
fn number_of_nodeset(#[case] expr: &str) {
    assert_eq!(xml_value(expr, "<root>1234</root>"), Value::Number(1234.0));
}

#[test]
fn sum_adds_node_values() {
    let xml = "<root><a>1</a><a>2</a><a>3</a></root>";
    assert_eq!(xml_value("sum(/root/a)", xml), Value::Number(6.0));
}

#[rstest]
#[case::floor("floor(2.2)", 2.0)]
#[case::ceiling("ceiling(2.2)", 3.0)]
#[case::round_up("round(1.5)", 2.0)]
#[case::round_negative_tie("round(-1.5)", -1.0)]
#[case::round_zero("round(0)", 0.0)]
fn rounding_family(#[case] expr: &str, #[case] expected: f64) {
    assert_eq!(xml_value(expr, "<r/>"), Value::Number(expected));
}

#[test]
fn custom_functions_resolve_before_builtins() {
    let xml = "<root><a>5</a><b>2.5</b><c>6</c></root>";
    let settings = ContextSettings::new()
        .with_namespace("foo", "http://root")
        .with_function("http://root", "bar", |_ctx: &CallCtx<'_>, _args: &[Value]| {
            Ok(Value::Number(2.5))
        });
    let nodes = xml_nodes("//*[. = foo:bar()]", xml, &settings);
    assert_eq!(local_names(&nodes), ["b"]);
}

#[test]
fn custom_functions_see_the_call_context() {
    let xml = "<root><a>This is an element.</a><!--This is a comment.--></root>";
    let settings = ContextSettings::new().with_function(
        "",
        "is-comment",
        |ctx: &CallCtx<'_>, _args: &[Value]| {
            let is_comment = ctx
                .result()
                .as_nodes()
                .and_then(|ns| ns.first())
                .is_some_and(|c| matches!(c.node(), Node::Comment(_)));
            Ok(Value::Boolean(is_comment))
        },
    );
    let result = query_xml("//node()[is-comment()]", xml, &settings);
    assert_eq!(result.string(), "This is a comment.");
}

#[test]
fn function_errors_carry_the_function_name() {
    let settings = ContextSettings::new().with_function(
        "",
        "fails",
        |_ctx: &CallCtx<'_>, _args: &[Value]| Err(Error::Source("boom".into())),
    );
    let cursor = read("<r/>");
    let err = treepath::exec(&cursor, &treepath::must_build_expr("fails()"), &settings)
        .expect_err("function error");
    assert!(matches!(err, Error::Function { .. }));
    assert!(err.to_string().contains("fails"));
}

#[test]
fn variables_resolve_through_namespace_bindings() {
    let xml = "<root><node>2.50</node><node>3.14</node><node>0.30</node></root>";
    let settings = ContextSettings::new()
        .with_namespace("ns", "http://some.namespace.com")
        .with_variable("http://some.namespace.com", "mynum", 3.14);
    let result = query_xml("//node()[. = $ns:mynum]", xml, &settings);
    assert_eq!(result.string(), "3.14");
}

#[test]
fn wrong_argument_types_are_reported() {
    let err = treepath::exec(
        &read("<r/>"),
        &treepath::must_build_expr("count('nope')"),
        &ContextSettings::new(),
    )
    .expect_err("count of scalar");
    assert!(matches!(err, Error::Function { .. }));
}
