mod common;

use common::*;
use rstest::rstest;
use treepath::{
    exec, exec_as_nodeset, exec_as_number, exec_as_string, must_build_expr, ContextSettings,
    Error,
};

#[test]
fn absolute_path_only_selects_the_root() {
    assert_eq!(
        xml_string("/", "b <root>a root node</root> c"),
        "b a root node c"
    );
}

#[test]
fn absolute_path_with_relative_step() {
    let xml = "\na root node\n<Node>node value</Node>\nother text\n";
    assert_eq!(xml_string("/ Node", xml), "node value");
}

#[rstest]
#[case::node("/Root/node", "a")]
#[case::attribute_named_element("/Root/attribute", "c")]
fn relative_location_path(#[case] expr: &str, #[case] expected: &str) {
    let xml = "\ntext\n<Root>text2\n<node>a</node>\n<node>b</node>\n<attribute>c</attribute>\ntext3\n</Root>\ntext4\n";
    assert_eq!(xml_string(expr, xml), expected);
}

#[test]
fn numeric_predicate_selects_by_position() {
    let xml = "\ntext\n<Root>text2\n<Node>a</Node>\n<Node>b</Node>\ntext3\n</Root>\ntext4\n";
    assert_eq!(xml_string("/Root/Node[2]", xml), "b");
}

#[test]
fn union_merges_in_document_order() {
    let xml = "<Root><Node>a</Node><Node>b</Node></Root>";
    let nodes = xml_nodes(
        "/Root/Node[2] | / Root/ Node [ 1 ]",
        xml,
        &ContextSettings::new(),
    );
    assert_eq!(string_values(&nodes), ["a", "b"]);
}

#[test]
fn union_drops_duplicates() {
    let xml = "<Root><Node>a</Node><Node>b</Node></Root>";
    let nodes = xml_nodes(
        "/Root/Node[1] | /Root/Node[1]",
        xml,
        &ContextSettings::new(),
    );
    assert_eq!(nodes.len(), 1);
    assert_eq!(string_values(&nodes), ["a"]);
}

#[test]
fn kind_tests_match_node_kinds() {
    assert_eq!(
        xml_string("/root/node ( ) ", "<root>foo<node>bar</node></root>"),
        "foo"
    );

    let xml = "<!--some comment-->\n<comment>node</comment>";
    assert_eq!(xml_string("/comment ( ) ", xml), "some comment");
    assert_eq!(xml_string("/comment", xml), "node");

    let xml = "<?foo bar?>\n<processing-instruction>proc</processing-instruction>\n<?eggs spam?>";
    assert_eq!(xml_string("/processing-instruction ( ) ", xml), "bar");
    assert_eq!(xml_string("/processing-instruction ( 'eggs' ) ", xml), "spam");
    assert_eq!(xml_string("/processing-instruction", xml), "proc");

    let xml = "some text<text>other text</text>";
    assert_eq!(xml_string("/text ( ) ", xml), "some text");
    assert_eq!(xml_string("/text", xml), "other text");
}

#[test]
fn star_matches_any_element() {
    assert_eq!(
        xml_string("/root/*", "<root>root text<data>data text</data></root>"),
        "data text"
    );
}

#[test]
fn abbreviated_absolute_path_walks_all_descendants() {
    let xml = "<root><a>a</a><a>b</a></root>";
    let nodes = xml_nodes("//a", xml, &ContextSettings::new());
    assert_eq!(string_values(&nodes), ["a", "b"]);
}

#[test]
fn abbreviated_relative_path_scopes_to_its_left_side() {
    let xml = "<root><foo><a>a</a><a>b</a><b>z<a>c</a>z</b></foo><bar><a>d</a></bar><a>e</a></root>";
    let nodes = xml_nodes("/root/foo//a", xml, &ContextSettings::new());
    assert_eq!(string_values(&nodes), ["a", "b", "c"]);
}

#[test]
fn descendant_or_self_spelling_equals_abbreviation() {
    let cursor = read("<root><foo><a>a</a></foo><a>b</a></root>");
    let settings = ContextSettings::new();
    let long = exec_as_nodeset(
        &cursor,
        &must_build_expr("/descendant-or-self::node()/a"),
        &settings,
    )
    .expect("long form");
    let short = exec_as_nodeset(&cursor, &must_build_expr("//a"), &settings).expect("short form");
    assert_eq!(long, short);
    assert_eq!(string_values(&long), ["a", "b"]);
}

#[test]
fn function_calls_work_as_steps() {
    assert_eq!(xml_string("/root/string()", "<root>1</root>"), "1");
    assert_eq!(xml_string("/root/local-name()", "<root/>"), "root");
}

#[test]
fn filter_expressions_take_predicates_and_paths() {
    let xml = "<root><a><b>1</b></a><a><b>2</b></a></root>";
    let nodes = xml_nodes("(//a)[2]/b", xml, &ContextSettings::new());
    assert_eq!(string_values(&nodes), ["2"]);
}

#[test]
fn context_can_be_overridden_through_settings() {
    let cursor = read("<root><a>5</a><b>2.5</b><c>6</c></root>");
    let start = cursor.children()[0].clone();
    let settings = ContextSettings::new().with_context(start);
    let result = exec(&cursor, &must_build_expr("a[1]"), &settings).expect("exec");
    assert_eq!(result.string(), "5");
}

#[test]
fn subqueries_run_from_any_cursor() {
    let xml = "<root><a><b>Some text. <c>A descendant c element.</c></b></a><a><d>A d element.</d><c>A c element.</c></a></root>";
    let cursor = read(xml);
    let settings = ContextSettings::new();
    let a_elements =
        exec_as_nodeset(&cursor, &must_build_expr("/root/a"), &settings).expect("a nodes");
    let sub = must_build_expr(".//c");
    let found: Vec<String> = a_elements
        .iter()
        .map(|a| exec_as_string(a, &sub, &settings).expect("subquery"))
        .collect();
    assert_eq!(found, ["A descendant c element.", "A c element."]);
}

#[test]
fn exec_as_number_reads_the_first_node() {
    let cursor = read("<root><a>3.14</a><a>9001</a></root>");
    let n = exec_as_number(&cursor, &must_build_expr("/root/a"), &ContextSettings::new())
        .expect("number");
    assert_eq!(n, 3.14);
}

#[test]
fn exec_as_nodeset_rejects_scalar_results() {
    let cursor = read("<root/>");
    let err = exec_as_nodeset(&cursor, &must_build_expr("1+1"), &ContextSettings::new())
        .expect_err("scalar");
    assert!(matches!(err, Error::Type(_)));
}

#[test]
fn paths_over_scalars_are_type_errors() {
    let cursor = read("<root/>");
    let err = exec(
        &cursor,
        &must_build_expr("'scalar'/child"),
        &ContextSettings::new(),
    )
    .expect_err("path over scalar");
    assert!(matches!(err, Error::Type(_)));
}

#[test]
fn nodeset_results_are_sorted_and_unique() {
    let xml = "<root><a><b/></a><a><b/></a></root>";
    let nodes = xml_nodes("//b | //a | /root//b", xml, &ContextSettings::new());
    let positions: Vec<usize> = nodes.iter().map(treepath::Cursor::pos).collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(positions, sorted);
    assert_eq!(nodes.len(), 4);
}
