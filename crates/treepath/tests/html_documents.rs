mod common;

use common::*;
use treepath::Node;

const PAGE: &str = r#"
<!DOCTYPE html>
<html lang=en xmlns:svg="http://www.w3.org/2000/svg">
<head><meta charset="utf-8"><title>html title</title></head><body>
<br/>
<p>content</p>
<svg:svg height="110" xmlns="http://www.w3.org/2000/svg">
  <rect width="300" style="fill:rgb(0,0,255)" xlink:href="http://example.com" />
</svg>
</body>
</html>
"#;

#[test]
fn elements_parse_into_a_navigable_tree() {
    let nodes = html_nodes("/html/body/p", PAGE);
    assert_eq!(string_values(&nodes), ["content"]);
}

#[test]
fn xmlns_attributes_are_dropped_and_values_unquoted() {
    let nodes = html_nodes("/html/@*", PAGE);
    assert_eq!(nodes.len(), 1);
    match nodes[0].node() {
        Node::Attribute { name, value } => {
            assert_eq!(name.local, "lang");
            assert_eq!(value, "en");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn name_prefixes_are_stripped() {
    let nodes = html_nodes("/html/body/svg", PAGE);
    assert_eq!(local_names(&nodes), ["svg"]);

    let nodes = html_nodes("/html/body/svg/rect/@href", PAGE);
    assert_eq!(string_values(&nodes), ["http://example.com"]);
}

#[test]
fn void_elements_do_not_swallow_siblings() {
    let nodes = html_nodes("/html/head/title", PAGE);
    assert_eq!(string_values(&nodes), ["html title"]);
}

#[test]
fn truncated_documents_still_build() {
    let nodes = html_nodes("/div/p", "<div><p>one<p>two");
    // The tolerant parser nests the unclosed <p>, so only the first is a
    // direct child of <div>.
    assert_eq!(string_values(&nodes), ["onetwo"]);
}

#[test]
fn entities_fall_back_to_raw_text() {
    let nodes = html_nodes("/p", "<p>a &amp; b &nope; c</p>");
    assert_eq!(string_values(&nodes), ["a & b &nope; c"]);
}
