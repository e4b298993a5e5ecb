#![allow(dead_code)]

use treepath::{
    exec, must_build_expr, read_html, read_json, read_xml, ContextSettings, Cursor, NodeSet,
    Value, XmlOptions,
};

pub fn read(xml: &str) -> Cursor {
    read_xml(xml.as_bytes(), XmlOptions::default()).expect("parse xml")
}

pub fn query_xml(expr: &str, xml: &str, settings: &ContextSettings) -> Value {
    exec(&read(xml), &must_build_expr(expr), settings).expect("exec")
}

pub fn xml_value(expr: &str, xml: &str) -> Value {
    query_xml(expr, xml, &ContextSettings::new())
}

pub fn xml_string(expr: &str, xml: &str) -> String {
    xml_value(expr, xml).string()
}

pub fn xml_nodes(expr: &str, xml: &str, settings: &ContextSettings) -> NodeSet {
    query_xml(expr, xml, settings)
        .into_nodes()
        .expect("node-set result")
}

pub fn query_json(expr: &str, json: &str) -> Value {
    let cursor = read_json(json.as_bytes()).expect("parse json");
    exec(&cursor, &must_build_expr(expr), &ContextSettings::new()).expect("exec")
}

pub fn json_nodes(expr: &str, json: &str) -> NodeSet {
    query_json(expr, json).into_nodes().expect("node-set result")
}

pub fn query_html(expr: &str, html: &str) -> Value {
    let cursor = read_html(html.as_bytes()).expect("parse html");
    exec(&cursor, &must_build_expr(expr), &ContextSettings::new()).expect("exec")
}

pub fn html_nodes(expr: &str, html: &str) -> NodeSet {
    query_html(expr, html).into_nodes().expect("node-set result")
}

/// Local names of the named nodes in the set, in set order.
pub fn local_names(nodes: &NodeSet) -> Vec<String> {
    nodes
        .iter()
        .filter_map(|c| c.node().name().map(|n| n.local.clone()))
        .collect()
}

/// Per-node string values, in set order.
pub fn string_values(nodes: &NodeSet) -> Vec<String> {
    nodes.iter().map(treepath::get_cursor_string).collect()
}
