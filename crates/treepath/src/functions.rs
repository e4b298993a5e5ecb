//! The built-in XPath 1.0 function library.
//!
//! Built-ins live in a lazily initialized registry keyed by qualified name
//! with an empty namespace; user functions registered through
//! [`crate::ContextSettings::with_function`] shadow them.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::Error;
use crate::node::{Node, QName, XML_NAMESPACE};
use crate::runtime::{CallCtx, Function};
use crate::store::{get_attribute, Cursor};
use crate::value::{get_cursor_string, parse_number, NodeSet, Value};

type Builtin = fn(&CallCtx<'_>, &[Value]) -> Result<Value, Error>;

static REGISTRY: OnceLock<HashMap<QName, Function>> = OnceLock::new();

pub(crate) fn builtin(name: &QName) -> Option<Function> {
    REGISTRY.get_or_init(build_registry).get(name).cloned()
}

fn build_registry() -> HashMap<QName, Function> {
    let mut reg: HashMap<QName, Function> = HashMap::new();
    {
        let mut add = |local: &str, f: Builtin| {
            reg.insert(QName::local(local), Arc::new(f) as Function);
        };

        // ===== Node-set =====
        add("last", |ctx, args| {
            arity("last", args, 0, 0)?;
            Ok(Value::Number(ctx.size() as f64))
        });
        add("position", |ctx, args| {
            arity("position", args, 0, 0)?;
            Ok(Value::Number(ctx.position() as f64))
        });
        add("count", |_ctx, args| {
            arity("count", args, 1, 1)?;
            let nodes = require_nodes(&args[0], "count")?;
            Ok(Value::Number(nodes.len() as f64))
        });
        add("local-name", |ctx, args| {
            arity("local-name", args, 0, 1)?;
            let name = named_target(ctx, args, "local-name")?;
            Ok(Value::String(name.map(|n| n.local).unwrap_or_default()))
        });
        add("namespace-uri", |ctx, args| {
            arity("namespace-uri", args, 0, 1)?;
            let name = named_target(ctx, args, "namespace-uri")?;
            Ok(Value::String(name.map(|n| n.space).unwrap_or_default()))
        });
        add("name", |ctx, args| {
            arity("name", args, 0, 1)?;
            let name = named_target(ctx, args, "name")?;
            Ok(Value::String(
                name.map(|n| n.to_string()).unwrap_or_default(),
            ))
        });

        // ===== String =====
        add("string", |ctx, args| {
            arity("string", args, 0, 1)?;
            Ok(Value::String(arg_or_context(ctx, args).string()))
        });
        add("concat", |_ctx, args| {
            arity("concat", args, 2, usize::MAX)?;
            Ok(Value::String(
                args.iter().map(Value::string).collect::<String>(),
            ))
        });
        add("starts-with", |_ctx, args| {
            arity("starts-with", args, 2, 2)?;
            Ok(Value::Boolean(args[0].string().starts_with(&args[1].string())))
        });
        add("contains", |_ctx, args| {
            arity("contains", args, 2, 2)?;
            Ok(Value::Boolean(args[0].string().contains(&args[1].string())))
        });
        add("substring-before", |_ctx, args| {
            arity("substring-before", args, 2, 2)?;
            let s = args[0].string();
            let sub = args[1].string();
            Ok(Value::String(
                s.find(&sub).map(|i| s[..i].to_string()).unwrap_or_default(),
            ))
        });
        add("substring-after", |_ctx, args| {
            arity("substring-after", args, 2, 2)?;
            let s = args[0].string();
            let sub = args[1].string();
            Ok(Value::String(
                s.find(&sub)
                    .map(|i| s[i + sub.len()..].to_string())
                    .unwrap_or_default(),
            ))
        });
        add("substring", |_ctx, args| {
            arity("substring", args, 2, 3)?;
            Ok(Value::String(substring(args)))
        });
        add("string-length", |ctx, args| {
            arity("string-length", args, 0, 1)?;
            let s = arg_or_context(ctx, args).string();
            Ok(Value::Number(s.chars().count() as f64))
        });
        add("normalize-space", |ctx, args| {
            arity("normalize-space", args, 0, 1)?;
            let s = arg_or_context(ctx, args).string();
            Ok(Value::String(
                s.split_whitespace().collect::<Vec<_>>().join(" "),
            ))
        });
        add("translate", |_ctx, args| {
            arity("translate", args, 3, 3)?;
            Ok(Value::String(translate(
                &args[0].string(),
                &args[1].string(),
                &args[2].string(),
            )))
        });

        // ===== Boolean =====
        add("boolean", |_ctx, args| {
            arity("boolean", args, 1, 1)?;
            Ok(Value::Boolean(args[0].boolean()))
        });
        add("not", |_ctx, args| {
            arity("not", args, 1, 1)?;
            Ok(Value::Boolean(!args[0].boolean()))
        });
        add("true", |_ctx, args| {
            arity("true", args, 0, 0)?;
            Ok(Value::Boolean(true))
        });
        add("false", |_ctx, args| {
            arity("false", args, 0, 0)?;
            Ok(Value::Boolean(false))
        });
        add("lang", |ctx, args| {
            arity("lang", args, 1, 1)?;
            Ok(Value::Boolean(lang(ctx, &args[0].string())))
        });

        // ===== Number =====
        add("number", |ctx, args| {
            arity("number", args, 0, 1)?;
            Ok(Value::Number(arg_or_context(ctx, args).number()))
        });
        add("sum", |_ctx, args| {
            arity("sum", args, 1, 1)?;
            let nodes = require_nodes(&args[0], "sum")?;
            Ok(Value::Number(
                nodes
                    .iter()
                    .map(|c| parse_number(&get_cursor_string(c)))
                    .sum(),
            ))
        });
        add("floor", |_ctx, args| {
            arity("floor", args, 1, 1)?;
            Ok(Value::Number(args[0].number().floor()))
        });
        add("ceiling", |_ctx, args| {
            arity("ceiling", args, 1, 1)?;
            Ok(Value::Number(args[0].number().ceil()))
        });
        add("round", |_ctx, args| {
            arity("round", args, 1, 1)?;
            Ok(Value::Number(xpath_round(args[0].number())))
        });
    }
    reg
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), Error> {
    if args.len() < min || args.len() > max {
        return Err(Error::type_err(format!(
            "{name}() called with {} arguments",
            args.len()
        )));
    }
    Ok(())
}

fn arg_or_context<'a>(ctx: &'a CallCtx<'_>, args: &'a [Value]) -> &'a Value {
    args.first().unwrap_or_else(|| ctx.result())
}

fn require_nodes<'a>(value: &'a Value, fname: &str) -> Result<&'a NodeSet, Error> {
    value
        .as_nodes()
        .ok_or_else(|| Error::type_err(format!("{fname}() expects a node-set")))
}

/// The name of the first node of the target node-set, if it has one. PI
/// targets and namespace prefixes count as local names.
fn named_target(ctx: &CallCtx<'_>, args: &[Value], fname: &str) -> Result<Option<QName>, Error> {
    let nodes = require_nodes(arg_or_context(ctx, args), fname)?;
    Ok(nodes.first().and_then(node_name))
}

fn node_name(cursor: &Cursor) -> Option<QName> {
    match cursor.node() {
        Node::Element { name } | Node::Attribute { name, .. } => Some(name.clone()),
        Node::ProcInst { target, .. } => Some(QName::local(target.clone())),
        Node::Namespace { prefix, .. } => Some(QName::local(prefix.clone())),
        _ => None,
    }
}

/// Round half toward positive infinity; NaN and infinities pass through.
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

/// `substring(s, start[, length])` with XPath 1.0 position arithmetic: a
/// character at 1-based position `p` is kept iff `p >= round(start)` and
/// `p < round(start) + round(length)`. NaN poisons both bounds, so the
/// corner cases fall out of ordinary float comparisons.
fn substring(args: &[Value]) -> String {
    let s = args[0].string();
    let start = xpath_round(args[1].number());
    let end = match args.get(2) {
        Some(len) => start + xpath_round(len.number()),
        None => f64::INFINITY,
    };
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

/// Map characters of `from` to the same position of `to`; characters of
/// `from` past the end of `to` are removed.
fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match from.iter().position(|&f| f == ch) {
            Some(i) => {
                if let Some(&mapped) = to.get(i) {
                    out.push(mapped);
                }
            }
            None => out.push(ch),
        }
    }
    out
}

/// `xml:lang` on the nearest self-or-ancestor element, case-insensitive,
/// with prefix matching at `-` boundaries.
fn lang(ctx: &CallCtx<'_>, wanted: &str) -> bool {
    let Some(start) = ctx.result().as_nodes().and_then(|ns| ns.first()) else {
        return false;
    };
    let wanted = wanted.to_ascii_lowercase();
    let mut cur = start.clone();
    loop {
        if let Some((_, value)) = get_attribute(&cur, XML_NAMESPACE, "lang") {
            let have = value.to_ascii_lowercase();
            return have == wanted || have.starts_with(&format!("{wanted}-"));
        }
        if cur.is_root() {
            return false;
        }
        cur = cur.parent();
    }
}
