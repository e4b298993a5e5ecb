//! The expression evaluator: a recursive walk over the AST threading an
//! evaluation frame.
//!
//! Operands of operators, function arguments and predicate bodies evaluate
//! against a copy of the frame so their mutations cannot leak back;
//! location-path steps mutate the frame in place.

use crate::axis;
use crate::error::Error;
use crate::grammar::ast::{
    Axis, BinaryOp, Expr, NodeTest, PathExpr, PathStart, RawName, Step, StepKind,
};
use crate::grammar::Grammar;
use crate::node::Node;
use crate::runtime::{resolve_qname, CallCtx, ContextSettings};
use crate::store::Cursor;
use crate::value::{NodeSet, Value};
use crate::{functions, get_cursor_string};

/// Evaluate a compiled expression against a cursor, normally the document
/// root. The starting context may be overridden through the settings.
pub fn exec(cursor: &Cursor, expr: &Grammar, settings: &ContextSettings) -> Result<Value, Error> {
    let start = settings.context.clone().unwrap_or_else(|| cursor.clone());
    eval_rooted(cursor, &start, expr, settings)
}

/// `exec` coerced to a string.
pub fn exec_as_string(
    cursor: &Cursor,
    expr: &Grammar,
    settings: &ContextSettings,
) -> Result<String, Error> {
    exec(cursor, expr, settings).map(|v| v.string())
}

/// `exec` coerced to a number.
pub fn exec_as_number(
    cursor: &Cursor,
    expr: &Grammar,
    settings: &ContextSettings,
) -> Result<f64, Error> {
    exec(cursor, expr, settings).map(|v| v.number())
}

/// `exec` coerced to a boolean.
pub fn exec_as_bool(
    cursor: &Cursor,
    expr: &Grammar,
    settings: &ContextSettings,
) -> Result<bool, Error> {
    exec(cursor, expr, settings).map(|v| v.boolean())
}

/// `exec` that fails with a type error unless the result is a node-set.
pub fn exec_as_nodeset(
    cursor: &Cursor,
    expr: &Grammar,
    settings: &ContextSettings,
) -> Result<NodeSet, Error> {
    exec(cursor, expr, settings)?.into_nodes()
}

/// Evaluation ignoring any context override; `start` doubles as the root.
/// Used where the caller already holds the node to evaluate at.
pub(crate) fn exec_at(
    start: &Cursor,
    expr: &Grammar,
    settings: &ContextSettings,
) -> Result<Value, Error> {
    eval_rooted(start, start, expr, settings)
}

fn eval_rooted(
    root: &Cursor,
    start: &Cursor,
    expr: &Grammar,
    settings: &ContextSettings,
) -> Result<Value, Error> {
    let mut frame = Frame {
        root: root.clone(),
        result: Value::Nodes(vec![start.clone()]),
        position: 0,
        size: 1,
    };
    Evaluator { settings }.eval(&expr.ast, &mut frame)?;
    Ok(frame.result)
}

/// The mutable state of one evaluation: the cursor bound to `/`, the value
/// flowing through the walk, and the predicate position/size pair.
#[derive(Clone)]
struct Frame {
    root: Cursor,
    result: Value,
    position: usize,
    size: usize,
}

struct Evaluator<'a> {
    settings: &'a ContextSettings,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr, frame: &mut Frame) -> Result<(), Error> {
        match expr {
            Expr::Number(n) => frame.result = Value::Number(*n),
            Expr::Literal(s) => frame.result = Value::String(s.clone()),
            Expr::VarRef(name) => {
                let qname = resolve_qname(name, &self.settings.namespaces)?;
                frame.result = self
                    .settings
                    .variables
                    .get(&qname)
                    .cloned()
                    .ok_or_else(|| Error::UnboundVariable(name.to_string()))?;
            }
            Expr::FunctionCall { name, args } => {
                self.call_function(name, args, frame)?;
            }
            Expr::Negate(inner) => {
                let value = self.eval_independent(inner, frame)?;
                frame.result = Value::Number(-value.number());
            }
            Expr::Binary { left, op, right } => {
                let l = self.eval_independent(left, frame)?;
                let r = self.eval_independent(right, frame)?;
                frame.result = apply_binary(&l, *op, &r);
            }
            Expr::Union { left, right } => {
                let l = self.eval_independent(left, frame)?;
                let r = self.eval_independent(right, frame)?;
                let (Value::Nodes(mut l), Value::Nodes(r)) = (l, r) else {
                    return Err(Error::type_err("cannot union non-node-sets"));
                };
                l.extend(r);
                frame.result = Value::Nodes(axis::cleanup_forward(l));
            }
            Expr::Path(path) => self.eval_path(path, frame)?,
            Expr::Filter {
                base,
                predicates,
                steps,
            } => {
                self.eval(base, frame)?;
                if !predicates.is_empty() {
                    let set = take_nodes(frame)?;
                    frame.result = Value::Nodes(self.apply_predicates(predicates, set, frame)?);
                }
                self.eval_steps(steps, frame)?;
            }
        }
        Ok(())
    }

    fn eval_independent(&self, expr: &Expr, frame: &Frame) -> Result<Value, Error> {
        let mut copy = frame.clone();
        self.eval(expr, &mut copy)?;
        Ok(copy.result)
    }

    fn eval_path(&self, path: &PathExpr, frame: &mut Frame) -> Result<(), Error> {
        match path.start {
            PathStart::Root => frame.result = Value::Nodes(vec![frame.root.clone()]),
            PathStart::RootDescendant => {
                frame.result = Value::Nodes(axis::apply(
                    Axis::DescendantOrSelf,
                    &vec![frame.root.clone()],
                ));
            }
            PathStart::Relative => {}
        }
        self.eval_steps(&path.steps, frame)
    }

    fn eval_steps(&self, steps: &[Step], frame: &mut Frame) -> Result<(), Error> {
        for step in steps {
            if step.descend {
                let set = take_nodes(frame)?;
                frame.result = Value::Nodes(axis::apply(Axis::DescendantOrSelf, &set));
            }
            match &step.kind {
                StepKind::Axis {
                    axis,
                    test,
                    predicates,
                } => {
                    let set = take_nodes(frame)?;
                    let moved = axis::apply(*axis, &set);
                    let tested = self.apply_node_test(test, moved)?;
                    let filtered = self.apply_predicates(predicates, tested, frame)?;
                    frame.result = Value::Nodes(filtered);
                }
                StepKind::Call {
                    name,
                    args,
                    predicates,
                } => {
                    self.call_function(name, args, frame)?;
                    if !predicates.is_empty() {
                        let set = take_nodes(frame)?;
                        frame.result = Value::Nodes(self.apply_predicates(predicates, set, frame)?);
                    }
                }
                StepKind::Parent => {
                    let set = take_nodes(frame)?;
                    frame.result = Value::Nodes(axis::apply(Axis::Parent, &set));
                }
                StepKind::Current => {}
            }
        }
        Ok(())
    }

    /// Keep the cursors of `set` matching `test`.
    fn apply_node_test(&self, test: &NodeTest, set: NodeSet) -> Result<NodeSet, Error> {
        let keep: Box<dyn Fn(&Cursor) -> bool> = match test {
            NodeTest::AnyNode => return Ok(set),
            NodeTest::Text => Box::new(|c| matches!(c.node(), Node::Text(_))),
            NodeTest::Comment => Box::new(|c| matches!(c.node(), Node::Comment(_))),
            NodeTest::ProcInst(wanted) => {
                let wanted = wanted.clone();
                Box::new(move |c| match c.node() {
                    Node::ProcInst { target, .. } => {
                        wanted.as_deref().is_none_or(|w| w == target)
                    }
                    _ => false,
                })
            }
            NodeTest::AnyName => Box::new(|c| {
                c.node().name().is_some() || matches!(c.node(), Node::Namespace { .. })
            }),
            NodeTest::LocalAnyNs(local) => {
                let local = local.clone();
                Box::new(move |c| c.node().name().is_some_and(|n| n.local == local))
            }
            NodeTest::NsAnyLocal(prefix) => {
                let uri = self
                    .settings
                    .namespaces
                    .get(prefix)
                    .ok_or_else(|| Error::Namespace(prefix.clone()))?
                    .clone();
                Box::new(move |c| c.node().name().is_some_and(|n| n.space == uri))
            }
            NodeTest::Prefixed { prefix, local } => {
                // An unbound prefix resolves to the empty URI here, unlike
                // function and variable names, which reject it.
                let uri = self
                    .settings
                    .namespaces
                    .get(prefix)
                    .cloned()
                    .unwrap_or_default();
                let local = local.clone();
                Box::new(move |c| {
                    c.node()
                        .name()
                        .is_some_and(|n| n.space == uri && n.local == local)
                })
            }
            NodeTest::Bare(name) => {
                let name = name.clone();
                let bound = self.settings.namespaces.get(&name).cloned();
                Box::new(move |c| match c.node() {
                    Node::Namespace { uri, .. } => bound.as_deref() == Some(uri.as_str()),
                    node => node
                        .name()
                        .is_some_and(|n| n.space.is_empty() && n.local == name),
                })
            }
        };
        Ok(set.into_iter().filter(|c| keep(c)).collect())
    }

    /// Apply predicates left to right; each filters the previous output.
    fn apply_predicates(
        &self,
        predicates: &[Expr],
        mut set: NodeSet,
        frame: &Frame,
    ) -> Result<NodeSet, Error> {
        for predicate in predicates {
            let size = set.len();
            let mut next = NodeSet::new();
            for (index, cursor) in set.into_iter().enumerate() {
                let mut inner = Frame {
                    root: frame.root.clone(),
                    result: Value::Nodes(vec![cursor.clone()]),
                    position: index,
                    size,
                };
                self.eval(predicate, &mut inner)?;
                if predicate_selects(&inner.result, index) {
                    next.push(cursor);
                }
            }
            set = next;
        }
        Ok(set)
    }

    fn call_function(&self, name: &RawName, args: &[Expr], frame: &mut Frame) -> Result<(), Error> {
        let qname = resolve_qname(name, &self.settings.namespaces)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_independent(arg, frame)?);
        }
        let func = self
            .settings
            .functions
            .get(&qname)
            .cloned()
            .or_else(|| functions::builtin(&qname));
        let Some(func) = func else {
            return Err(Error::UnboundFunction(qname.to_string()));
        };
        let ctx = CallCtx {
            result: &frame.result,
            position: frame.position + 1,
            size: frame.size,
        };
        frame.result =
            func(&ctx, &values).map_err(|e| Error::in_function(name.to_string(), e))?;
        Ok(())
    }
}

fn take_nodes(frame: &mut Frame) -> Result<NodeSet, Error> {
    match core::mem::replace(&mut frame.result, Value::Boolean(false)) {
        Value::Nodes(set) => Ok(set),
        other => {
            frame.result = other;
            Err(Error::type_err("cannot run path queries on non-node-sets"))
        }
    }
}

/// Predicate inclusion: a number selects by position, a boolean by itself,
/// anything else by its boolean coercion. `index` is 0-based.
fn predicate_selects(value: &Value, index: usize) -> bool {
    match value {
        Value::Number(n) => n.is_finite() && n.trunc() as i64 == (index + 1) as i64,
        Value::Boolean(b) => *b,
        other => other.boolean(),
    }
}

fn apply_binary(l: &Value, op: BinaryOp, r: &Value) -> Value {
    match op {
        BinaryOp::Add => Value::Number(l.number() + r.number()),
        BinaryOp::Sub => Value::Number(l.number() - r.number()),
        BinaryOp::Mul => Value::Number(l.number() * r.number()),
        // IEEE division covers the zero cases: 0 div 0 is NaN, n div 0 is
        // a signed infinity.
        BinaryOp::Div => Value::Number(l.number() / r.number()),
        BinaryOp::Mod => Value::Number(truncating_mod(l.number(), r.number())),
        BinaryOp::And => Value::Boolean(l.boolean() && r.boolean()),
        BinaryOp::Or => Value::Boolean(l.boolean() || r.boolean()),
        BinaryOp::Eq => Value::Boolean(compare_equality(l, r, false)),
        BinaryOp::Ne => Value::Boolean(compare_equality(l, r, true)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Value::Boolean(compare_relational(l, r, op))
        }
    }
}

/// `mod` truncates both operands to integers; a zero or non-finite operand
/// yields NaN.
fn truncating_mod(l: f64, r: f64) -> f64 {
    if !l.is_finite() || !r.is_finite() || r.trunc() == 0.0 {
        return f64::NAN;
    }
    ((l.trunc() as i64) % (r.trunc() as i64)) as f64
}

/// Equality with node-set fan-out: node-sets compare existentially against
/// the other side, booleans dominate scalars, then numbers, then strings.
fn compare_equality(l: &Value, r: &Value, negate: bool) -> bool {
    let eq_str = |a: &str, b: &str| (a == b) != negate;
    let eq_num = |a: f64, b: f64| (a == b) != negate;
    match (l, r) {
        (Value::Nodes(ln), Value::Nodes(rn)) => ln.iter().any(|a| {
            rn.iter()
                .any(|b| eq_str(&get_cursor_string(a), &get_cursor_string(b)))
        }),
        (Value::Number(n), Value::Nodes(set)) | (Value::Nodes(set), Value::Number(n)) => set
            .iter()
            .any(|c| eq_num(crate::value::parse_number(&get_cursor_string(c)), *n)),
        (Value::String(s), Value::Nodes(set)) | (Value::Nodes(set), Value::String(s)) => {
            set.iter().any(|c| eq_str(&get_cursor_string(c), s))
        }
        (Value::Boolean(b), Value::Nodes(set)) | (Value::Nodes(set), Value::Boolean(b)) => {
            eq_num(f64::from(*b), f64::from(!set.is_empty()))
        }
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
            eq_num(f64::from(l.boolean()), f64::from(r.boolean()))
        }
        (Value::Number(_), _) | (_, Value::Number(_)) => eq_num(l.number(), r.number()),
        _ => eq_str(&l.string(), &r.string()),
    }
}

/// Relational comparison: node-sets fan out (string-wise against strings
/// and other node-sets, numeric against numbers); the scalar fallback is
/// numeric.
fn compare_relational(l: &Value, r: &Value, op: BinaryOp) -> bool {
    let cmp_num = |a: f64, b: f64| match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!("relational operator"),
    };
    let cmp_str = |a: &str, b: &str| match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!("relational operator"),
    };
    match (l, r) {
        (Value::Nodes(ln), Value::Nodes(rn)) => ln.iter().any(|a| {
            rn.iter()
                .any(|b| cmp_str(&get_cursor_string(a), &get_cursor_string(b)))
        }),
        (Value::Number(n), Value::Nodes(set)) => set
            .iter()
            .any(|c| cmp_num(*n, crate::value::parse_number(&get_cursor_string(c)))),
        (Value::Nodes(set), Value::Number(n)) => set
            .iter()
            .any(|c| cmp_num(crate::value::parse_number(&get_cursor_string(c)), *n)),
        (Value::String(s), Value::Nodes(set)) => {
            set.iter().any(|c| cmp_str(s, &get_cursor_string(c)))
        }
        (Value::Nodes(set), Value::String(s)) => {
            set.iter().any(|c| cmp_str(&get_cursor_string(c), s))
        }
        _ => cmp_num(l.number(), r.number()),
    }
}
