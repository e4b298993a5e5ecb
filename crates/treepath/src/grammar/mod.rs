//! XPath source to AST.
//!
//! The concrete syntax lives in `src/xpath1.pest`; this module lowers the
//! pest derivation into the [`ast`] types behind the [`Grammar`] handle the
//! evaluator consumes. A `Grammar` is immutable and reusable across
//! documents and threads.

pub mod ast;

use pest::iterators::Pair;
use pest::Parser;

use crate::error::Error;
use ast::{Axis, BinaryOp, Expr, NodeTest, PathExpr, PathStart, RawName, Step, StepKind};

#[derive(pest_derive::Parser)]
#[grammar = "xpath1.pest"]
struct XPathParser;

/// A compiled XPath expression.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) ast: Expr,
    source: String,
}

impl Grammar {
    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Compile an XPath 1.0 expression.
pub fn build_expr(xpath: &str) -> Result<Grammar, Error> {
    let mut pairs = XPathParser::parse(Rule::xpath, xpath)
        .map_err(|e| Error::Syntax(e.to_string()))?;
    let top = pairs.next().ok_or_else(|| {
        Error::Syntax("could not build expression tree".to_string())
    })?;
    let expr_pair = top
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| Error::Syntax("could not build expression tree".to_string()))?;
    Ok(Grammar {
        ast: lower_expr(expr_pair)?,
        source: xpath.to_string(),
    })
}

/// Like [`build_expr`] but panics on a malformed expression. For
/// expressions known to be valid at compile time.
pub fn must_build_expr(xpath: &str) -> Grammar {
    match build_expr(xpath) {
        Ok(g) => g,
        Err(e) => panic!("invalid XPath expression {xpath:?}: {e}"),
    }
}

fn lower_expr(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    match pair.as_rule() {
        Rule::expr => lower_expr(only_child(pair)?),
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality_expr
        | Rule::relational_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => lower_binary_chain(pair),
        Rule::unary_expr => lower_unary(pair),
        Rule::union_expr => lower_union(pair),
        Rule::path_expr => lower_expr(only_child(pair)?),
        Rule::absolute_path => lower_absolute(pair),
        Rule::relative_path => Ok(Expr::Path(PathExpr {
            start: PathStart::Relative,
            steps: lower_relative(pair)?,
        })),
        Rule::filter_path => lower_filter(pair),
        other => Err(internal(other)),
    }
}

fn lower_binary_chain(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let mut expr = lower_expr(inner.next().ok_or_else(|| internal(Rule::expr))?)?;
    while let Some(op) = inner.next() {
        let right = inner.next().ok_or_else(|| internal(op.as_rule()))?;
        expr = Expr::Binary {
            left: Box::new(expr),
            op: binary_op(&op)?,
            right: Box::new(lower_expr(right)?),
        };
    }
    Ok(expr)
}

fn binary_op(pair: &Pair<'_, Rule>) -> Result<BinaryOp, Error> {
    Ok(match pair.as_str().trim() {
        "or" => BinaryOp::Or,
        "and" => BinaryOp::And,
        "=" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "div" => BinaryOp::Div,
        "mod" => BinaryOp::Mod,
        _ => return Err(internal(pair.as_rule())),
    })
}

fn lower_unary(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut negations = 0usize;
    let mut operand = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::op_minus => negations += 1,
            Rule::union_expr => operand = Some(lower_expr(p)?),
            other => return Err(internal(other)),
        }
    }
    let mut expr = operand.ok_or_else(|| internal(Rule::unary_expr))?;
    for _ in 0..negations {
        expr = Expr::Negate(Box::new(expr));
    }
    Ok(expr)
}

fn lower_union(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let mut expr = lower_expr(inner.next().ok_or_else(|| internal(Rule::union_expr))?)?;
    for right in inner {
        expr = Expr::Union {
            left: Box::new(expr),
            right: Box::new(lower_expr(right)?),
        };
    }
    Ok(expr)
}

fn lower_absolute(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut start = PathStart::Root;
    let mut steps = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::slash => start = PathStart::Root,
            Rule::dslash => start = PathStart::RootDescendant,
            Rule::relative_path => steps = lower_relative(p)?,
            other => return Err(internal(other)),
        }
    }
    Ok(Expr::Path(PathExpr { start, steps }))
}

fn lower_relative(pair: Pair<'_, Rule>) -> Result<Vec<Step>, Error> {
    let mut steps = Vec::new();
    let mut descend = false;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::slash => descend = false,
            Rule::dslash => descend = true,
            Rule::step => {
                steps.push(lower_step(p, descend)?);
                descend = false;
            }
            other => return Err(internal(other)),
        }
    }
    Ok(steps)
}

fn lower_filter(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let filter_expr = inner.next().ok_or_else(|| internal(Rule::filter_path))?;

    let mut fe = filter_expr.into_inner();
    let base = lower_primary(fe.next().ok_or_else(|| internal(Rule::filter_expr))?)?;
    let mut predicates = Vec::new();
    for p in fe {
        predicates.push(lower_expr(only_child(p)?)?);
    }

    let mut steps = Vec::new();
    let mut descend = false;
    for p in inner {
        match p.as_rule() {
            Rule::slash => descend = false,
            Rule::dslash => descend = true,
            Rule::relative_path => {
                steps = lower_relative(p)?;
                if descend {
                    if let Some(first) = steps.first_mut() {
                        first.descend = true;
                    }
                }
            }
            other => return Err(internal(other)),
        }
    }

    if predicates.is_empty() && steps.is_empty() {
        Ok(base)
    } else {
        Ok(Expr::Filter {
            base: Box::new(base),
            predicates,
            steps,
        })
    }
}

fn lower_primary(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let inner = only_child(pair)?;
    match inner.as_rule() {
        Rule::var_ref => Ok(Expr::VarRef(lower_qname(only_child(inner)?)?)),
        Rule::literal => Ok(Expr::Literal(literal_text(inner)?)),
        Rule::number => inner
            .as_str()
            .parse::<f64>()
            .map(Expr::Number)
            .map_err(|e| Error::Syntax(format!("bad number literal: {e}"))),
        Rule::paren_expr => lower_expr(only_child(inner)?),
        Rule::function_call => {
            let (name, args) = lower_function_call(inner)?;
            Ok(Expr::FunctionCall { name, args })
        }
        other => Err(internal(other)),
    }
}

fn lower_function_call(pair: Pair<'_, Rule>) -> Result<(RawName, Vec<Expr>), Error> {
    let mut inner = pair.into_inner();
    let name = lower_qname(inner.next().ok_or_else(|| internal(Rule::function_call))?)?;
    let args = inner.map(lower_expr).collect::<Result<Vec<_>, _>>()?;
    Ok((name, args))
}

fn lower_qname(pair: Pair<'_, Rule>) -> Result<RawName, Error> {
    let parts: Vec<String> = pair
        .into_inner()
        .map(|p| p.as_str().to_string())
        .collect();
    match parts.as_slice() {
        [local] => Ok(RawName {
            prefix: None,
            local: local.clone(),
        }),
        [prefix, local] => Ok(RawName {
            prefix: Some(prefix.clone()),
            local: local.clone(),
        }),
        _ => Err(internal(Rule::qname)),
    }
}

fn lower_step(pair: Pair<'_, Rule>, descend: bool) -> Result<Step, Error> {
    let inner = only_child(pair)?;
    let kind = match inner.as_rule() {
        Rule::explicit_axis_step => {
            let mut parts = inner.into_inner();
            let axis_pair = parts.next().ok_or_else(|| internal(Rule::axis_name))?;
            let axis = axis_from_str(axis_pair.as_str())?;
            let test_pair = parts.next().ok_or_else(|| internal(Rule::node_test))?;
            StepKind::Axis {
                axis,
                test: lower_node_test(only_child(test_pair)?)?,
                predicates: lower_predicates(parts)?,
            }
        }
        Rule::attr_step => {
            let mut parts = inner.into_inner();
            let test_pair = parts.next().ok_or_else(|| internal(Rule::node_test))?;
            StepKind::Axis {
                axis: Axis::Attribute,
                test: lower_node_test(only_child(test_pair)?)?,
                predicates: lower_predicates(parts)?,
            }
        }
        Rule::kind_step | Rule::name_step => {
            let mut parts = inner.into_inner();
            let test_pair = parts.next().ok_or_else(|| internal(Rule::node_test))?;
            StepKind::Axis {
                axis: Axis::Child,
                test: lower_node_test(test_pair)?,
                predicates: lower_predicates(parts)?,
            }
        }
        Rule::fn_step => {
            let mut parts = inner.into_inner();
            let call = parts.next().ok_or_else(|| internal(Rule::function_call))?;
            let (name, args) = lower_function_call(call)?;
            StepKind::Call {
                name,
                args,
                predicates: lower_predicates(parts)?,
            }
        }
        Rule::parent_step => StepKind::Parent,
        Rule::self_step => StepKind::Current,
        other => return Err(internal(other)),
    };
    Ok(Step { descend, kind })
}

fn lower_predicates(pairs: pest::iterators::Pairs<'_, Rule>) -> Result<Vec<Expr>, Error> {
    pairs
        .map(|p| lower_expr(only_child(p)?))
        .collect::<Result<Vec<_>, _>>()
}

fn lower_node_test(pair: Pair<'_, Rule>) -> Result<NodeTest, Error> {
    match pair.as_rule() {
        Rule::kind_test => lower_node_test(only_child(pair)?),
        Rule::name_test => lower_node_test(only_child(pair)?),
        Rule::pi_test => {
            let target = pair
                .into_inner()
                .find(|p| p.as_rule() == Rule::literal)
                .map(literal_text)
                .transpose()?;
            Ok(NodeTest::ProcInst(target))
        }
        Rule::simple_kind_test => {
            let kind = only_child(pair)?;
            Ok(match kind.as_str() {
                "node" => NodeTest::AnyNode,
                "text" => NodeTest::Text,
                "comment" => NodeTest::Comment,
                _ => return Err(internal(Rule::simple_kind_test)),
            })
        }
        Rule::star => Ok(NodeTest::AnyName),
        Rule::star_any_local => Ok(NodeTest::LocalAnyNs(only_child(pair)?.as_str().to_string())),
        Rule::ns_any_local => Ok(NodeTest::NsAnyLocal(only_child(pair)?.as_str().to_string())),
        Rule::prefixed_name => {
            let parts: Vec<String> = pair
                .into_inner()
                .map(|p| p.as_str().to_string())
                .collect();
            match parts.as_slice() {
                [prefix, local] => Ok(NodeTest::Prefixed {
                    prefix: prefix.clone(),
                    local: local.clone(),
                }),
                _ => Err(internal(Rule::prefixed_name)),
            }
        }
        Rule::bare_name => Ok(NodeTest::Bare(only_child(pair)?.as_str().to_string())),
        other => Err(internal(other)),
    }
}

fn axis_from_str(name: &str) -> Result<Axis, Error> {
    Ok(match name {
        "self" => Axis::SelfAxis,
        "child" => Axis::Child,
        "parent" => Axis::Parent,
        "attribute" => Axis::Attribute,
        "namespace" => Axis::Namespace,
        "descendant" => Axis::Descendant,
        "descendant-or-self" => Axis::DescendantOrSelf,
        "ancestor" => Axis::Ancestor,
        "ancestor-or-self" => Axis::AncestorOrSelf,
        "following-sibling" => Axis::FollowingSibling,
        "following" => Axis::Following,
        "preceding-sibling" => Axis::PrecedingSibling,
        "preceding" => Axis::Preceding,
        _ => return Err(Error::Syntax(format!("unknown axis '{name}'"))),
    })
}

fn literal_text(pair: Pair<'_, Rule>) -> Result<String, Error> {
    only_child(pair).map(|p| p.as_str().to_string())
}

fn only_child(pair: Pair<'_, Rule>) -> Result<Pair<'_, Rule>, Error> {
    let rule = pair.as_rule();
    pair.into_inner().next().ok_or_else(|| internal(rule))
}

fn internal(rule: Rule) -> Error {
    Error::Syntax(format!("unexpected derivation at {rule:?}"))
}
