//! AST for XPath 1.0 expressions, produced by the lowering pass in
//! [`super`] and consumed by the evaluator.

/// An unresolved query name, exactly as written. Prefixes are resolved
/// against the context's namespace bindings at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawName {
    pub prefix: Option<String>,
    pub local: String,
}

impl RawName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }
}

impl core::fmt::Display for RawName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Literal(String),
    VarRef(RawName),
    FunctionCall {
        name: RawName,
        args: Vec<Expr>,
    },
    Negate(Box<Expr>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Union {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Path(PathExpr),
    /// A primary expression with optional predicates and a trailing
    /// location path, e.g. `$var[1]/a` or `(//a)[2]`.
    Filter {
        base: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStart {
    /// `/...`: the context becomes the document root.
    Root,
    /// `//...`: descendant-or-self of the root before the first step.
    RootDescendant,
    /// A relative path over the current context.
    Relative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub start: PathStart,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// True when the step was joined with `//`: apply descendant-or-self
    /// before the step itself.
    pub descend: bool,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Axis {
        axis: Axis,
        test: NodeTest,
        predicates: Vec<Expr>,
    },
    /// A function call in step position operates on the current context,
    /// e.g. `/root/string()`.
    Call {
        name: RawName,
        args: Vec<Expr>,
        predicates: Vec<Expr>,
    },
    /// `..`
    Parent,
    /// `.`
    Current,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    SelfAxis,
    Child,
    Parent,
    Attribute,
    Namespace,
    Descendant,
    DescendantOrSelf,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    Following,
    PrecedingSibling,
    Preceding,
}

impl Axis {
    /// Reverse axes yield results in descending document order.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `node()`
    AnyNode,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()` with optional target
    ProcInst(Option<String>),
    /// `*`
    AnyName,
    /// `prefix:*`
    NsAnyLocal(String),
    /// `*:local`
    LocalAnyNs(String),
    /// `prefix:local`
    Prefixed { prefix: String, local: String },
    /// `local`
    Bare(String),
}
