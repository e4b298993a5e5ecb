//! Per-query configuration and the call interface exposed to functions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::grammar::ast::RawName;
use crate::node::QName;
use crate::store::Cursor;
use crate::value::Value;

/// A user-registered or built-in XPath function.
pub type Function = Arc<dyn Fn(&CallCtx<'_>, &[Value]) -> Result<Value, Error> + Send + Sync>;

/// Namespace bindings, variables, extension functions and an optional
/// starting cursor for one query. Built with the `with_*` methods and
/// reusable across evaluations.
#[derive(Clone, Default)]
pub struct ContextSettings {
    pub(crate) namespaces: HashMap<String, String>,
    pub(crate) variables: HashMap<QName, Value>,
    pub(crate) functions: HashMap<QName, Function>,
    pub(crate) context: Option<Cursor>,
}

impl ContextSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a prefix for resolving names in the query; independent of the
    /// document's own declarations.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Bind `$local` (or `$prefix:local` via a namespace binding).
    pub fn with_variable(
        mut self,
        space: impl Into<String>,
        local: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.variables
            .insert(QName::new(space, local), value.into());
        self
    }

    /// Register an extension function under `(space, local)`.
    pub fn with_function<F>(
        mut self,
        space: impl Into<String>,
        local: impl Into<String>,
        func: F,
    ) -> Self
    where
        F: Fn(&CallCtx<'_>, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.functions
            .insert(QName::new(space, local), Arc::new(func));
        self
    }

    /// Start the query at this cursor instead of the one passed to `exec`.
    /// It must belong to the same document.
    pub fn with_context(mut self, cursor: Cursor) -> Self {
        self.context = Some(cursor);
        self
    }
}

impl core::fmt::Debug for ContextSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextSettings")
            .field("namespaces", &self.namespaces)
            .field("variables", &self.variables.keys())
            .field("functions", &self.functions.keys())
            .field("context", &self.context.as_ref().map(Cursor::pos))
            .finish()
    }
}

/// What a function sees of the evaluation it was called from.
pub struct CallCtx<'a> {
    pub(crate) result: &'a Value,
    pub(crate) position: usize,
    pub(crate) size: usize,
}

impl CallCtx<'_> {
    /// The value flowing through the walk at the call site; inside a
    /// predicate this is a one-element node-set holding the current node.
    pub fn result(&self) -> &Value {
        self.result
    }

    /// 1-based context position, as reported by `position()`.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Context size, as reported by `last()`.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Resolve a query name against the context's namespace bindings. An
/// unknown prefix is an error here; node tests have their own, laxer rule.
pub(crate) fn resolve_qname(
    name: &RawName,
    namespaces: &HashMap<String, String>,
) -> Result<QName, Error> {
    match &name.prefix {
        None => Ok(QName::local(name.local.clone())),
        Some(prefix) => match namespaces.get(prefix.trim()) {
            Some(uri) => Ok(QName::new(uri.clone(), name.local.trim())),
            None => Err(Error::Namespace(prefix.clone())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_prefix_is_a_namespace_error() {
        let name = RawName {
            prefix: Some("nope".into()),
            local: "x".into(),
        };
        assert!(matches!(
            resolve_qname(&name, &HashMap::new()),
            Err(Error::Namespace(_))
        ));
    }

    #[test]
    fn builder_accumulates_bindings() {
        let settings = ContextSettings::new()
            .with_namespace("ns", "http://x")
            .with_variable("http://x", "v", 3.14);
        assert_eq!(settings.namespaces["ns"], "http://x");
        assert!(settings
            .variables
            .contains_key(&QName::new("http://x", "v")));
    }
}
