/// Everything that can go wrong while building or running a query.
///
/// Errors are values; the only panicking entry point is
/// [`crate::must_build_expr`]. Arithmetic edge cases (`NaN`, infinities) are
/// ordinary [`crate::Value`]s, never errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown namespace binding '{0}'")]
    Namespace(String),

    #[error("unbound variable ${0}")]
    UnboundVariable(String),

    #[error("unknown function {0}")]
    UnboundFunction(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("function {name} failed: {source}")]
    Function {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("source error: {0}")]
    Source(String),

    #[error("unmarshal error: {0}")]
    Unmarshal(String),
}

impl Error {
    pub(crate) fn type_err(msg: impl Into<String>) -> Self {
        Error::Type(msg.into())
    }

    pub(crate) fn source_err(err: impl core::fmt::Display) -> Self {
        Error::Source(err.to_string())
    }

    pub(crate) fn in_function(name: impl Into<String>, err: Error) -> Self {
        Error::Function {
            name: name.into(),
            source: Box::new(err),
        }
    }
}

impl serde::de::Error for Error {
    fn custom<T: core::fmt::Display>(msg: T) -> Self {
        Error::Unmarshal(msg.to_string())
    }
}
