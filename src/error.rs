use thiserror::Error;

/// Errors produced while building or compiling a criteria query.
///
/// Every variant reflects a caller-correctable usage mistake detected
/// deterministically at construction or render time; nothing here is
/// transient or retryable.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Navigating onward from a terminal (basic-typed or plural) path.
    #[error("illegal dereference: {0}")]
    IllegalDereference(String),

    /// A join/fetch/accessor operation on a node whose capability set
    /// excludes it.
    #[error("illegal join: {0}")]
    IllegalJoin(String),

    /// A structurally invalid composition, e.g. a tuple selection nested
    /// inside another compound selection, or a multi-root query without an
    /// explicit projection.
    #[error("invalid composition: {0}")]
    InvalidComposition(String),

    /// A feature that exists in the API surface but is not supported for
    /// the given usage.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The metamodel has no entity with this name.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// The metamodel cannot resolve this attribute on the owning type.
    #[error("unknown attribute '{attribute}' on '{owner}'")]
    UnknownAttribute { owner: String, attribute: String },
}

/// Result type for query construction and compilation.
pub type Result<T> = core::result::Result<T, QueryError>;
