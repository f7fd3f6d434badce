use std::sync::Arc;

use thiserror::Error;

/// A failure returned by a fallible task callback.
///
/// The error is reference-counted so that a single failure can be memoized in
/// the node and handed out again to every later request, without running the
/// callback a second time.
#[derive(Debug, Error, Clone)]
#[error("{0:#}")]
pub struct TaskError(pub(crate) Arc<anyhow::Error>);

impl TaskError {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(err.into()))
    }

    /// The underlying error returned by the callback.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(e: anyhow::Error) -> Self {
        TaskError(Arc::new(e))
    }
}

#[derive(Debug, Error, Clone)]
pub enum GraphError {
    /// The value was requested as a type other than the one it was stored as.
    #[error("Type mismatch: requested {expected}, but the value is {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A memoization cell was read before anything was stored in it.
    #[error("Memoization cell was read before it was set")]
    EmptyCell,

    /// The handle was not issued by this graph.
    #[error("Node {index} does not belong to this graph")]
    ForeignNode { index: usize },

    #[error("Task '{0}':\n{1}")]
    Task(String, TaskError),
}

impl GraphError {
    pub(crate) fn mismatch<T: ?Sized>(found: &'static str) -> Self {
        GraphError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            found,
        }
    }
}
