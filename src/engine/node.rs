use std::borrow::Cow;

use crate::core::{Dynamic, Memo};
use crate::engine::task::{Task, TaskContext};
use crate::error::GraphError;

/// A task stored in the graph, together with its memoized result.
///
/// A node starts out unresolved. The first time it is evaluated its task runs
/// and the outcome, whether a value or an error, is written to the memo. From
/// then on the node is resolved and every request is answered from the memo.
pub(crate) struct TaskNode {
    pub name: Cow<'static, str>,
    task: Box<dyn Task>,
    memo: Memo<Result<Dynamic, GraphError>>,
}

impl TaskNode {
    pub fn new(name: Cow<'static, str>, task: Box<dyn Task>) -> Self {
        Self {
            name,
            task,
            memo: Memo::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.memo.is_set()
    }

    pub fn task(&self) -> &dyn Task {
        &*self.task
    }

    /// Runs the task unless the node is already resolved, then returns the
    /// memoized outcome.
    pub fn evaluate(&self, context: &TaskContext) -> Result<&Dynamic, GraphError> {
        if self.memo.is_set() {
            tracing::trace!(name = %self.name, "memoized");
            return self.result();
        }

        let outcome = self.task.execute(context);

        if let Err(err) = &outcome {
            tracing::warn!(name = %self.name, "task failed: {err}");
        }

        if self.memo.set(outcome).is_err() {
            tracing::error!(name = %self.name, "task resolved twice, keeping first result");
        }

        self.result()
    }

    /// The memoized outcome.
    ///
    /// # Errors
    /// [`GraphError::EmptyCell`] if the node has not been evaluated yet, or the
    /// memoized error if it failed.
    pub fn result(&self) -> Result<&Dynamic, GraphError> {
        self.memo.get()?.as_ref().map_err(Clone::clone)
    }
}
