use std::any::TypeId;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use petgraph::graph::NodeIndex;

use crate::core::Dynamic;
use crate::error::GraphError;
use crate::graph::TaskGraph;

/// Identity of a [`TaskGraph`] instance, stamped into every handle it issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GraphId(usize);

impl GraphId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        GraphId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A durable reference to a task registered in a [`TaskGraph`].
///
/// Handles are cheap to copy and stay valid for the whole lifetime of the
/// graph that issued them, no matter how many tasks are added afterwards.
/// They carry no type information about the task's output; the expected type
/// is chosen when reading the result, and checked at that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(crate) graph: GraphId,
    pub(crate) index: NodeIndex,
}

impl Handle {
    pub(crate) fn new(graph: GraphId, index: NodeIndex) -> Self {
        Self { graph, index }
    }

    /// Returns the underlying `NodeIndex` of the task in the graph.
    pub fn index(&self) -> NodeIndex {
        self.index
    }
}

/// A future argument as seen from the task that takes it: the task it waits
/// for, and the output type it will read from that task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub(crate) handle: Handle,
    pub(crate) output: TypeId,
}

impl Dependency {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Whether `value` can be bound to the argument without a type mismatch.
    pub fn accepts(&self, value: &Dynamic) -> bool {
        value.value_type_id() == self.output
    }
}

/// A typed, non-owning reference to the future result of a task.
///
/// A `Future<T>` is created with [`TaskGraph::future`] and passed as an
/// argument to a later task. When that task runs, the future is forced: the
/// referenced task is evaluated first (unless it already was), and its output
/// is handed over as a `T`.
///
/// # Diamond dependencies
///
/// If Task C and Task B both take a future of Task A, and Task D depends on
/// both B and C, Task A will only be executed *once*, and its result will be
/// shared.
pub struct Future<T> {
    pub(crate) handle: Handle,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Future<T> {
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            handle,
            _phantom: PhantomData,
        }
    }

    /// The task this future refers to.
    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Future<T> {}

impl<T> PartialEq for Future<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for Future<T> {}

impl<T> Hash for Future<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<T> std::fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Future")
            .field("handle", &self.handle)
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Future<T>
where
    T: Clone + 'static,
{
    /// Evaluates the referenced task if it has not run yet, then reads its
    /// output as `T`.
    ///
    /// # Errors
    /// - [`GraphError::TypeMismatch`] if the task produced something else.
    /// - [`GraphError::ForeignNode`] if `graph` did not issue this future.
    /// - [`GraphError::Task`] if the task, or anything it depends on, failed.
    pub fn force(&self, graph: &TaskGraph) -> Result<T, GraphError> {
        graph.force(self.handle)?.downcast::<T>()
    }
}

impl<T> super::Argument for Future<T>
where
    T: Clone + 'static,
{
    type Output = T;

    fn dependency(&self) -> Option<Dependency> {
        Some(Dependency {
            handle: self.handle,
            output: TypeId::of::<T>(),
        })
    }

    fn resolve(&self, graph: &TaskGraph) -> Result<Self::Output, GraphError> {
        self.force(graph)
    }
}
