use std::any::type_name;
use std::marker::PhantomData;
use std::time::Instant;

use petgraph::graph::NodeIndex;

use crate::core::Dynamic;
use crate::engine::{Arguments, Dependency, TaskExecution};
use crate::error::{GraphError, TaskError};
use crate::graph::TaskGraph;

/// Everything a task gets to see while it executes.
pub(crate) struct TaskContext<'a> {
    pub graph: &'a TaskGraph,
    pub index: NodeIndex,
    pub name: &'a str,
}

pub(crate) trait TypedTask {
    /// The concrete output type of this task.
    type Output: 'static;

    fn dependencies(&self) -> Vec<Dependency>;

    fn execute(&self, context: &TaskContext) -> Result<Self::Output, GraphError>;
}

/// The type-erased face of a task, which is what the graph stores.
///
/// It only knows how to produce an erased result; the typed view is recovered
/// at the graph boundary when somebody asks for a specific output type.
pub(crate) trait Task {
    fn get_output_type_name(&self) -> &'static str;

    fn dependencies(&self) -> Vec<Dependency>;

    fn execute(&self, context: &TaskContext) -> Result<Dynamic, GraphError>;
}

// A blanket implementation to automatically bridge the two. This is where the
// type erasure actually happens.
impl<T> Task for T
where
    T: TypedTask + 'static,
{
    fn get_output_type_name(&self) -> &'static str {
        type_name::<T::Output>()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        T::dependencies(self)
    }

    fn execute(&self, context: &TaskContext) -> Result<Dynamic, GraphError> {
        T::execute(self, context).map(Dynamic::new)
    }
}

/// A callback bound to its argument list.
pub(crate) struct Thunk<A, F, R>
where
    A: Arguments,
    F: Fn(A::Output) -> anyhow::Result<R>,
{
    pub args: A,
    pub callback: F,
    pub _phantom: PhantomData<fn() -> R>,
}

impl<A, F, R> Thunk<A, F, R>
where
    A: Arguments,
    F: Fn(A::Output) -> anyhow::Result<R>,
{
    pub fn new(args: A, callback: F) -> Self {
        Self {
            args,
            callback,
            _phantom: PhantomData,
        }
    }
}

impl<A, F, R> TypedTask for Thunk<A, F, R>
where
    A: Arguments,
    F: Fn(A::Output) -> anyhow::Result<R>,
    R: 'static,
{
    type Output = R;

    fn dependencies(&self) -> Vec<Dependency> {
        self.args.dependencies()
    }

    fn execute(&self, context: &TaskContext) -> Result<Self::Output, GraphError> {
        let args = self.args.resolve(context.graph)?;

        let start = Instant::now();
        let output = (self.callback)(args);
        let duration = start.elapsed();

        context
            .graph
            .record(context.index, TaskExecution { start, duration });

        output.map_err(|err| GraphError::Task(context.name.to_string(), TaskError::from(err)))
    }
}
