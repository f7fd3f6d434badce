use std::any::type_name;
use std::borrow::Cow;
use std::cell::RefCell;

use petgraph::Graph;
use petgraph::graph::NodeIndex;

use crate::core::{Dynamic, Options};
use crate::engine::{
    Arguments, Callable, Diagnostics, Future, GraphId, Handle, Task, TaskExecution, TaskNode,
    Thunk,
};
use crate::error::GraphError;

/// A demand-driven graph of memoized tasks.
///
/// Tasks are registered with [`TaskGraph::add`] together with their argument
/// list. An argument is either a literal value or a [`Future`] of a task added
/// earlier. Nothing runs at registration time: a task is evaluated when its
/// result is requested, either directly through [`TaskGraph::get_result`] or
/// indirectly because a task depending on it is evaluated. Either way each task
/// runs at most once, and its result is cached for all further requests.
///
/// Futures can only be made from handles that already exist, so every
/// dependency points at an earlier task and the graph can't contain a cycle.
///
/// # Example
///
/// ```rust
/// use lazydag::TaskGraph;
///
/// let mut graph = TaskGraph::new();
///
/// let a = graph.add(|x: i32, y: i32| x + y, (1, 2));
/// let b = graph.add(|x: i32, y: i32| x * y, (graph.future::<i32>(a), 10));
///
/// assert_eq!(graph.get_result::<i32>(b).unwrap(), 30);
/// ```
pub struct TaskGraph {
    pub(crate) id: GraphId,
    pub(crate) graph: Graph<TaskNode, ()>,
    pub(crate) options: Options,
    executions: RefCell<Vec<(NodeIndex, TaskExecution)>>,
}

impl TaskGraph {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            id: GraphId::next(),
            graph: Graph::new(),
            options,
            executions: RefCell::new(Vec::new()),
        }
    }

    /// The entry point for defining a task with extra settings, like a name.
    pub fn task(&mut self) -> TaskDef<'_> {
        TaskDef {
            graph: self,
            name: None,
        }
    }

    /// Registers `callable` to be run with `args`.
    ///
    /// `args` is a tuple with one entry per parameter of `callable`. Each
    /// entry is either a literal or a [`Future`] obtained from
    /// [`TaskGraph::future`]. The callable is not run here.
    pub fn add<A, F, R>(&mut self, callable: F, args: A) -> Handle
    where
        A: Arguments + 'static,
        F: Callable<A::Output, Output = R> + 'static,
        R: 'static,
    {
        self.task().args(args).run(callable)
    }

    /// Registers a fallible `callable` to be run with `args`.
    ///
    /// If the callable returns an error, that error is memoized in place of a
    /// result. The callable is never retried, and every task depending on it
    /// fails with the same error without running.
    pub fn try_add<A, F, R>(&mut self, callable: F, args: A) -> Handle
    where
        A: Arguments + 'static,
        F: Callable<A::Output, Output = anyhow::Result<R>> + 'static,
        R: 'static,
    {
        self.task().args(args).try_run(callable)
    }

    /// Wraps the task behind `handle` as a dependency producing `R`.
    ///
    /// This doesn't evaluate anything. The type is only checked once the future
    /// is forced.
    pub fn future<R>(&self, handle: Handle) -> Future<R> {
        Future::new(handle)
    }

    /// Forces the task and returns its type-erased result.
    pub fn force(&self, handle: Handle) -> Result<&Dynamic, GraphError> {
        crate::engine::force(self, handle)
    }

    /// Forces the task and returns a clone of its result as `R`.
    ///
    /// # Errors
    /// - [`GraphError::TypeMismatch`] if the task produced anything but `R`.
    /// - [`GraphError::Task`] if the task, or a task it depends on, failed.
    /// - [`GraphError::ForeignNode`] if `handle` came from a different graph.
    pub fn get_result<R>(&self, handle: Handle) -> Result<R, GraphError>
    where
        R: Clone + 'static,
    {
        self.force(handle)?.downcast::<R>()
    }

    /// Like [`TaskGraph::get_result`], but borrows the cached result instead of
    /// cloning it.
    pub fn get_result_ref<R>(&self, handle: Handle) -> Result<&R, GraphError>
    where
        R: 'static,
    {
        self.force(handle)?.downcast_ref::<R>()
    }

    /// Forces every task, in registration order.
    ///
    /// Tasks that are already resolved are skipped, so this is safe to call
    /// after some results have been requested individually. Every task is
    /// attempted even if some of them fail; the first failure is returned.
    pub fn execute_all(&self) -> Result<(), GraphError> {
        let mut first_error = None;

        for index in self.graph.node_indices() {
            if let Err(err) = self.force(Handle::new(self.id, index))
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Whether the task has been evaluated.
    pub fn is_resolved(&self, handle: Handle) -> bool {
        self.locate(handle)
            .is_ok_and(|index| self.graph[index].is_resolved())
    }

    pub fn name(&self, handle: Handle) -> Option<&str> {
        let index = self.locate(handle).ok()?;
        Some(&self.graph[index].name)
    }

    /// The tasks `handle` takes futures of, in argument order.
    pub fn dependencies(&self, handle: Handle) -> Vec<Handle> {
        match self.locate(handle) {
            Ok(index) => self.graph[index]
                .task()
                .dependencies()
                .iter()
                .map(|dependency| dependency.handle)
                .collect(),
            Err(_) => vec![],
        }
    }

    /// Handles of all tasks, in registration order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.graph
            .node_indices()
            .map(|index| Handle::new(self.id, index))
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Timings of every callback that has run so far.
    pub fn diagnostics(&self) -> Diagnostics {
        let executions = self.executions.borrow().clone();
        let names = executions
            .iter()
            .map(|(index, _)| (*index, self.graph[*index].name.clone()))
            .collect();

        Diagnostics {
            graph: self.id,
            executions,
            names,
        }
    }

    /// Checks that `handle` was issued by this graph.
    pub(crate) fn locate(&self, handle: Handle) -> Result<NodeIndex, GraphError> {
        if handle.graph != self.id || handle.index.index() >= self.graph.node_count() {
            return Err(GraphError::ForeignNode {
                index: handle.index.index(),
            });
        }

        Ok(handle.index)
    }

    pub(crate) fn record(&self, index: NodeIndex, execution: TaskExecution) {
        self.executions.borrow_mut().push((index, execution));
    }

    fn add_node(&mut self, name: Cow<'static, str>, task: Box<dyn Task>) -> Handle {
        let dependencies = task.dependencies();
        let index = self.graph.add_node(TaskNode::new(name, task));

        for dependency in dependencies {
            if let Ok(dependency) = self.locate(dependency.handle) {
                self.graph.update_edge(dependency, index, ());
            }
        }

        tracing::debug!(
            name = %self.graph[index].name,
            index = index.index(),
            "registered task"
        );

        Handle::new(self.id, index)
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.graph.node_count())
            .field("options", &self.options)
            .finish()
    }
}

/// Renders the graph as a Mermaid flowchart.
impl std::fmt::Display for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        for index in self.graph.node_indices() {
            let name = self.graph[index].name.replace('"', "\\\"");
            writeln!(f, "    {:?}[\"{}\"]", index.index(), name)?;
        }

        for edge in self.graph.raw_edges() {
            let (source, target) = (edge.source(), edge.target());
            let type_name = self.graph[source]
                .task()
                .get_output_type_name()
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            writeln!(
                f,
                "    {:?} -- \"{}\" --> {:?}",
                source.index(),
                type_name,
                target.index()
            )?;
        }

        Ok(())
    }
}

pub struct TaskDef<'a> {
    graph: &'a mut TaskGraph,
    name: Option<Cow<'static, str>>,
}

impl<'a> TaskDef<'a> {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn args<A>(self, args: A) -> TaskBinder<'a, A>
    where
        A: Arguments,
    {
        TaskBinder {
            graph: self.graph,
            name: self.name,
            args,
        }
    }

    pub fn run<F, R>(self, callable: F) -> Handle
    where
        F: Fn() -> R + 'static,
        R: 'static,
    {
        self.args(()).run(callable)
    }

    pub fn try_run<F, R>(self, callable: F) -> Handle
    where
        F: Fn() -> anyhow::Result<R> + 'static,
        R: 'static,
    {
        self.args(()).try_run(callable)
    }
}

pub struct TaskBinder<'a, A> {
    graph: &'a mut TaskGraph,
    name: Option<Cow<'static, str>>,
    args: A,
}

impl<'a, A> TaskBinder<'a, A>
where
    A: Arguments + 'static,
{
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn run<F, R>(self, callable: F) -> Handle
    where
        F: Callable<A::Output, Output = R> + 'static,
        R: 'static,
    {
        let name = self.name.unwrap_or(type_name::<F>().into());
        let thunk = Thunk::new(self.args, move |args: A::Output| -> anyhow::Result<R> {
            Ok(callable.invoke(args))
        });

        self.graph.add_node(name, Box::new(thunk))
    }

    pub fn try_run<F, R>(self, callable: F) -> Handle
    where
        F: Callable<A::Output, Output = anyhow::Result<R>> + 'static,
        R: 'static,
    {
        let name = self.name.unwrap_or(type_name::<F>().into());
        let thunk = Thunk::new(self.args, move |args: A::Output| callable.invoke(args));

        self.graph.add_node(name, Box::new(thunk))
    }
}
