mod diagnostics;

use std::time::{Duration, Instant};

use petgraph::graph::NodeIndex;
use tracing::Level;

use crate::core::{Dynamic, Forcing};
use crate::engine::task::TaskContext;
use crate::engine::{Dependency, Handle};
use crate::error::GraphError;
use crate::graph::TaskGraph;

pub use diagnostics::Diagnostics;

#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub start: Instant,
    pub duration: Duration,
}

/// Forces a task: makes sure its result is computed and returns it.
///
/// A resolved task answers straight from its memo. An unresolved one has its
/// arguments resolved from left to right, forcing every future argument on the
/// way, and then runs its callback exactly once.
pub(crate) fn force(graph: &TaskGraph, handle: Handle) -> Result<&Dynamic, GraphError> {
    let index = graph.locate(handle)?;
    let node = &graph.graph[index];

    if node.is_resolved() {
        return node.result();
    }

    if let Forcing::WorkStack = graph.options.forcing {
        resolve_dependencies(graph, index);
    }

    evaluate(graph, index)
}

fn evaluate(graph: &TaskGraph, index: NodeIndex) -> Result<&Dynamic, GraphError> {
    let node = &graph.graph[index];

    let span = tracing::span!(Level::INFO, "task", name = %node.name);
    let _enter = span.enter();

    let context = TaskContext {
        graph,
        index,
        name: &node.name[..],
    };

    node.evaluate(&context)
}

struct Frame {
    index: NodeIndex,
    dependencies: Vec<Dependency>,
    next: usize,
}

impl Frame {
    fn new(graph: &TaskGraph, index: NodeIndex) -> Self {
        Self {
            index,
            dependencies: graph.graph[index].task().dependencies(),
            next: 0,
        }
    }
}

/// Evaluates every unresolved task that `root` transitively depends on,
/// without recursing on the call stack.
///
/// The walk is a post-order traversal in which the children of a task are
/// visited in argument order. That is the same order in which plain recursive
/// forcing would run them, so the two strategies can't be told apart by the
/// order of side effects. Once the walk is done, binding the arguments of
/// `root` only ever hits memoized results.
///
/// A dependency that fails, or whose output can't be bound to the argument
/// waiting for it, ends the descent: recursive forcing would not look at any
/// later sibling either. The tasks still on the stack are then evaluated
/// innermost first, and each of them fails while binding the argument that
/// broke, without running its callback.
fn resolve_dependencies(graph: &TaskGraph, root: NodeIndex) {
    let mut stack = vec![Frame::new(graph, root)];
    let mut failed = false;

    while let Some(frame) = stack.last_mut() {
        if !failed && let Some(&dependency) = frame.dependencies.get(frame.next) {
            frame.next += 1;

            let Ok(index) = graph.locate(dependency.handle) else {
                failed = true;
                continue;
            };

            let node = &graph.graph[index];
            if node.is_resolved() {
                failed = !matches!(node.result(), Ok(value) if dependency.accepts(value));
            } else {
                stack.push(Frame::new(graph, index));
            }
            continue;
        }

        let index = frame.index;
        stack.pop();

        // The root is left for the caller.
        if index == root {
            break;
        }

        // Every frame below the root was pushed right after its parent
        // advanced past it.
        let expected = stack
            .last()
            .and_then(|parent| parent.dependencies.get(parent.next - 1));

        failed = match evaluate(graph, index) {
            Ok(value) => expected.is_some_and(|dependency| !dependency.accepts(value)),
            Err(_) => true,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Options;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// `top` takes (right, 10, left), and both sides take `base`.
    fn diamond(forcing: Forcing) -> (TaskGraph, Handle, Rc<RefCell<Vec<&'static str>>>) {
        let mut graph = TaskGraph::with_options(Options { forcing });
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        let base = graph.add(
            move || {
                l.borrow_mut().push("base");
                1i32
            },
            (),
        );

        let l = log.clone();
        let left = graph.add(
            move |x: i32| {
                l.borrow_mut().push("left");
                x + 1
            },
            (graph.future::<i32>(base),),
        );

        let l = log.clone();
        let right = graph.add(
            move |x: i32| {
                l.borrow_mut().push("right");
                x + 2
            },
            (graph.future::<i32>(base),),
        );

        let l = log.clone();
        let top = graph.add(
            move |a: i32, k: i32, b: i32| {
                l.borrow_mut().push("top");
                a * k + b
            },
            (graph.future::<i32>(right), 10i32, graph.future::<i32>(left)),
        );

        (graph, top, log)
    }

    #[test]
    fn test_strategies_agree_on_order() {
        for forcing in [Forcing::Recursive, Forcing::WorkStack] {
            let (graph, top, log) = diamond(forcing);

            assert_eq!(graph.get_result::<i32>(top).unwrap(), 32);
            assert_eq!(*log.borrow(), vec!["base", "right", "left", "top"]);
        }
    }

    #[test]
    fn test_walk_skips_resolved() {
        let (graph, top, log) = diamond(Forcing::WorkStack);
        let left = graph.dependencies(top)[1];

        assert_eq!(graph.get_result::<i32>(left).unwrap(), 2);
        assert_eq!(*log.borrow(), vec!["base", "left"]);

        assert_eq!(graph.get_result::<i32>(top).unwrap(), 32);
        assert_eq!(*log.borrow(), vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn test_failure_stops_siblings() {
        for forcing in [Forcing::Recursive, Forcing::WorkStack] {
            let mut graph = TaskGraph::with_options(Options { forcing });
            let log = Rc::new(RefCell::new(Vec::new()));

            let failing = graph.try_add(
                || -> anyhow::Result<i32> { anyhow::bail!("bad input") },
                (),
            );

            let l = log.clone();
            let sibling = graph.add(
                move || {
                    l.borrow_mut().push("sibling");
                    1i32
                },
                (),
            );

            let l = log.clone();
            let top = graph.add(
                move |a: i32, b: i32| {
                    l.borrow_mut().push("top");
                    a + b
                },
                (graph.future::<i32>(failing), graph.future::<i32>(sibling)),
            );

            assert!(matches!(graph.get_result::<i32>(top), Err(GraphError::Task(..))));
            assert!(log.borrow().is_empty());
            assert!(!graph.is_resolved(sibling));
            assert!(graph.is_resolved(top));
        }
    }

    /// `top` takes futures of (wide, sibling) as `i32`, and `wide` yields `i64`.
    fn mismatched(forcing: Forcing, log: &Rc<RefCell<String>>) -> (TaskGraph, [Handle; 3]) {
        let mut graph = TaskGraph::with_options(Options { forcing });

        let l = log.clone();
        let wide = graph.add(
            move || {
                l.borrow_mut().push('A');
                1i64
            },
            (),
        );

        let l = log.clone();
        let sibling = graph.add(
            move || {
                l.borrow_mut().push('B');
                2i32
            },
            (),
        );

        let l = log.clone();
        let top = graph.add(
            move |a: i32, b: i32| {
                l.borrow_mut().push('X');
                a + b
            },
            (graph.future::<i32>(wide), graph.future::<i32>(sibling)),
        );

        (graph, [wide, sibling, top])
    }

    #[test]
    fn test_mismatch_stops_siblings() {
        for forcing in [Forcing::Recursive, Forcing::WorkStack] {
            let log = Rc::new(RefCell::new(String::new()));
            let (graph, [_, sibling, top]) = mismatched(forcing, &log);

            assert!(matches!(
                graph.get_result::<i32>(top),
                Err(GraphError::TypeMismatch { expected: "i32", found: "i64" })
            ));
            assert_eq!(log.borrow().as_str(), "A", "{forcing:?}");
            assert!(!graph.is_resolved(sibling));
        }
    }

    #[test]
    fn test_resolved_mismatch_stops_siblings() {
        for forcing in [Forcing::Recursive, Forcing::WorkStack] {
            let log = Rc::new(RefCell::new(String::new()));
            let (graph, [wide, sibling, top]) = mismatched(forcing, &log);

            assert_eq!(graph.get_result::<i64>(wide).unwrap(), 1);
            assert!(graph.get_result::<i32>(top).is_err());
            assert_eq!(log.borrow().as_str(), "A", "{forcing:?}");
            assert!(!graph.is_resolved(sibling));
        }
    }

    #[test]
    fn test_nested_mismatch_unwinds_without_running() {
        for forcing in [Forcing::Recursive, Forcing::WorkStack] {
            let mut graph = TaskGraph::with_options(Options { forcing });
            let log = Rc::new(RefCell::new(String::new()));

            let wide = graph.add(|| 1i64, ());

            let l = log.clone();
            let middle = graph.add(
                move |x: i32| {
                    l.borrow_mut().push('M');
                    x
                },
                (graph.future::<i32>(wide),),
            );

            let l = log.clone();
            let sibling = graph.add(
                move || {
                    l.borrow_mut().push('B');
                    2i32
                },
                (),
            );

            let top = graph.add(
                |a: i32, b: i32| a + b,
                (graph.future::<i32>(middle), graph.future::<i32>(sibling)),
            );

            assert!(matches!(
                graph.get_result::<i32>(top),
                Err(GraphError::TypeMismatch { .. })
            ));
            assert!(log.borrow().is_empty(), "{forcing:?}");
            assert!(graph.is_resolved(middle));
            assert!(!graph.is_resolved(sibling));
        }
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let mut graph = TaskGraph::new();

        let mut last = graph.add(|| 0u64, ());
        for _ in 0..100_000 {
            last = graph.add(|x: u64| x + 1, (graph.future::<u64>(last),));
        }

        assert_eq!(graph.get_result::<u64>(last).unwrap(), 100_000);
    }
}
