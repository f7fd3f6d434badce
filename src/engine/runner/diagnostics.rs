use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;

use petgraph::graph::NodeIndex;

use crate::engine::{GraphId, Handle, TaskExecution};

/// A record of which callbacks ran, in which order and for how long.
///
/// Only actual executions are recorded. Requests answered from a memo, and
/// tasks that never ran because a dependency failed, leave no trace here.
///
/// The report is a snapshot: it carries the task names it needs and stays
/// valid on its own, independent of the graph it was taken from.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub(crate) graph: GraphId,
    pub(crate) executions: Vec<(NodeIndex, TaskExecution)>,
    pub(crate) names: HashMap<NodeIndex, Cow<'static, str>>,
}

impl Diagnostics {
    /// Tasks in the order their callbacks ran.
    pub fn order(&self) -> Vec<Handle> {
        self.executions
            .iter()
            .map(|(index, _)| Handle::new(self.graph, *index))
            .collect()
    }

    pub fn get(&self, handle: Handle) -> Option<&TaskExecution> {
        if handle.graph != self.graph {
            return None;
        }

        self.executions
            .iter()
            .find(|(index, _)| *index == handle.index)
            .map(|(_, execution)| execution)
    }

    pub fn execution_times(&self) -> HashMap<NodeIndex, Duration> {
        self.executions
            .iter()
            .map(|(index, execution)| (*index, execution.duration))
            .collect()
    }

    pub fn total(&self) -> Duration {
        self.executions.iter().map(|(_, e)| e.duration).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    /// Name of an executed task.
    pub fn name(&self, handle: Handle) -> Option<&str> {
        if handle.graph != self.graph {
            return None;
        }

        self.names.get(&handle.index).map(|name| &name[..])
    }

    /// Renders a plain-text report, one line per executed task.
    pub fn render(&self) -> String {
        use std::fmt::Write;

        let mut output = String::new();

        if self.executions.is_empty() {
            output.push_str("No tasks ran\n");
            return output;
        }

        let width = self
            .executions
            .iter()
            .map(|(index, _)| self.task_name(*index).len())
            .max()
            .unwrap_or(0);

        for (step, (index, execution)) in self.executions.iter().enumerate() {
            let name = self.task_name(*index);
            let micros = execution.duration.as_micros();

            // Writing to a String is infallible.
            let _ = writeln!(
                output,
                "{:>4}  #{:<5} {:<width$}  {:>8}µs",
                step + 1,
                index.index(),
                name,
                micros,
                width = width,
            );
        }

        let _ = writeln!(output, "total {}µs", self.total().as_micros());
        output
    }

    fn task_name(&self, index: NodeIndex) -> &str {
        self.names.get(&index).map_or("?", |name| &name[..])
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::TaskGraph;

    #[test]
    fn test_records_only_executions() {
        let mut graph = TaskGraph::new();
        let a = graph.task().name("a").run(|| 1i32);
        let fa = graph.future::<i32>(a);
        let b = graph.task().name("b").args((fa,)).run(|x: i32| x * 2);
        let _unused = graph.task().name("unused").run(|| 0i32);

        graph.get_result::<i32>(b).unwrap();
        graph.get_result::<i32>(b).unwrap();

        let diagnostics = graph.diagnostics();
        assert_eq!(diagnostics.order(), vec![a, b]);
        assert!(diagnostics.get(a).is_some());
        assert_eq!(diagnostics.execution_times().len(), 2);
    }

    #[test]
    fn test_render() {
        let mut graph = TaskGraph::new();
        let a = graph.task().name("alpha").run(|| 1i32);
        graph.get_result::<i32>(a).unwrap();

        let report = graph.diagnostics().render();
        assert!(report.contains("alpha"));
        assert!(report.starts_with("   1  #0"));
        assert!(report.ends_with("µs\n"));
    }

    #[test]
    fn test_render_empty() {
        let graph = TaskGraph::new();
        assert_eq!(graph.diagnostics().render(), "No tasks ran\n");
    }

    #[test]
    fn test_outlives_graph() {
        let mut graph = TaskGraph::new();
        let a = graph.task().name("first").run(|| 1i32);
        let fa = graph.future::<i32>(a);
        let b = graph.task().name("second").args((fa,)).run(|x: i32| x + 1);
        graph.execute_all().unwrap();

        let diagnostics = graph.diagnostics();
        drop(graph);

        let report = diagnostics.render();
        assert!(report.contains("first"));
        assert!(report.contains("second"));
        assert_eq!(report.lines().count(), 3);
        assert_eq!(diagnostics.name(b), Some("second"));
    }

    #[test]
    fn test_foreign_handle_has_no_entry() {
        let mut graph = TaskGraph::new();
        let mut other = TaskGraph::new();

        let ours = graph.add(|| 1i32, ());
        let theirs = other.add(|| 1i32, ());
        graph.execute_all().unwrap();
        other.execute_all().unwrap();

        let diagnostics = graph.diagnostics();
        assert!(diagnostics.get(ours).is_some());
        assert!(diagnostics.get(theirs).is_none());
        assert_eq!(diagnostics.name(theirs), None);
    }
}
