mod callable;
mod handle;
mod node;
mod runner;
mod task;

pub use crate::engine::callable::Callable;
pub use crate::engine::handle::{Dependency, Future, Handle};
pub use crate::engine::runner::{Diagnostics, TaskExecution};

pub(crate) use crate::engine::handle::GraphId;
pub(crate) use crate::engine::node::TaskNode;
pub(crate) use crate::engine::runner::force;
pub(crate) use crate::engine::task::{Task, Thunk};

use crate::error::GraphError;
use crate::graph::TaskGraph;

/// A single argument slot of a task.
///
/// An argument is either a literal value, handed to the callback as a fresh
/// clone, or a [`Future`] that forces another task and hands over its output.
pub trait Argument {
    /// The type the callback receives in this slot.
    type Output;

    /// The task this argument waits for, if any, and the type it expects.
    fn dependency(&self) -> Option<Dependency>;

    fn resolve(&self, graph: &TaskGraph) -> Result<Self::Output, GraphError>;
}

/// Wraps any cloneable value so it can be used as a literal argument.
///
/// Common scalar types and strings are accepted as arguments directly; `Lit`
/// covers everything else.
///
/// ```rust
/// use lazydag::{Lit, TaskGraph};
///
/// let mut graph = TaskGraph::new();
/// let sum = graph.add(|xs: Vec<i32>| xs.iter().sum::<i32>(), (Lit(vec![1, 2, 3]),));
/// assert_eq!(graph.get_result::<i32>(sum).unwrap(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Lit<T>(pub T);

impl<T> Argument for Lit<T>
where
    T: Clone,
{
    type Output = T;

    fn dependency(&self) -> Option<Dependency> {
        None
    }

    fn resolve(&self, _: &TaskGraph) -> Result<Self::Output, GraphError> {
        Ok(self.0.clone())
    }
}

macro_rules! impl_literal {
    ($($T:ty),*) => {
        $(
            impl Argument for $T {
                type Output = $T;

                fn dependency(&self) -> Option<Dependency> {
                    None
                }

                fn resolve(&self, _: &TaskGraph) -> Result<Self::Output, GraphError> {
                    Ok(self.clone())
                }
            }
        )*
    };
}

impl_literal!(bool, char, String, &'static str);
impl_literal!(i8, i16, i32, i64, i128, isize);
impl_literal!(u8, u16, u32, u64, u128, usize);
impl_literal!(f32, f64);

/// The ordered argument list of a task.
///
/// This trait is implemented for tuples of [`Argument`]s, allowing them to be
/// passed as the `args` parameter of [`TaskGraph::add`]. Arguments are resolved
/// strictly from left to right, so sibling dependencies are forced in the
/// order in which they appear.
pub trait Arguments {
    /// The tuple of values the callback is invoked with.
    type Output;

    /// Returns every future argument, in argument order.
    fn dependencies(&self) -> Vec<Dependency>;

    /// Resolves every argument, forcing future arguments as they come up.
    ///
    /// Resolution stops at the first argument that fails; the remaining
    /// futures are left untouched.
    fn resolve(&self, graph: &TaskGraph) -> Result<Self::Output, GraphError>;
}

impl Arguments for () {
    type Output = ();

    fn dependencies(&self) -> Vec<Dependency> {
        vec![]
    }

    fn resolve(&self, _: &TaskGraph) -> Result<Self::Output, GraphError> {
        Ok(())
    }
}

macro_rules! impl_args {
    ($($A:ident),*) => {
        #[allow(non_snake_case)]
        impl<$($A),*> Arguments for ($($A,)*)
        where
            $($A: Argument),* {
            type Output = ($($A::Output,)*);

            fn dependencies(&self) -> Vec<Dependency> {
                let ($($A,)*) = self;
                [$(Argument::dependency($A),)*].into_iter().flatten().collect()
            }

            fn resolve(&self, graph: &TaskGraph) -> Result<Self::Output, GraphError> {
                let ($($A,)*) = self;
                Ok(($($A.resolve(graph)?,)*))
            }
        }
    };
}

impl_args!(A);
impl_args!(A, B);
impl_args!(A, B, C);
impl_args!(A, B, C, D);
impl_args!(A, B, C, D, E);
impl_args!(A, B, C, D, E, F);
impl_args!(A, B, C, D, E, F, G);
impl_args!(A, B, C, D, E, F, G, H);
impl_args!(A, B, C, D, E, F, G, H, I);
impl_args!(A, B, C, D, E, F, G, H, I, J);
impl_args!(A, B, C, D, E, F, G, H, I, J, K);
impl_args!(A, B, C, D, E, F, G, H, I, J, K, L);
