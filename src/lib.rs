#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod core;
mod engine;
mod error;
mod graph;
#[cfg(feature = "logging")]
mod utils;

pub use crate::core::{Dynamic, Forcing, Memo, Options};
pub use crate::engine::{
    Argument, Arguments, Callable, Dependency, Diagnostics, Future, Handle, Lit, TaskExecution,
};
pub use crate::error::{GraphError, TaskError};
pub use crate::graph::{TaskBinder, TaskDef, TaskGraph};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
