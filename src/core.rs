use std::any::{Any, TypeId, type_name};
use std::cell::OnceCell;
use std::rc::Rc;

use crate::error::GraphError;

/// A type-erased container for a single value.
///
/// The concrete type is fixed when the container is created and is checked
/// again every time the value is read back. Asking for any other type yields
/// [`GraphError::TypeMismatch`] instead of a coerced value.
///
/// The payload is immutable once stored, so clones share it; a clone is
/// indistinguishable from a deep copy and keeps the original type.
#[derive(Clone)]
pub struct Dynamic {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

impl Dynamic {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            value: Rc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the type this container was created with.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: 'static>(&self) -> bool {
        (*self.value).is::<T>()
    }

    pub(crate) fn value_type_id(&self) -> TypeId {
        (*self.value).type_id()
    }

    /// Borrows the stored value as `T`.
    ///
    /// # Errors
    /// [`GraphError::TypeMismatch`] if `T` is not exactly the stored type.
    pub fn downcast_ref<T: 'static>(&self) -> Result<&T, GraphError> {
        (*self.value)
            .downcast_ref::<T>()
            .ok_or_else(|| GraphError::mismatch::<T>(self.type_name))
    }

    /// Clones the stored value out as `T`.
    pub fn downcast<T: Clone + 'static>(&self) -> Result<T, GraphError> {
        self.downcast_ref::<T>().cloned()
    }
}

/// An empty container holds `false`.
impl Default for Dynamic {
    fn default() -> Self {
        Dynamic::new(false)
    }
}

impl std::fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dynamic({})", self.type_name)
    }
}

/// A write-once cell caching the result of a task.
///
/// The cell starts empty and can be filled exactly once. It is never cleared
/// afterwards.
pub struct Memo<T> {
    cell: OnceCell<T>,
}

impl<T> Memo<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Stores `value` in an empty cell. A full cell keeps its value and hands
    /// the rejected one back.
    pub fn set(&self, value: T) -> Result<(), T> {
        self.cell.set(value)
    }

    /// # Errors
    /// [`GraphError::EmptyCell`] if nothing has been stored yet.
    pub fn get(&self) -> Result<&T, GraphError> {
        self.cell.get().ok_or(GraphError::EmptyCell)
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Memo").field(value).finish(),
            None => f.write_str("Memo(<empty>)"),
        }
    }
}

/// How a task's unresolved dependencies get evaluated when it is forced.
///
/// Both strategies run callbacks in exactly the same order; they only differ in
/// how much call stack a long dependency chain consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Forcing {
    /// Each future argument forces its task through a nested call, so stack
    /// depth grows with the longest dependency chain.
    Recursive,
    /// Dependencies are walked with an explicit stack before the task itself
    /// runs, keeping stack usage flat regardless of chain length.
    #[default]
    WorkStack,
}

/// Runtime configuration of a [`TaskGraph`](crate::TaskGraph).
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub forcing: Forcing,
}
