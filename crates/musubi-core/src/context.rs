//! Per-execution context shared by the steps of one organizer.

use crate::step::StepName;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// A step body that actually ran, in the order it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Position of the step in its organizer.
    pub index: usize,
    /// Name of the step.
    pub name: StepName,
}

/// Execution context with heterogeneous value storage and a journal of
/// executed steps.
///
/// # Examples
///
/// ```
/// use musubi_core::Context;
///
/// let mut ctx = Context::new();
/// ctx.insert("user_id", 123u64);
/// ctx.insert("name", "Alice".to_string());
///
/// assert_eq!(ctx.get::<u64>("user_id"), Some(&123));
/// assert_eq!(ctx.get::<String>("user_id"), None);
/// assert!(ctx.executed().is_empty());
/// ```
pub struct Context {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
    journal: Vec<JournalEntry>,
    started_at: Instant,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("journal", &self.journal)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            journal: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Inserts a value, replacing any previous value under the same key.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Returns the value for `key` if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Mutable variant of [`Context::get`].
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Removes and returns the value for `key` if it is of type `T`.
    ///
    /// A value of another type is left in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.values
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends a step to the execution journal.
    pub fn record_execution(&mut self, index: usize, name: StepName) {
        self.journal.push(JournalEntry { index, name });
    }

    /// Journal of step bodies that ran, in order.
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Indices of the step bodies that ran, in order.
    pub fn executed(&self) -> Vec<usize> {
        self.journal.iter().map(|entry| entry.index).collect()
    }

    /// Returns the time elapsed since the context was created.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}
