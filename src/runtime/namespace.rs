//! Evaluation namespaces
//!
//! Every invocation gets exactly one fresh [`Namespace`]: an empty global
//! scope plus the typed [`ResultSlot`] that receives the value of a captured
//! tail expression. Function calls create their own local [`Scope`]s.

use crate::runtime::value::{dismantle, Value};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A mutable name → value mapping shared between frames and closures
pub type Scope = Rc<RefCell<FxHashMap<String, Value>>>;

pub fn new_scope() -> Scope {
    Rc::new(RefCell::new(FxHashMap::default()))
}

/// Holds the tail expression's value. Written at most once per run.
#[derive(Debug, Default)]
pub struct ResultSlot {
    value: Option<Value>,
}

impl ResultSlot {
    pub fn store(&mut self, value: Value) {
        if self.value.is_some() {
            tracing::debug!("result slot written more than once");
        }
        self.value = Some(value);
    }

    pub fn is_written(&self) -> bool {
        self.value.is_some()
    }

    pub fn take(&mut self) -> Option<Value> {
        self.value.take()
    }
}

/// The global scope and result slot of one invocation
#[derive(Debug)]
pub struct Namespace {
    pub globals: Scope,
    pub result: ResultSlot,
}

impl Namespace {
    /// An empty namespace; built-ins are resolved separately and never stored here
    pub fn fresh() -> Self {
        Self {
            globals: new_scope(),
            result: ResultSlot::default(),
        }
    }
}

impl Drop for Namespace {
    fn drop(&mut self) {
        let bindings: Vec<Value> = self
            .globals
            .borrow_mut()
            .drain()
            .map(|(_, value)| value)
            .collect();
        dismantle(bindings.into_iter().chain(self.result.take()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_namespaces_are_independent() {
        let first = Namespace::fresh();
        let second = Namespace::fresh();
        first
            .globals
            .borrow_mut()
            .insert("x".to_string(), Value::Int(1));
        assert!(second.globals.borrow().is_empty());
        assert!(!Rc::ptr_eq(&first.globals, &second.globals));
    }

    #[test]
    fn test_result_slot() {
        let mut slot = ResultSlot::default();
        assert!(!slot.is_written());
        slot.store(Value::Int(10));
        assert!(slot.is_written());
        assert!(matches!(slot.take(), Some(Value::Int(10))));
        assert!(slot.take().is_none());
    }
}
