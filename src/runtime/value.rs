//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents every value a
//! snippet can compute. Scalars are stored inline; containers are shared
//! through `Rc` so that aliasing behaves the way snippet authors expect
//! (`b = a; b.append(1)` is visible through `a`).
//!
//! # Value Types
//!
//! - [`Value::None`], [`Value::Bool`], [`Value::Int`] (64-bit, checked), [`Value::Float`]
//! - [`Value::Str`]: immutable text
//! - [`Value::List`], [`Value::Tuple`], [`Value::Dict`] (insertion ordered), [`Value::Range`]
//! - Callables: [`Value::Function`], [`Value::Builtin`], [`Value::BoundMethod`],
//!   [`Value::Type`], [`Value::ExceptionClass`]
//! - [`Value::Module`] for imported built-in modules and [`Value::Exception`] instances

use crate::interpreter::errors::{Exception, ExceptionKind};
use crate::parser::ast::FunctionDef;
use crate::runtime::namespace::Scope;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime values in the interpreter
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<Dict>>),
    Range(Range),
    Function(Rc<Function>),
    Builtin(Builtin),
    BoundMethod(Rc<BoundMethod>),
    Module(&'static str),
    Type(TypeName),
    ExceptionClass(ExceptionKind),
    Exception(Rc<Exception>),
}

/// Built-in types that can be named (and mostly called) from snippets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Dict,
    Range,
    Function,
    BuiltinFunction,
    Method,
    Module,
    Type,
}

impl TypeName {
    pub fn name(self) -> &'static str {
        match self {
            TypeName::NoneType => "NoneType",
            TypeName::Bool => "bool",
            TypeName::Int => "int",
            TypeName::Float => "float",
            TypeName::Str => "str",
            TypeName::List => "list",
            TypeName::Tuple => "tuple",
            TypeName::Dict => "dict",
            TypeName::Range => "range",
            TypeName::Function => "function",
            TypeName::BuiltinFunction => "builtin_function_or_method",
            TypeName::Method => "method",
            TypeName::Module => "module",
            TypeName::Type => "type",
        }
    }
}

/// A native function, optionally belonging to a built-in module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub module: Option<&'static str>,
    pub name: &'static str,
}

impl Builtin {
    pub const fn global(name: &'static str) -> Self {
        Self { module: None, name }
    }

    pub const fn in_module(module: &'static str, name: &'static str) -> Self {
        Self {
            module: Some(module),
            name,
        }
    }
}

/// A user-defined function or lambda, with its evaluated defaults and the
/// enclosing function scopes it closes over
pub struct Function {
    pub def: Rc<FunctionDef>,
    /// Default values for the trailing parameters that declare one
    pub defaults: Vec<Value>,
    pub closure: Vec<Scope>,
    /// Names the body declares `global`
    pub global_names: Rc<FxHashSet<String>>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Closures may contain the function itself
        f.debug_struct("Function")
            .field("name", &self.def.name)
            .field("params", &self.def.params.len())
            .finish()
    }
}

/// A method looked up on a value, e.g. `xs.append`
#[derive(Debug, Clone)]
pub struct BoundMethod {
    pub receiver: Value,
    pub name: String,
}

/// `range(start, stop, step)`; step is never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Range {
    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let count = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / (-step) + 1
        } else {
            0
        };
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, which must be below `len()`
    pub fn get(&self, index: usize) -> i64 {
        (self.start as i128 + index as i128 * self.step as i128) as i64
    }

    pub fn contains(&self, value: i64) -> bool {
        let in_bounds = if self.step > 0 {
            self.start <= value && value < self.stop
        } else {
            self.stop < value && value <= self.start
        };
        in_bounds && (value as i128 - self.start as i128) % self.step as i128 == 0
    }
}

impl Value {
    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Value::Str(text.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    pub fn dict(dict: Dict) -> Self {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    /// Name of the value's type as shown in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Exception(exception) => exception.kind.name(),
            other => other.type_tag().name(),
        }
    }

    /// The built-in type of a non-exception value
    pub fn type_tag(&self) -> TypeName {
        match self {
            Value::None => TypeName::NoneType,
            Value::Bool(_) => TypeName::Bool,
            Value::Int(_) => TypeName::Int,
            Value::Float(_) => TypeName::Float,
            Value::Str(_) => TypeName::Str,
            Value::List(_) => TypeName::List,
            Value::Tuple(_) => TypeName::Tuple,
            Value::Dict(_) => TypeName::Dict,
            Value::Range(_) => TypeName::Range,
            Value::Function(_) => TypeName::Function,
            Value::Builtin(_) => TypeName::BuiltinFunction,
            Value::BoundMethod(_) => TypeName::Method,
            Value::Module(_) => TypeName::Module,
            Value::Type(_) | Value::ExceptionClass(_) | Value::Exception(_) => TypeName::Type,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Truth value testing
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(dict) => !dict.borrow().is_empty(),
            Value::Range(range) => !range.is_empty(),
            _ => true,
        }
    }

    /// Integer view of ints and bools
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of any real number
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// `==` semantics: numbers compare across int/float/bool, containers element-wise
    pub fn py_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Float(_) | Value::Int(_) | Value::Bool(_), Value::Float(_) | Value::Int(_) | Value::Bool(_)) => {
                match (self.as_int(), other.as_int()) {
                    (Some(a), Some(b)) => a == b,
                    _ => self.as_float() == other.as_float(),
                }
            }
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || sequences_equal(&a.borrow(), &b.borrow())
            }
            (Value::Tuple(a), Value::Tuple(b)) => sequences_equal(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b) || a.borrow().content_eq(&b.borrow()),
            (Value::Range(a), Value::Range(b)) => {
                let (len_a, len_b) = (a.len(), b.len());
                len_a == len_b && (len_a == 0 || (a.start == b.start && (len_a == 1 || a.step == b.step)))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::BoundMethod(a), Value::BoundMethod(b)) => {
                a.name == b.name && a.receiver.is_same(&b.receiver)
            }
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::ExceptionClass(a), Value::ExceptionClass(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `is` semantics. Immutable scalars compare by value.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => Rc::ptr_eq(a, b),
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::ExceptionClass(a), Value::ExceptionClass(b)) => a == b,
            _ => false,
        }
    }
}

fn sequences_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

/// Hashable projection of a value, used as a dict key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Tuple(Vec<HashKey>),
    Range(i64, i64, i64),
    Type(TypeName),
    ExceptionClass(ExceptionKind),
}

impl HashKey {
    pub fn from_value(value: &Value) -> Result<Self, Exception> {
        let key = match value {
            Value::None => HashKey::None,
            Value::Bool(b) => HashKey::Int(i64::from(*b)),
            Value::Int(n) => HashKey::Int(*n),
            Value::Float(f) => {
                // Equal numbers hash equal: 1.0 and 1 are the same key
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    HashKey::Int(*f as i64)
                } else {
                    HashKey::Float(f.to_bits())
                }
            }
            Value::Str(s) => HashKey::Str(Rc::clone(s)),
            Value::Tuple(items) => HashKey::Tuple(
                items
                    .iter()
                    .map(HashKey::from_value)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Range(r) => HashKey::Range(r.start, r.stop, r.step),
            Value::Type(t) => HashKey::Type(*t),
            Value::ExceptionClass(kind) => HashKey::ExceptionClass(*kind),
            other => {
                return Err(Exception::new(
                    ExceptionKind::TypeError,
                    format!("unhashable type: '{}'", other.type_name()),
                ));
            }
        };
        Ok(key)
    }
}

/// Insertion-ordered dictionary
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
    index: FxHashMap<HashKey, usize>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>, Exception> {
        let hash = HashKey::from_value(key)?;
        Ok(self.index.get(&hash).map(|&i| self.entries[i].1.clone()))
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool, Exception> {
        let hash = HashKey::from_value(key)?;
        Ok(self.index.contains_key(&hash))
    }

    /// Insert or overwrite; an existing key keeps its original position
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), Exception> {
        let hash = HashKey::from_value(&key)?;
        match self.index.get(&hash) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(hash, self.entries.len());
                self.entries.push((key, value));
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> Result<Option<Value>, Exception> {
        let hash = HashKey::from_value(key)?;
        let Some(position) = self.index.remove(&hash) else {
            return Ok(None);
        };
        let (_, value) = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Ok(Some(value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn items(&self) -> Vec<(Value, Value)> {
        self.entries.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries
    }

    /// Remove and return the most recently inserted entry
    pub fn pop_last(&mut self) -> Option<(Value, Value)> {
        let (key, value) = self.entries.pop()?;
        if let Ok(hash) = HashKey::from_value(&key) {
            self.index.remove(&hash);
        }
        Some((key, value))
    }

    fn content_eq(&self, other: &Dict) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(key, value)| {
                matches!(other.get(key), Ok(Some(theirs)) if theirs.py_eq(value))
            })
    }
}

/// Drop values without recursing through nested containers.
///
/// Containers owned solely by `values` are emptied onto a work list, so a
/// list nested thousands of levels deep is released in constant stack space.
pub fn dismantle(values: impl IntoIterator<Item = Value>) {
    let mut pending: Vec<Value> = values.into_iter().collect();
    while let Some(value) = pending.pop() {
        match value {
            Value::List(items) => {
                if let Ok(cell) = Rc::try_unwrap(items) {
                    pending.extend(cell.into_inner());
                }
            }
            Value::Tuple(mut items) => {
                if let Some(slots) = Rc::get_mut(&mut items) {
                    pending.extend(slots.iter_mut().map(std::mem::take));
                }
            }
            Value::Dict(dict) => {
                if let Ok(cell) = Rc::try_unwrap(dict) {
                    for (key, value) in cell.into_inner().into_entries() {
                        pending.push(key);
                        pending.push(value);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dismantle_deeply_nested_list() {
        let mut value = Value::list(Vec::new());
        for _ in 0..200_000 {
            value = Value::list(vec![value, Value::tuple(vec![Value::Int(1)])]);
        }
        let alias = match &value {
            Value::List(items) => Rc::clone(items),
            other => panic!("expected list, got {:?}", other),
        };
        dismantle(vec![value]);
        // Shared containers are left to their other owners
        assert_eq!(alias.borrow().len(), 2);
        let inner = std::mem::take(&mut *alias.borrow_mut());
        dismantle(inner);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::list(Vec::new()).is_truthy());
        assert!(Value::tuple(vec![Value::None]).is_truthy());
        assert!(!Value::Range(Range { start: 3, stop: 3, step: 1 }).is_truthy());
    }

    #[test]
    fn test_numeric_equality_crosses_types() {
        assert!(Value::Int(1).py_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).py_eq(&Value::Int(1)));
        assert!(!Value::Int(1).py_eq(&Value::from("1")));
        assert!(!Value::list(vec![]).py_eq(&Value::tuple(vec![])));
    }

    #[test]
    fn test_range_len_and_contains() {
        let r = Range { start: 0, stop: 10, step: 3 };
        assert_eq!(r.len(), 4);
        assert_eq!(r.get(3), 9);
        assert!(r.contains(6));
        assert!(!r.contains(7));

        let down = Range { start: 5, stop: 0, step: -2 };
        assert_eq!(down.len(), 3);
        assert!(down.contains(1));
        assert!(!down.contains(0));
    }

    #[test]
    fn test_dict_preserves_insertion_order() {
        let mut dict = Dict::new();
        dict.insert(Value::from("b"), Value::Int(1)).unwrap();
        dict.insert(Value::from("a"), Value::Int(2)).unwrap();
        dict.insert(Value::from("b"), Value::Int(3)).unwrap();

        let keys: Vec<String> = dict
            .keys()
            .iter()
            .map(|k| k.as_str().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(matches!(dict.get(&Value::from("b")), Ok(Some(Value::Int(3)))));
    }

    #[test]
    fn test_dict_remove_reindexes() {
        let mut dict = Dict::new();
        for i in 0..4 {
            dict.insert(Value::Int(i), Value::Int(i * 10)).unwrap();
        }
        assert!(matches!(dict.remove(&Value::Int(1)), Ok(Some(Value::Int(10)))));
        assert!(matches!(dict.get(&Value::Int(3)), Ok(Some(Value::Int(30)))));
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn test_equal_numbers_share_a_key() {
        let mut dict = Dict::new();
        dict.insert(Value::Int(1), Value::from("int")).unwrap();
        dict.insert(Value::Float(1.0), Value::from("float")).unwrap();
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_unhashable_key() {
        let mut dict = Dict::new();
        let err = dict.insert(Value::list(vec![]), Value::None).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::TypeError);
        assert_eq!(err.message(), "unhashable type: 'list'");
    }
}
