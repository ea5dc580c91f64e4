//! Runtime data model shared by the interpreter and the executor
//!
//! - [`value`]: the [`Value`] enum and its containers
//! - [`namespace`]: scopes and the per-invocation result slot
//! - [`format`]: `repr`/`str` rendering and the formatting mini-languages

pub mod format;
pub mod namespace;
pub mod value;

pub use namespace::{Namespace, ResultSlot, Scope};
pub use value::{Dict, Value};
