//! Operators on runtime values
//!
//! Pure functions from operands to a result or an [`Exception`]; the
//! interpreter attaches source locations when one escapes.
//!
//! [`Exception`]: crate::interpreter::errors::Exception

pub mod access;
pub mod binary;
pub mod compare;
pub mod unary;
