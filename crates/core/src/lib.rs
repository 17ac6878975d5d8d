//! wisp-core: value representation and numeric tower for the wisp Scheme interpreter
//!
//! This crate provides the language-agnostic data model shared by the reader,
//! the evaluator, and the printer:
//!
//! - `value`: the tagged `Value` union (booleans, characters, symbols, strings,
//!   pairs, vectors, bytevectors, ports, procedures, promises, singletons)
//! - `numeric`: the R7RS numeric tower (machine integer, bignum, exact
//!   rational, inexact real, complex) with exactness contagion
//! - `symbol`: the process-wide symbol interning table
//! - `error`: first-class `Error` values and their category tags
//! - `buffer`: the append-only growable byte buffer used by memory ports
//!   and the printer

pub mod buffer;
pub mod error;
pub mod numeric;
pub mod symbol;
pub mod value;

pub use buffer::GrowableBuffer;
pub use error::{ErrorCategory, SchemeError};
pub use numeric::{complex, ComplexParts, Number};
pub use symbol::{intern, SpecialForm, Symbol};
pub use value::{
    deep_copy, is_eq, is_equal, is_eqv, BuiltinFn, BytevectorData, BytevectorKind, Environment, Formals, PairData,
    Port, PortBacking, PortDirection, PortKind, Procedure, PromiseData, PromiseStatus, SchemeString, StreamData,
    Value,
};
