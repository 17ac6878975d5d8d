//! The tagged `Value` union and its constituent heap records.
//!
//! One `enum Value` with `Rc`-shared heap payloads for O(1) cloning and a
//! `*Data` struct per composite variant, using `Rc` rather than `Arc`: this
//! interpreter is strictly single-threaded, so there are no strands to
//! share a value with and no need to pay atomic-refcount overhead on every
//! `car`.

use crate::buffer::GrowableBuffer;
use crate::error::SchemeError;
use crate::numeric::{ComplexParts, Number};
use crate::symbol::{intern, Symbol};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;

/// An immutable, UTF-8-backed string with cached metadata for fast paths.
#[derive(Debug)]
pub struct SchemeString {
    bytes: String,
    grapheme_len: usize,
    ascii: bool,
}

impl SchemeString {
    pub fn new(s: impl Into<String>) -> Self {
        let bytes = s.into();
        let ascii = bytes.is_ascii();
        let grapheme_len = if ascii {
            bytes.len()
        } else {
            bytes.graphemes(true).count()
        };
        SchemeString { bytes, grapheme_len, ascii }
    }

    pub fn as_str(&self) -> &str {
        &self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Grapheme-cluster count: the chosen unit for `string-length` and
    /// `string-reverse` so the reported size matches what a user sees as
    /// one character, not the codepoint count underneath it.
    pub fn len(&self) -> usize {
        self.grapheme_len
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_ascii(&self) -> bool {
        self.ascii
    }

    pub fn graphemes(&self) -> Vec<&str> {
        self.bytes.graphemes(true).collect()
    }
}

/// A pair cell. `cached_len` is `-1` unless this pair heads a proper list
/// whose length has been computed; it is advisory only.
#[derive(Debug)]
pub struct PairData {
    pub car: RefCell<Value>,
    pub cdr: RefCell<Value>,
    pub cached_len: Cell<i64>,
}

impl PairData {
    pub fn new(car: Value, cdr: Value) -> Self {
        PairData {
            car: RefCell::new(car),
            cdr: RefCell::new(cdr),
            cached_len: Cell::new(-1),
        }
    }
}

/// The element type of a bytevector: a sized typed array over one of
/// {u8,s8,u16,s16,u32,s32,u64,s64}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytevectorKind {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
}

#[derive(Debug, Clone)]
pub enum BytevectorData {
    U8(Vec<u8>),
    S8(Vec<i8>),
    U16(Vec<u16>),
    S16(Vec<i16>),
    U32(Vec<u32>),
    S32(Vec<i32>),
    U64(Vec<u64>),
    S64(Vec<i64>),
}

impl BytevectorData {
    pub fn kind(&self) -> BytevectorKind {
        match self {
            BytevectorData::U8(_) => BytevectorKind::U8,
            BytevectorData::S8(_) => BytevectorKind::S8,
            BytevectorData::U16(_) => BytevectorKind::U16,
            BytevectorData::S16(_) => BytevectorKind::S16,
            BytevectorData::U32(_) => BytevectorKind::U32,
            BytevectorData::S32(_) => BytevectorKind::S32,
            BytevectorData::U64(_) => BytevectorKind::U64,
            BytevectorData::S64(_) => BytevectorKind::S64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BytevectorData::U8(v) => v.len(),
            BytevectorData::S8(v) => v.len(),
            BytevectorData::U16(v) => v.len(),
            BytevectorData::S16(v) => v.len(),
            BytevectorData::U32(v) => v.len(),
            BytevectorData::S32(v) => v.len(),
            BytevectorData::U64(v) => v.len(),
            BytevectorData::S64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Formal parameter shape of a closure: a proper list, a symbol (rest-arg),
/// or an improper list (fixed + rest).
#[derive(Debug, Clone)]
pub enum Formals {
    Fixed(Vec<Symbol>),
    Rest(Symbol),
    Mixed(Vec<Symbol>, Symbol),
}

/// Native function signature for builtins: `(environment, arguments) ->
/// value`. A plain `fn` rather than `Rc<dyn Fn>`: builtins are free
/// functions, never closures over interpreter state, so no captured
/// environment to box.
pub type BuiltinFn = fn(&Rc<Environment>, &[Value]) -> Result<Value, SchemeError>;

#[derive(Clone)]
pub enum Procedure {
    Builtin {
        name: Rc<str>,
        func: BuiltinFn,
    },
    Closure {
        name: RefCell<Option<Rc<str>>>,
        formals: Formals,
        body: Rc<[Value]>,
        env: Rc<Environment>,
    },
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Builtin { name, .. } => write!(f, "#<builtin {name}>"),
            Procedure::Closure { name, .. } => match &*name.borrow() {
                Some(n) => write!(f, "#<closure {n}>"),
                None => write!(f, "#<closure>"),
            },
        }
    }
}

impl Procedure {
    pub fn name(&self) -> Option<Rc<str>> {
        match self {
            Procedure::Builtin { name, .. } => Some(name.clone()),
            Procedure::Closure { name, .. } => name.borrow().clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseStatus {
    /// Not yet forced.
    Pending,
    /// Currently being forced (used to detect re-entrant `force`, §9).
    Forcing,
    /// Forced and memoized.
    Forced,
}

/// A lazily-evaluated, memoizing cell backing `delay`/`force`.
#[derive(Debug)]
pub struct PromiseData {
    pub status: Cell<PromiseStatus>,
    pub expr: RefCell<Option<Value>>,
    pub env: RefCell<Option<Rc<Environment>>>,
    pub value: RefCell<Option<Value>>,
}

impl PromiseData {
    pub fn new(expr: Value, env: Rc<Environment>) -> Self {
        PromiseData {
            status: Cell::new(PromiseStatus::Pending),
            expr: RefCell::new(Some(expr)),
            env: RefCell::new(Some(env)),
            value: RefCell::new(None),
        }
    }

    pub fn already_forced(value: Value) -> Self {
        PromiseData {
            status: Cell::new(PromiseStatus::Forced),
            expr: RefCell::new(None),
            env: RefCell::new(None),
            value: RefCell::new(Some(value)),
        }
    }
}

/// A stream cell: a realized head and a promise for the rest (spec
/// glossary: "Promise. A memoised delayed computation", applied to
/// `cons-stream`).
#[derive(Debug)]
pub struct StreamData {
    pub head: Value,
    pub tail: Value, // always a Value::Promise
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    TextFile,
    BinaryFile,
    MemoryText,
    MemoryBytes,
}

#[derive(Debug)]
pub enum PortBacking {
    File(std::fs::File),
    Memory(GrowableBuffer),
}

/// A port descriptor. The operation vtable lives in the
/// `wisp-runtime` crate (it needs to reach into process-wide default-port
/// state); this struct is just the shared, mutable record the vtable
/// operates on.
#[derive(Debug)]
pub struct Port {
    pub direction: PortDirection,
    pub kind: PortKind,
    pub path: Option<String>,
    pub backing: PortBacking,
    pub cursor: usize,
    pub open: bool,
}

/// A lexical environment frame: a name->value map plus an optional parent.
/// `define` mutates the innermost frame; `set!` walks the chain to find the
/// frame that already binds the name.
#[derive(Debug)]
pub struct Environment {
    vars: RefCell<HashMap<Symbol, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new_global() -> Rc<Environment> {
        Rc::new(Environment { vars: RefCell::new(HashMap::new()), parent: None })
    }

    pub fn new_child(parent: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    pub fn define(&self, name: Symbol, value: Value) {
        self.vars.borrow_mut().insert(name, value);
    }

    pub fn get(&self, name: &Symbol) -> Option<Value> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Walk the chain to the frame that binds `name` and rebind it there.
    /// Returns `false` if no frame binds it (an unbound `set!` is an error).
    pub fn set(&self, name: &Symbol, value: Value) -> bool {
        if self.vars.borrow().contains_key(name) {
            self.vars.borrow_mut().insert(name.clone(), value);
            return true;
        }
        match &self.parent {
            Some(p) => p.set(name, value),
            None => false,
        }
    }

    pub fn is_bound(&self, name: &Symbol) -> bool {
        self.vars.borrow().contains_key(name) || self.parent.as_ref().is_some_and(|p| p.is_bound(name))
    }
}

/// The tagged value union.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Char(char),
    String(Rc<SchemeString>),
    Symbol(Symbol),
    Integer(i64),
    BigInt(Rc<num_bigint::BigInt>),
    Rational(num_rational::Ratio<i64>),
    Real(f64),
    Complex(Rc<ComplexParts>),
    Pair(Rc<PairData>),
    Vector(Rc<RefCell<Vec<Value>>>),
    Bytevector(Rc<RefCell<BytevectorData>>),
    Procedure(Rc<Procedure>),
    Port(Rc<RefCell<Port>>),
    Promise(Rc<PromiseData>),
    Stream(Rc<StreamData>),
    Error(Rc<SchemeError>),
    Eof,
    Unspecified,
}

impl Value {
    pub fn nil() -> Value {
        Value::Nil
    }

    pub fn bool(b: bool) -> Value {
        Value::Bool(b)
    }

    pub fn symbol(name: &str) -> Value {
        Value::Symbol(intern(name))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(Rc::new(SchemeString::new(s)))
    }

    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Pair(Rc::new(PairData::new(car, cdr)))
    }

    pub fn vector(items: Vec<Value>) -> Value {
        Value::Vector(Rc::new(RefCell::new(items)))
    }

    pub fn from_number(n: Number) -> Value {
        match n {
            Number::Int(i) => Value::Integer(i),
            Number::Big(b) => Value::BigInt(Rc::new(b)),
            Number::Rat(r) => Value::Rational(r),
            Number::Real(f) => Value::Real(f),
            Number::Complex(c) => Value::Complex(Rc::new(*c)),
        }
    }

    /// Project a numeric `Value` variant into the tower's `Number`, or
    /// `None` if this value isn't numeric at all.
    pub fn to_number(&self) -> Option<Number> {
        match self {
            Value::Integer(i) => Some(Number::Int(*i)),
            Value::BigInt(b) => Some(Number::Big((**b).clone())),
            Value::Rational(r) => Some(Number::Rat(*r)),
            Value::Real(f) => Some(Number::Real(*f)),
            Value::Complex(c) => Some(Number::Complex(Box::new((**c).clone()))),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Integer(_) | Value::BigInt(_) | Value::Rational(_) | Value::Real(_) | Value::Complex(_)
        )
    }

    pub fn is_exact(&self) -> bool {
        self.to_number().map(|n| n.is_exact()).unwrap_or(false)
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Value::Pair(_))
    }

    pub fn car(&self) -> Option<Value> {
        match self {
            Value::Pair(p) => Some(p.car.borrow().clone()),
            _ => None,
        }
    }

    pub fn cdr(&self) -> Option<Value> {
        match self {
            Value::Pair(p) => Some(p.cdr.borrow().clone()),
            _ => None,
        }
    }

    /// Build a proper list from a vector of values.
    pub fn list(items: Vec<Value>) -> Value {
        let mut out = Value::Nil;
        for item in items.into_iter().rev() {
            out = Value::cons(item, out);
        }
        out
    }

    /// Collect a proper list into a `Vec`; `None` if the list is improper
    /// or cyclic (guarded by a length cap matching the pointer-chasing
    /// alternative of a cycle detector).
    pub fn list_to_vec(&self) -> Option<Vec<Value>> {
        let mut out = Vec::new();
        let mut cur = self.clone();
        loop {
            match cur {
                Value::Nil => return Some(out),
                Value::Pair(p) => {
                    out.push(p.car.borrow().clone());
                    cur = p.cdr.borrow().clone();
                }
                _ => return None,
            }
            if out.len() > 100_000_000 {
                return None; // defensive cap against an undetected cycle
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "null",
            Value::Bool(_) => "boolean",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Integer(_) | Value::BigInt(_) => "integer",
            Value::Rational(_) => "rational",
            Value::Real(_) => "real",
            Value::Complex(_) => "complex",
            Value::Pair(_) => "pair",
            Value::Vector(_) => "vector",
            Value::Bytevector(_) => "bytevector",
            Value::Procedure(_) => "procedure",
            Value::Port(_) => "port",
            Value::Promise(_) => "promise",
            Value::Stream(_) => "stream",
            Value::Error(_) => "error",
            Value::Eof => "eof-object",
            Value::Unspecified => "unspecified",
        }
    }
}

/// `eq?`: identity comparison. Atomic values that are process-wide
/// singletons (booleans, nil, eof, unspecified, small integers by value)
/// compare equal when their payloads match; everything heap-allocated
/// compares by pointer.
pub fn is_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) | (Value::Eof, Value::Eof) | (Value::Unspecified, Value::Unspecified) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::String(x), Value::String(y)) => Rc::ptr_eq(x, y),
        (Value::Pair(x), Value::Pair(y)) => Rc::ptr_eq(x, y),
        (Value::Vector(x), Value::Vector(y)) => Rc::ptr_eq(x, y),
        (Value::Bytevector(x), Value::Bytevector(y)) => Rc::ptr_eq(x, y),
        (Value::Procedure(x), Value::Procedure(y)) => Rc::ptr_eq(x, y),
        (Value::Port(x), Value::Port(y)) => Rc::ptr_eq(x, y),
        (Value::Promise(x), Value::Promise(y)) => Rc::ptr_eq(x, y),
        (Value::Stream(x), Value::Stream(y)) => Rc::ptr_eq(x, y),
        (Value::Error(x), Value::Error(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// `eqv?`: like `eq?` but numbers and characters compare by value and
/// exactness (two numbers are `eqv?` only if they agree on exactness too).
pub fn is_eqv(a: &Value, b: &Value) -> bool {
    if a.is_number() && b.is_number() {
        return a.is_exact() == b.is_exact()
            && crate::numeric::numeric_eq(&a.to_number().unwrap(), &b.to_number().unwrap());
    }
    is_eq(a, b)
}

/// `equal?`: recursive structural equality over pairs, vectors,
/// bytevectors, and strings; falls back to `eqv?` elsewhere.
pub fn is_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Pair(x), Value::Pair(y)) => {
            is_equal(&x.car.borrow(), &y.car.borrow()) && is_equal(&x.cdr.borrow(), &y.cdr.borrow())
        }
        (Value::Vector(x), Value::Vector(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| is_equal(a, b))
        }
        (Value::String(x), Value::String(y)) => x.as_str() == y.as_str(),
        (Value::Bytevector(x), Value::Bytevector(y)) => bytevectors_equal(&x.borrow(), &y.borrow()),
        _ => is_eqv(a, b),
    }
}

fn bytevectors_equal(a: &BytevectorData, b: &BytevectorData) -> bool {
    use BytevectorData::*;
    match (a, b) {
        (U8(x), U8(y)) => x == y,
        (S8(x), S8(y)) => x == y,
        (U16(x), U16(y)) => x == y,
        (S16(x), S16(y)) => x == y,
        (U32(x), U32(y)) => x == y,
        (S32(x), S32(y)) => x == y,
        (U64(x), U64(y)) => x == y,
        (S64(x), S64(y)) => x == y,
        _ => false,
    }
}

/// Recursive structural copy. Atomic/interned values are returned
/// unchanged; heap composites are rebuilt; closures keep sharing their
/// captured environment.
pub fn deep_copy(v: &Value) -> Value {
    match v {
        Value::Pair(p) => Value::cons(deep_copy(&p.car.borrow()), deep_copy(&p.cdr.borrow())),
        Value::Vector(items) => Value::vector(items.borrow().iter().map(deep_copy).collect()),
        Value::Bytevector(bv) => Value::Bytevector(Rc::new(RefCell::new(bv.borrow().clone()))),
        Value::String(s) => Value::string(s.as_str().to_string()),
        Value::Error(e) => Value::Error(Rc::new((**e).clone())),
        Value::Procedure(p) => match &**p {
            Procedure::Builtin { .. } => v.clone(),
            Procedure::Closure { name, formals, body, env } => Value::Procedure(Rc::new(Procedure::Closure {
                name: RefCell::new(name.borrow().clone()),
                formals: formals.clone(),
                body: body.clone(),
                env: env.clone(),
            })),
        },
        Value::Port(p) => {
            // Shallow copy of the descriptor; the handle/buffer is shared.
            // `File` has no cheap `Clone`, so a duplicated descriptor shares
            // the same backing via a fresh Rc to the same RefCell instead.
            let _ = p;
            v.clone()
        }
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_is_identity_for_strings() {
        let a = Value::string("hi");
        let b = a.clone();
        let c = Value::string("hi");
        assert!(is_eq(&a, &b));
        assert!(!is_eq(&a, &c));
        assert!(is_equal(&a, &c));
    }

    #[test]
    fn eqv_respects_exactness() {
        assert!(!is_eqv(&Value::Integer(1), &Value::Real(1.0)));
        assert!(is_eqv(&Value::Integer(1), &Value::Integer(1)));
    }

    #[test]
    fn list_round_trip() {
        let items = vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)];
        let list = Value::list(items.clone());
        let back = list.list_to_vec().unwrap();
        assert_eq!(back.len(), 3);
        for (a, b) in items.iter().zip(back.iter()) {
            assert!(is_eqv(a, b));
        }
    }

    #[test]
    fn symbol_interning_via_value() {
        assert!(is_eq(&Value::symbol("foo"), &Value::symbol("foo")));
    }
}
