//! The builtin registry: every primitive procedure bound into the initial
//! environment, split one file per operational domain (numeric, pairs,
//! strings, vectors, io, aggregates) rather than one flat file of `fn`s.
//!
//! Each category module exposes a private `register(env)` that inserts its
//! `BuiltinFn`s by name; `global_environment` is the single place that
//! fixes the initial binding set, populated once at startup.

mod aggregates;
mod core;
mod io;
mod numeric;
mod pairs;
mod strings;
mod vectors;

use std::rc::Rc;
use wisp_core::{intern, BuiltinFn, Environment, Procedure, Value};

fn def(env: &Rc<Environment>, name: &str, func: BuiltinFn) {
    env.define(intern(name), Value::Procedure(Rc::new(Procedure::Builtin { name: Rc::from(name), func })));
}

/// Build a fresh global environment with every builtin bound.
pub fn global_environment() -> Rc<Environment> {
    let env = Environment::new_global();
    core::register(&env);
    numeric::register(&env);
    pairs::register(&env);
    strings::register(&env);
    vectors::register(&env);
    io::register(&env);
    aggregates::register(&env);
    env
}

pub(crate) fn arity_exact(args: &[Value], n: usize, who: &str) -> Result<(), wisp_core::SchemeError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(wisp_core::SchemeError::arity_error(format!("{who}: expected {n} argument(s), got {}", args.len())))
    }
}

pub(crate) fn arity_range(args: &[Value], min: usize, max: usize, who: &str) -> Result<(), wisp_core::SchemeError> {
    if args.len() >= min && args.len() <= max {
        Ok(())
    } else {
        Err(wisp_core::SchemeError::arity_error(format!(
            "{who}: expected {min}..={max} argument(s), got {}",
            args.len()
        )))
    }
}

pub(crate) fn arity_min(args: &[Value], min: usize, who: &str) -> Result<(), wisp_core::SchemeError> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(wisp_core::SchemeError::arity_error(format!("{who}: expected at least {min} argument(s), got {}", args.len())))
    }
}
