//! Core predicates, equality, and the handful of procedures that reach
//! back into the evaluator (`apply`, `eval`, `force`) or the printer
//! (`display`/`write`/`newline`, routed through `io.rs`'s port plumbing).

use std::rc::Rc;

use wisp_core::{is_eq, is_equal, is_eqv, Environment, Procedure, SchemeError, Value};

use super::{arity_exact, arity_min, arity_range, def};
use crate::eval;

pub(super) fn register(env: &Rc<Environment>) {
    def(env, "eq?", b_eq);
    def(env, "eqv?", b_eqv);
    def(env, "equal?", b_equal);
    def(env, "not", b_not);

    def(env, "null?", |_, a| Ok(Value::Bool(a.first().is_some_and(Value::is_nil))));
    def(env, "pair?", |_, a| Ok(Value::Bool(a.first().is_some_and(Value::is_pair))));
    def(env, "procedure?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Procedure(_))))));
    def(env, "boolean?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Bool(_))))));
    def(env, "symbol?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Symbol(_))))));
    def(env, "string?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::String(_))))));
    def(env, "char?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Char(_))))));
    def(env, "vector?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Vector(_))))));
    def(env, "bytevector?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Bytevector(_))))));
    def(env, "port?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Port(_))))));
    def(env, "promise?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Promise(_))))));
    def(env, "eof-object?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Eof)))));
    def(env, "eof-object", |_, a| {
        arity_exact(a, 0, "eof-object")?;
        Ok(Value::Eof)
    });

    def(env, "number?", |_, a| Ok(Value::Bool(a.first().is_some_and(Value::is_number))));
    def(env, "boolean=?", |_, a| {
        arity_min(a, 2, "boolean=?")?;
        let first = matches!(a[0], Value::Bool(true));
        Ok(Value::Bool(a.iter().all(|v| matches!(v, Value::Bool(b) if *b == first))))
    });

    def(env, "apply", b_apply);
    def(env, "eval", b_eval);
    def(env, "force", b_force);
    def(env, "make-promise", |_, a| {
        arity_exact(a, 1, "make-promise")?;
        match &a[0] {
            Value::Promise(_) => Ok(a[0].clone()),
            other => Ok(Value::Promise(Rc::new(wisp_core::PromiseData::already_forced(other.clone())))),
        }
    });

    def(env, "error", b_error);
    def(env, "raise", |_, a| {
        arity_exact(a, 1, "raise")?;
        match &a[0] {
            Value::Error(e) => Err((**e).clone()),
            other => Err(SchemeError::generic(format!("raised: {}", other.type_name()))),
        }
    });
    def(env, "error-object?", |_, a| Ok(Value::Bool(matches!(a.first(), Some(Value::Error(_))))));
    def(env, "error-object-message", |_, a| {
        arity_exact(a, 1, "error-object-message")?;
        match &a[0] {
            Value::Error(e) => Ok(Value::string(e.message.clone())),
            _ => Err(SchemeError::type_error("error-object-message: expected an error")),
        }
    });
    def(env, "read-error?", |_, a| match a.first() {
        Some(Value::Error(e)) => Ok(Value::Bool(e.is_read_error())),
        _ => Ok(Value::Bool(false)),
    });
    def(env, "file-error?", |_, a| match a.first() {
        Some(Value::Error(e)) => Ok(Value::Bool(e.is_file_error())),
        _ => Ok(Value::Bool(false)),
    });

    def(env, "bound?", b_bound);
}

/// `(bound? 'name)`: true if `name` resolves in the calling environment.
/// Not part of R7RS proper; carried from the original's REPL diagnostics
/// (`main.c`), which check this before reporting an unbound-variable error.
fn b_bound(env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "bound?")?;
    match &args[0] {
        Value::Symbol(s) => Ok(Value::Bool(env.is_bound(s))),
        other => Err(SchemeError::type_error(format!("bound?: expected a symbol, got {}", other.type_name()))),
    }
}

fn b_eq(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "eq?")?;
    Ok(Value::Bool(is_eq(&args[0], &args[1])))
}

fn b_eqv(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "eqv?")?;
    Ok(Value::Bool(is_eqv(&args[0], &args[1])))
}

fn b_equal(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "equal?")?;
    Ok(Value::Bool(is_equal(&args[0], &args[1])))
}

fn b_not(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "not")?;
    Ok(Value::Bool(matches!(args[0], Value::Bool(false))))
}

/// `apply proc arg1 ... argn list` — the trailing argument must be a list;
/// it's spliced onto the flattened argument vector.
fn b_apply(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 2, "apply")?;
    let proc = &args[0];
    let (last, init) = args[1..].split_last().expect("arity_min(2) guarantees at least one trailing argument");
    let tail = last.list_to_vec().ok_or_else(|| SchemeError::type_error("apply: last argument must be a list"))?;
    let mut flat = init.to_vec();
    flat.extend(tail);
    eval::apply(proc, flat)
}

fn b_eval(env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "eval")?;
    // A second "environment specifier" argument (as from
    // `(the-environment)` or `(interaction-environment)`) is accepted for
    // surface compatibility but ignored: this interpreter has one
    // namespace, the global frame the builtin was invoked under.
    eval::eval(&args[0], env)
}

fn b_force(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "force")?;
    match &args[0] {
        Value::Promise(p) => eval::force(p),
        other => Ok(other.clone()), // forcing a non-promise returns it unchanged (R7RS)
    }
}

fn b_error(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 1, "error")?;
    let message = match &args[0] {
        Value::String(s) => s.as_str().to_string(),
        other => crate::printer::print_to_string(other, crate::printer::PrintMode::Display),
    };
    let irritants = args[1..]
        .iter()
        .map(|v| crate::printer::print_to_string(v, crate::printer::PrintMode::Write))
        .collect::<Vec<_>>()
        .join(" ");
    let full = if irritants.is_empty() { message } else { format!("{message}: {irritants}") };
    Err(SchemeError::generic(full))
}

#[cfg(test)]
mod tests {
    use super::super::global_environment;
    use wisp_reader::Parser;

    fn run(src: &str) -> Value {
        let env = global_environment();
        let mut result = Value::Unspecified;
        for form in Parser::parse_all(src).unwrap() {
            result = crate::eval::eval(&form, &env).unwrap();
        }
        result
    }

    use wisp_core::Value;

    #[test]
    fn eq_identity_vs_equal_structural() {
        assert!(matches!(run("(eq? 'a 'a)"), Value::Bool(true)));
        assert!(matches!(run("(equal? (list 1 2) (list 1 2))"), Value::Bool(true)));
        assert!(matches!(run("(eq? (list 1 2) (list 1 2))"), Value::Bool(false)));
    }

    #[test]
    fn apply_splices_trailing_list() {
        assert!(matches!(run("(apply + 1 2 (list 3 4))"), Value::Integer(10)));
    }

    #[test]
    fn force_memoizes_a_delayed_computation() {
        assert!(matches!(run("(force (delay (+ 1 2)))"), Value::Integer(3)));
    }

    #[test]
    fn error_propagates_as_a_value_not_a_panic() {
        let env = global_environment();
        let form = Parser::parse_all("(car '())").unwrap().remove(0);
        assert!(crate::eval::eval(&form, &env).is_err());
    }

    #[test]
    fn bound_checks_the_calling_environment() {
        assert!(matches!(run("(bound? 'car)"), Value::Bool(true)));
        assert!(matches!(run("(bound? 'definitely-not-defined)"), Value::Bool(false)));
        assert!(matches!(run("(define x 1) (bound? 'x)"), Value::Bool(true)));
    }
}
