//! Polymorphic aggregate operations: `len`, `at`, `rev` dispatch on the
//! argument's variant tag across pair, vector, bytevector, and string,
//! instead of requiring callers to know which type-specific procedure
//! (`vector-length` vs `string-length` vs `length`) applies.

use std::rc::Rc;

use wisp_core::{BytevectorData, Environment, SchemeError, Value};

use super::{arity_exact, def};

pub(super) fn register(env: &Rc<Environment>) {
    def(env, "len", b_len);
    def(env, "at", b_at);
    def(env, "rev", b_rev);
}

fn type_err(who: &str, v: &Value) -> SchemeError {
    SchemeError::type_error(format!("{who}: no aggregate behavior for {}", v.type_name()))
}

fn b_len(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "len")?;
    let n = match &args[0] {
        Value::Nil => 0,
        Value::Pair(_) => proper_list_len(&args[0])?,
        Value::Vector(v) => v.borrow().len(),
        Value::Bytevector(b) => b.borrow().len(),
        Value::String(s) => s.len(),
        other => return Err(type_err("len", other)),
    };
    Ok(Value::Integer(n as i64))
}

fn proper_list_len(start: &Value) -> Result<usize, SchemeError> {
    let mut n = 0;
    let mut cur = start.clone();
    loop {
        match cur {
            Value::Nil => return Ok(n),
            Value::Pair(_) => {
                n += 1;
                cur = cur.cdr().expect("pair always has a cdr");
            }
            other => return Err(type_err("len", &other)),
        }
    }
}

fn b_at(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "at")?;
    let i = match &args[1] {
        Value::Integer(n) if *n >= 0 => *n as usize,
        other => return Err(SchemeError::type_error(format!("at: expected a non-negative exact integer index, got {}", other.type_name()))),
    };
    match &args[0] {
        Value::Pair(_) | Value::Nil => {
            let mut cur = args[0].clone();
            for _ in 0..i {
                cur = cur.cdr().ok_or_else(|| SchemeError::index_error("at: index out of range"))?;
            }
            cur.car().ok_or_else(|| SchemeError::index_error("at: index out of range"))
        }
        Value::Vector(v) => v
            .borrow()
            .get(i)
            .cloned()
            .ok_or_else(|| SchemeError::index_error(format!("at: index {i} out of range"))),
        Value::Bytevector(b) => bytevector_at(&b.borrow(), i),
        Value::String(s) => s
            .graphemes()
            .get(i)
            .and_then(|g| g.chars().next())
            .map(Value::Char)
            .ok_or_else(|| SchemeError::index_error(format!("at: index {i} out of range"))),
        other => Err(type_err("at", other)),
    }
}

fn bytevector_at(b: &BytevectorData, i: usize) -> Result<Value, SchemeError> {
    let out_of_range = || SchemeError::index_error(format!("at: index {i} out of range"));
    match b {
        BytevectorData::U8(v) => v.get(i).map(|n| Value::Integer(*n as i64)).ok_or_else(out_of_range),
        BytevectorData::S8(v) => v.get(i).map(|n| Value::Integer(*n as i64)).ok_or_else(out_of_range),
        BytevectorData::U16(v) => v.get(i).map(|n| Value::Integer(*n as i64)).ok_or_else(out_of_range),
        BytevectorData::S16(v) => v.get(i).map(|n| Value::Integer(*n as i64)).ok_or_else(out_of_range),
        BytevectorData::U32(v) => v.get(i).map(|n| Value::Integer(*n as i64)).ok_or_else(out_of_range),
        BytevectorData::S32(v) => v.get(i).map(|n| Value::Integer(*n as i64)).ok_or_else(out_of_range),
        BytevectorData::U64(v) => v.get(i).map(|n| Value::Integer(*n as i64)).ok_or_else(out_of_range),
        BytevectorData::S64(v) => v.get(i).map(|n| Value::Integer(*n as i64)).ok_or_else(out_of_range),
    }
}

fn b_rev(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "rev")?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Pair(_) => {
            let mut out = Value::Nil;
            let mut cur = args[0].clone();
            loop {
                match cur {
                    Value::Nil => break,
                    Value::Pair(_) => {
                        out = Value::cons(cur.car().expect("pair has a car"), out);
                        cur = cur.cdr().expect("pair has a cdr");
                    }
                    other => return Err(type_err("rev", &other)),
                }
            }
            Ok(out)
        }
        Value::Vector(v) => {
            let mut items = v.borrow().clone();
            items.reverse();
            Ok(Value::Vector(Rc::new(std::cell::RefCell::new(items))))
        }
        Value::Bytevector(b) => Ok(Value::Bytevector(Rc::new(std::cell::RefCell::new(reverse_bytevector(&b.borrow()))))),
        Value::String(s) => {
            let reversed: String = s.graphemes().into_iter().rev().collect();
            Ok(Value::string(reversed))
        }
        other => Err(type_err("rev", other)),
    }
}

fn reverse_bytevector(b: &BytevectorData) -> BytevectorData {
    match b {
        BytevectorData::U8(v) => BytevectorData::U8(v.iter().rev().copied().collect()),
        BytevectorData::S8(v) => BytevectorData::S8(v.iter().rev().copied().collect()),
        BytevectorData::U16(v) => BytevectorData::U16(v.iter().rev().copied().collect()),
        BytevectorData::S16(v) => BytevectorData::S16(v.iter().rev().copied().collect()),
        BytevectorData::U32(v) => BytevectorData::U32(v.iter().rev().copied().collect()),
        BytevectorData::S32(v) => BytevectorData::S32(v.iter().rev().copied().collect()),
        BytevectorData::U64(v) => BytevectorData::U64(v.iter().rev().copied().collect()),
        BytevectorData::S64(v) => BytevectorData::S64(v.iter().rev().copied().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::global_environment;
    use wisp_core::Value;
    use wisp_reader::Parser;

    fn run(src: &str) -> Value {
        let env = global_environment();
        let mut result = Value::Unspecified;
        for form in Parser::parse_all(src).unwrap() {
            result = crate::eval::eval(&form, &env).unwrap();
        }
        result
    }

    #[test]
    fn len_dispatches_across_variants() {
        assert!(matches!(run("(len '(1 2 3))"), Value::Integer(3)));
        assert!(matches!(run("(len (vector 1 2))"), Value::Integer(2)));
        assert!(matches!(run("(len \"hello\")"), Value::Integer(5)));
        assert!(matches!(run("(len (bytevector 1 2 3 4))"), Value::Integer(4)));
    }

    #[test]
    fn at_dispatches_across_variants() {
        assert!(matches!(run("(at '(10 20 30) 1)"), Value::Integer(20)));
        assert!(matches!(run("(at (vector 10 20 30) 2)"), Value::Integer(30)));
        assert!(matches!(run("(at \"abc\" 1)"), Value::Char('b')));
    }

    #[test]
    fn rev_reverses_each_container() {
        assert!(matches!(run("(equal? (rev '(1 2 3)) '(3 2 1))"), Value::Bool(true)));
        assert!(matches!(run("(equal? (rev (vector 1 2 3)) (vector 3 2 1))"), Value::Bool(true)));
        assert!(matches!(run("(string=? (rev \"abc\") \"cba\")"), Value::Bool(true)));
    }

    #[test]
    fn at_out_of_range_errors() {
        let env = global_environment();
        let form = Parser::parse_all("(at '(1 2) 5)").unwrap().remove(0);
        assert!(crate::eval::eval(&form, &env).is_err());
    }
}
