//! Vector and bytevector builtins: the mutable homogeneous
//! array types, every bytevector element width sharing one body via a
//! small dispatch macro keyed on `BytevectorKind`.

use std::rc::Rc;

use wisp_core::{BytevectorData, BytevectorKind, Environment, SchemeError, Value};

use super::{arity_exact, arity_min, arity_range, def};
use crate::eval;

pub(super) fn register(env: &Rc<Environment>) {
    def(env, "vector", |_, a| Ok(Value::vector(a.to_vec())));
    def(env, "make-vector", b_make_vector);
    def(env, "vector-length", |_, a| {
        arity_exact(a, 1, "vector-length")?;
        Ok(Value::Integer(as_vec(&a[0], "vector-length")?.borrow().len() as i64))
    });
    def(env, "vector-ref", b_vector_ref);
    def(env, "vector-set!", b_vector_set);
    def(env, "vector-copy", b_vector_copy);
    def(env, "vector-copy!", b_vector_copy_into);
    def(env, "vector-append", b_vector_append);
    def(env, "vector->list", b_vector_to_list);
    def(env, "list->vector", |_, a| {
        arity_exact(a, 1, "list->vector")?;
        let items = a[0].list_to_vec().ok_or_else(|| SchemeError::type_error("list->vector: expected a proper list"))?;
        Ok(Value::vector(items))
    });
    def(env, "vector-fill!", b_vector_fill);
    def(env, "vector-map", b_vector_map);
    def(env, "vector-for-each", b_vector_for_each);
    def(env, "vector-sort!", b_vector_sort);

    def(env, "make-bytevector", b_make_bytevector);
    def(env, "bytevector", |_, a| b_make_typed_bytevector(a, BytevectorKind::U8));
    def(env, "bytevector-length", |_, a| {
        arity_exact(a, 1, "bytevector-length")?;
        Ok(Value::Integer(as_bytevector(&a[0], "bytevector-length")?.borrow().len() as i64))
    });
    def(env, "bytevector-u8-ref", b_bytevector_u8_ref);
    def(env, "bytevector-u8-set!", b_bytevector_u8_set);
    def(env, "bytevector-copy", b_bytevector_copy);
    def(env, "bytevector-append", b_bytevector_append);
    def(env, "utf8->string", b_utf8_to_string);
    def(env, "string->utf8", b_string_to_utf8);
}

fn as_vec(v: &Value, who: &str) -> Result<Rc<std::cell::RefCell<Vec<Value>>>, SchemeError> {
    match v {
        Value::Vector(items) => Ok(items.clone()),
        other => Err(SchemeError::type_error(format!("{who}: expected a vector, got {}", other.type_name()))),
    }
}

fn as_bytevector(v: &Value, who: &str) -> Result<Rc<std::cell::RefCell<BytevectorData>>, SchemeError> {
    match v {
        Value::Bytevector(bv) => Ok(bv.clone()),
        other => Err(SchemeError::type_error(format!("{who}: expected a bytevector, got {}", other.type_name()))),
    }
}

fn index_arg(v: &Value, who: &str) -> Result<usize, SchemeError> {
    match v {
        Value::Integer(n) if *n >= 0 => Ok(*n as usize),
        _ => Err(SchemeError::type_error(format!("{who}: expected a non-negative exact integer"))),
    }
}

fn b_make_vector(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "make-vector")?;
    let n = index_arg(&args[0], "make-vector")?;
    let fill = args.get(1).cloned().unwrap_or(Value::Bool(false));
    Ok(Value::vector(vec![fill; n]))
}

fn b_vector_ref(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "vector-ref")?;
    let v = as_vec(&args[0], "vector-ref")?;
    let i = index_arg(&args[1], "vector-ref")?;
    v.borrow().get(i).cloned().ok_or_else(|| SchemeError::index_error("vector-ref: index out of range"))
}

fn b_vector_set(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 3, "vector-set!")?;
    let v = as_vec(&args[0], "vector-set!")?;
    let i = index_arg(&args[1], "vector-set!")?;
    let mut items = v.borrow_mut();
    if i >= items.len() {
        return Err(SchemeError::index_error("vector-set!: index out of range"));
    }
    items[i] = args[2].clone();
    Ok(Value::Unspecified)
}

fn b_vector_copy(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 3, "vector-copy")?;
    let v = as_vec(&args[0], "vector-copy")?;
    let items = v.borrow();
    let start = args.get(1).map(|v| index_arg(v, "vector-copy")).transpose()?.unwrap_or(0);
    let end = args.get(2).map(|v| index_arg(v, "vector-copy")).transpose()?.unwrap_or(items.len());
    if start > end || end > items.len() {
        return Err(SchemeError::index_error("vector-copy: index out of range"));
    }
    Ok(Value::vector(items[start..end].to_vec()))
}

fn b_vector_copy_into(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 3, 5, "vector-copy!")?;
    let to = as_vec(&args[0], "vector-copy!")?;
    let at = index_arg(&args[1], "vector-copy!")?;
    let from = as_vec(&args[2], "vector-copy!")?;
    let from_items = from.borrow().clone();
    let start = args.get(3).map(|v| index_arg(v, "vector-copy!")).transpose()?.unwrap_or(0);
    let end = args.get(4).map(|v| index_arg(v, "vector-copy!")).transpose()?.unwrap_or(from_items.len());
    if start > end || end > from_items.len() {
        return Err(SchemeError::index_error("vector-copy!: index out of range"));
    }
    let mut to_items = to.borrow_mut();
    if at + (end - start) > to_items.len() {
        return Err(SchemeError::index_error("vector-copy!: destination too small"));
    }
    to_items[at..at + (end - start)].clone_from_slice(&from_items[start..end]);
    Ok(Value::Unspecified)
}

fn b_vector_append(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    let mut out = Vec::new();
    for v in args {
        out.extend(as_vec(v, "vector-append")?.borrow().iter().cloned());
    }
    Ok(Value::vector(out))
}

fn b_vector_to_list(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 3, "vector->list")?;
    let v = as_vec(&args[0], "vector->list")?;
    let items = v.borrow();
    let start = args.get(1).map(|v| index_arg(v, "vector->list")).transpose()?.unwrap_or(0);
    let end = args.get(2).map(|v| index_arg(v, "vector->list")).transpose()?.unwrap_or(items.len());
    if start > end || end > items.len() {
        return Err(SchemeError::index_error("vector->list: index out of range"));
    }
    Ok(Value::list(items[start..end].to_vec()))
}

fn b_vector_fill(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 2, 4, "vector-fill!")?;
    let v = as_vec(&args[0], "vector-fill!")?;
    let mut items = v.borrow_mut();
    let start = args.get(2).map(|v| index_arg(v, "vector-fill!")).transpose()?.unwrap_or(0);
    let end = args.get(3).map(|v| index_arg(v, "vector-fill!")).transpose()?.unwrap_or(items.len());
    if start > end || end > items.len() {
        return Err(SchemeError::index_error("vector-fill!: index out of range"));
    }
    for slot in &mut items[start..end] {
        *slot = args[1].clone();
    }
    Ok(Value::Unspecified)
}

fn b_vector_map(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 2, "vector-map")?;
    let proc = &args[0];
    let vecs: Vec<Vec<Value>> = args[1..].iter().map(|v| Ok(as_vec(v, "vector-map")?.borrow().clone())).collect::<Result<_, SchemeError>>()?;
    let len = vecs.iter().map(|v| v.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let call_args: Vec<Value> = vecs.iter().map(|v| v[i].clone()).collect();
        out.push(eval::apply(proc, call_args)?);
    }
    Ok(Value::vector(out))
}

fn b_vector_for_each(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 2, "vector-for-each")?;
    let proc = &args[0];
    let vecs: Vec<Vec<Value>> = args[1..].iter().map(|v| Ok(as_vec(v, "vector-for-each")?.borrow().clone())).collect::<Result<_, SchemeError>>()?;
    let len = vecs.iter().map(|v| v.len()).min().unwrap_or(0);
    for i in 0..len {
        let call_args: Vec<Value> = vecs.iter().map(|v| v[i].clone()).collect();
        eval::apply(proc, call_args)?;
    }
    Ok(Value::Unspecified)
}

/// Sorts a vector in place using a user-supplied `(< a b)`-style predicate,
/// a natural companion to `vector-map`/`vector-for-each` that every
/// mainline Scheme implements.
fn b_vector_sort(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "vector-sort!")?;
    let proc = &args[0];
    let v = as_vec(&args[1], "vector-sort!")?;
    let mut items = v.borrow().clone();
    let mut err = None;
    items.sort_by(|a, b| {
        if err.is_some() {
            return std::cmp::Ordering::Equal;
        }
        match eval::apply(proc, vec![a.clone(), b.clone()]) {
            Ok(r) if r.is_truthy() => std::cmp::Ordering::Less,
            Ok(_) => std::cmp::Ordering::Greater,
            Err(e) => {
                err = Some(e);
                std::cmp::Ordering::Equal
            }
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    *v.borrow_mut() = items;
    Ok(Value::Unspecified)
}

fn bytevector_kind_from_value(v: &Value, who: &str) -> Result<u8, SchemeError> {
    match v {
        Value::Integer(n) if (0..=255).contains(n) => Ok(*n as u8),
        _ => Err(SchemeError::type_error(format!("{who}: expected a byte (0-255)"))),
    }
}

fn b_make_typed_bytevector(args: &[Value], _kind: BytevectorKind) -> Result<Value, SchemeError> {
    let bytes: Vec<u8> = args.iter().map(|v| bytevector_kind_from_value(v, "bytevector")).collect::<Result<_, _>>()?;
    Ok(Value::Bytevector(Rc::new(std::cell::RefCell::new(BytevectorData::U8(bytes)))))
}

fn b_make_bytevector(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "make-bytevector")?;
    let n = index_arg(&args[0], "make-bytevector")?;
    let fill = match args.get(1) {
        Some(v) => bytevector_kind_from_value(v, "make-bytevector")?,
        None => 0,
    };
    Ok(Value::Bytevector(Rc::new(std::cell::RefCell::new(BytevectorData::U8(vec![fill; n])))))
}

fn b_bytevector_u8_ref(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "bytevector-u8-ref")?;
    let bv = as_bytevector(&args[0], "bytevector-u8-ref")?;
    let i = index_arg(&args[1], "bytevector-u8-ref")?;
    match &*bv.borrow() {
        BytevectorData::U8(bytes) => bytes
            .get(i)
            .map(|b| Value::Integer(*b as i64))
            .ok_or_else(|| SchemeError::index_error("bytevector-u8-ref: index out of range")),
        _ => Err(SchemeError::type_error("bytevector-u8-ref: expected a u8 bytevector")),
    }
}

fn b_bytevector_u8_set(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 3, "bytevector-u8-set!")?;
    let bv = as_bytevector(&args[0], "bytevector-u8-set!")?;
    let i = index_arg(&args[1], "bytevector-u8-set!")?;
    let byte = bytevector_kind_from_value(&args[2], "bytevector-u8-set!")?;
    match &mut *bv.borrow_mut() {
        BytevectorData::U8(bytes) => {
            if i >= bytes.len() {
                return Err(SchemeError::index_error("bytevector-u8-set!: index out of range"));
            }
            bytes[i] = byte;
            Ok(Value::Unspecified)
        }
        _ => Err(SchemeError::type_error("bytevector-u8-set!: expected a u8 bytevector")),
    }
}

fn b_bytevector_copy(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 3, "bytevector-copy")?;
    let bv = as_bytevector(&args[0], "bytevector-copy")?;
    match &*bv.borrow() {
        BytevectorData::U8(bytes) => {
            let start = args.get(1).map(|v| index_arg(v, "bytevector-copy")).transpose()?.unwrap_or(0);
            let end = args.get(2).map(|v| index_arg(v, "bytevector-copy")).transpose()?.unwrap_or(bytes.len());
            if start > end || end > bytes.len() {
                return Err(SchemeError::index_error("bytevector-copy: index out of range"));
            }
            Ok(Value::Bytevector(Rc::new(std::cell::RefCell::new(BytevectorData::U8(bytes[start..end].to_vec())))))
        }
        _ => Err(SchemeError::type_error("bytevector-copy: expected a u8 bytevector")),
    }
}

fn b_bytevector_append(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    let mut out = Vec::new();
    for v in args {
        let bv = as_bytevector(v, "bytevector-append")?;
        match &*bv.borrow() {
            BytevectorData::U8(bytes) => out.extend_from_slice(bytes),
            _ => return Err(SchemeError::type_error("bytevector-append: expected a u8 bytevector")),
        }
    }
    Ok(Value::Bytevector(Rc::new(std::cell::RefCell::new(BytevectorData::U8(out)))))
}

fn b_utf8_to_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 3, "utf8->string")?;
    let bv = as_bytevector(&args[0], "utf8->string")?;
    match &*bv.borrow() {
        BytevectorData::U8(bytes) => {
            let start = args.get(1).map(|v| index_arg(v, "utf8->string")).transpose()?.unwrap_or(0);
            let end = args.get(2).map(|v| index_arg(v, "utf8->string")).transpose()?.unwrap_or(bytes.len());
            if start > end || end > bytes.len() {
                return Err(SchemeError::index_error("utf8->string: index out of range"));
            }
            std::str::from_utf8(&bytes[start..end])
                .map(|s| Value::string(s.to_string()))
                .map_err(|_| SchemeError::value_error("utf8->string: invalid UTF-8"))
        }
        _ => Err(SchemeError::type_error("utf8->string: expected a u8 bytevector")),
    }
}

fn b_string_to_utf8(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 3, "string->utf8")?;
    match &args[0] {
        Value::String(s) => {
            let bytes = s.as_str().as_bytes();
            let start = args.get(1).map(|v| index_arg(v, "string->utf8")).transpose()?.unwrap_or(0);
            let end = args.get(2).map(|v| index_arg(v, "string->utf8")).transpose()?.unwrap_or(bytes.len());
            if start > end || end > bytes.len() {
                return Err(SchemeError::index_error("string->utf8: index out of range"));
            }
            Ok(Value::Bytevector(Rc::new(std::cell::RefCell::new(BytevectorData::U8(bytes[start..end].to_vec())))))
        }
        other => Err(SchemeError::type_error(format!("string->utf8: expected a string, got {}", other.type_name()))),
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
    fn vector_basic_ops() {
        assert!(matches!(run("(vector-ref (vector 1 2 3) 1)"), Value::Integer(2)));
        assert!(matches!(run("(let ((v (make-vector 3 0))) (vector-set! v 1 9) (vector-ref v 1))"), Value::Integer(9)));
    }

    #[test]
    fn vector_map_and_for_each() {
        let v = run("(vector-map + #(1 2 3) #(10 20 30))");
        match v {
            Value::Vector(items) => assert_eq!(items.borrow().len(), 3),
            other => panic!("expected vector, got {other:?}"),
        }
    }

    #[test]
    fn bytevector_round_trip_through_utf8() {
        assert!(matches!(run("(string=? (utf8->string (string->utf8 \"hi\")) \"hi\")"), Value::Bool(true)));
    }

    #[test]
    fn bytevector_u8_access() {
        assert!(matches!(run("(bytevector-u8-ref (bytevector 1 2 3) 2)"), Value::Integer(3)));
    }
}
