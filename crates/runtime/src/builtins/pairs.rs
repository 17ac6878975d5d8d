//! Pair and list builtins: `cons`/`car`/`cdr` and their `cxr`
//! compositions, the classic list-processing procedures, and the
//! membership/association family.

use std::rc::Rc;

use wisp_core::{is_eq, is_equal, is_eqv, Environment, SchemeError, Value};

use super::{arity_exact, arity_min, arity_range, def};
use crate::eval;

pub(super) fn register(env: &Rc<Environment>) {
    def(env, "cons", |_, a| {
        arity_exact(a, 2, "cons")?;
        Ok(Value::cons(a[0].clone(), a[1].clone()))
    });
    def(env, "car", |_, a| {
        arity_exact(a, 1, "car")?;
        a[0].car().ok_or_else(|| type_err("car", &a[0]))
    });
    def(env, "cdr", |_, a| {
        arity_exact(a, 1, "cdr")?;
        a[0].cdr().ok_or_else(|| type_err("cdr", &a[0]))
    });
    register_cxr(env);

    def(env, "set-car!", |_, a| {
        arity_exact(a, 2, "set-car!")?;
        match &a[0] {
            Value::Pair(p) => {
                *p.car.borrow_mut() = a[1].clone();
                Ok(Value::Unspecified)
            }
            other => Err(type_err("set-car!", other)),
        }
    });
    def(env, "set-cdr!", |_, a| {
        arity_exact(a, 2, "set-cdr!")?;
        match &a[0] {
            Value::Pair(p) => {
                *p.cdr.borrow_mut() = a[1].clone();
                p.cached_len.set(-1);
                Ok(Value::Unspecified)
            }
            other => Err(type_err("set-cdr!", other)),
        }
    });

    def(env, "list", |_, a| Ok(Value::list(a.to_vec())));
    def(env, "list?", |_, a| {
        arity_exact(a, 1, "list?")?;
        Ok(Value::Bool(is_proper_list(&a[0])))
    });
    def(env, "length", b_length);
    def(env, "list-ref", b_list_ref);
    def(env, "list-tail", b_list_tail);
    def(env, "list-set!", b_list_set);
    def(env, "append", b_append);
    def(env, "append!", b_append);
    def(env, "reverse", b_reverse);
    def(env, "reverse!", b_reverse);
    def(env, "last-pair", b_last_pair);
    def(env, "list-copy", |_, a| {
        arity_exact(a, 1, "list-copy")?;
        let items = to_vec_checked(&a[0], "list-copy")?;
        Ok(Value::list(items))
    });

    def(env, "map", b_map);
    def(env, "for-each", b_for_each);
    def(env, "filter", b_filter);
    def(env, "fold-left", b_fold_left);
    def(env, "fold-right", b_fold_right);
    def(env, "reduce", b_reduce);

    def(env, "memq", |_, a| membership(a, "memq", is_eq));
    def(env, "memv", |_, a| membership(a, "memv", is_eqv));
    def(env, "member", |_, a| membership(a, "member", is_equal));
    def(env, "assq", |_, a| association(a, "assq", is_eq));
    def(env, "assv", |_, a| association(a, "assv", is_eqv));
    def(env, "assoc", |_, a| association(a, "assoc", is_equal));
}

fn type_err(who: &str, v: &Value) -> SchemeError {
    SchemeError::type_error(format!("{who}: expected a pair, got {}", v.type_name()))
}

/// The two-, three-, and four-letter `c[ad]+r` compositions, each built
/// from its letter sequence via `apply_cxr`. `BuiltinFn` is a plain `fn`
/// pointer with no room for captured state, so each composition still needs
/// its own monomorphic function -- `cxr_fn!` generates those without
/// spelling out 28 near-identical bodies by hand.
macro_rules! cxr_fn {
    ($fname:ident, $name:literal, $letters:literal) => {
        fn $fname(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
            arity_exact(args, 1, $name)?;
            apply_cxr(&args[0], $letters)
        }
    };
}

cxr_fn!(caar, "caar", "aa");
cxr_fn!(cadr, "cadr", "ad");
cxr_fn!(cdar, "cdar", "da");
cxr_fn!(cddr, "cddr", "dd");

cxr_fn!(caaar, "caaar", "aaa");
cxr_fn!(caadr, "caadr", "aad");
cxr_fn!(cadar, "cadar", "ada");
cxr_fn!(caddr, "caddr", "add");
cxr_fn!(cdaar, "cdaar", "daa");
cxr_fn!(cdadr, "cdadr", "dad");
cxr_fn!(cddar, "cddar", "dda");
cxr_fn!(cdddr, "cdddr", "ddd");

cxr_fn!(caaaar, "caaaar", "aaaa");
cxr_fn!(caaadr, "caaadr", "aaad");
cxr_fn!(caadar, "caadar", "aada");
cxr_fn!(caaddr, "caaddr", "aadd");
cxr_fn!(cadaar, "cadaar", "adaa");
cxr_fn!(cadadr, "cadadr", "adad");
cxr_fn!(caddar, "caddar", "adda");
cxr_fn!(cadddr, "cadddr", "addd");
cxr_fn!(cdaaar, "cdaaar", "daaa");
cxr_fn!(cdaadr, "cdaadr", "daad");
cxr_fn!(cdadar, "cdadar", "dada");
cxr_fn!(cdaddr, "cdaddr", "dadd");
cxr_fn!(cddaar, "cddaar", "ddaa");
cxr_fn!(cddadr, "cddadr", "ddad");
cxr_fn!(cdddar, "cdddar", "ddda");
cxr_fn!(cddddr, "cddddr", "dddd");

fn register_cxr(env: &Rc<Environment>) {
    def(env, "caar", caar);
    def(env, "cadr", cadr);
    def(env, "cdar", cdar);
    def(env, "cddr", cddr);

    def(env, "caaar", caaar);
    def(env, "caadr", caadr);
    def(env, "cadar", cadar);
    def(env, "caddr", caddr);
    def(env, "cdaar", cdaar);
    def(env, "cdadr", cdadr);
    def(env, "cddar", cddar);
    def(env, "cdddr", cdddr);

    def(env, "caaaar", caaaar);
    def(env, "caaadr", caaadr);
    def(env, "caadar", caadar);
    def(env, "caaddr", caaddr);
    def(env, "cadaar", cadaar);
    def(env, "cadadr", cadadr);
    def(env, "caddar", caddar);
    def(env, "cadddr", cadddr);
    def(env, "cdaaar", cdaaar);
    def(env, "cdaadr", cdaadr);
    def(env, "cdadar", cdadar);
    def(env, "cdaddr", cdaddr);
    def(env, "cddaar", cddaar);
    def(env, "cddadr", cddadr);
    def(env, "cdddar", cdddar);
    def(env, "cddddr", cddddr);
}

/// Applies a `c[ad]+r` composition given as its letter sequence in name
/// order (e.g. `"ad"` for `cadr`): the *last* letter is the innermost,
/// first-applied operation, matching `(cadr x) = (car (cdr x))`.
fn apply_cxr(start: &Value, letters: &str) -> Result<Value, SchemeError> {
    let mut cur = start.clone();
    for step in letters.chars().rev() {
        cur = match step {
            'a' => cur.car().ok_or_else(|| type_err("cxr", &cur))?,
            'd' => cur.cdr().ok_or_else(|| type_err("cxr", &cur))?,
            _ => unreachable!(),
        };
    }
    Ok(cur)
}

fn to_vec_checked(v: &Value, who: &str) -> Result<Vec<Value>, SchemeError> {
    v.list_to_vec().ok_or_else(|| SchemeError::type_error(format!("{who}: expected a proper list")))
}

fn is_proper_list(v: &Value) -> bool {
    let mut slow = v.clone();
    let mut fast = v.clone();
    loop {
        match fast {
            Value::Nil => return true,
            Value::Pair(p) => {
                fast = p.cdr.borrow().clone();
            }
            _ => return false,
        }
        match fast {
            Value::Nil => return true,
            Value::Pair(p) => {
                fast = p.cdr.borrow().clone();
            }
            _ => return false,
        }
        slow = match slow {
            Value::Pair(p) => p.cdr.borrow().clone(),
            _ => return false,
        };
        if let (Value::Pair(a), Value::Pair(b)) = (&slow, &fast) {
            if Rc::ptr_eq(a, b) {
                return false; // cyclic
            }
        }
    }
}

fn b_length(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "length")?;
    if let Value::Pair(p) = &args[0] {
        let cached = p.cached_len.get();
        if cached >= 0 {
            return Ok(Value::Integer(cached));
        }
    }
    let items = to_vec_checked(&args[0], "length")?;
    if let Value::Pair(p) = &args[0] {
        p.cached_len.set(items.len() as i64);
    }
    Ok(Value::Integer(items.len() as i64))
}

fn b_list_ref(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "list-ref")?;
    let k = index_arg(&args[1], "list-ref")?;
    let mut cur = args[0].clone();
    for _ in 0..k {
        cur = cur.cdr().ok_or_else(|| SchemeError::index_error("list-ref: index out of range"))?;
    }
    cur.car().ok_or_else(|| SchemeError::index_error("list-ref: index out of range"))
}

fn b_list_tail(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "list-tail")?;
    let k = index_arg(&args[1], "list-tail")?;
    let mut cur = args[0].clone();
    for _ in 0..k {
        cur = cur.cdr().ok_or_else(|| SchemeError::index_error("list-tail: index out of range"))?;
    }
    Ok(cur)
}

fn b_list_set(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 3, "list-set!")?;
    let k = index_arg(&args[1], "list-set!")?;
    let mut cur = args[0].clone();
    for _ in 0..k {
        cur = cur.cdr().ok_or_else(|| SchemeError::index_error("list-set!: index out of range"))?;
    }
    match &cur {
        Value::Pair(p) => {
            *p.car.borrow_mut() = args[2].clone();
            Ok(Value::Unspecified)
        }
        _ => Err(SchemeError::index_error("list-set!: index out of range")),
    }
}

fn b_last_pair(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "last-pair")?;
    let mut cur = args[0].clone();
    loop {
        let next = match &cur {
            Value::Pair(p) => p.cdr.borrow().clone(),
            other => return Err(type_err("last-pair", other)),
        };
        if next.is_pair() {
            cur = next;
        } else {
            return Ok(cur);
        }
    }
}

fn index_arg(v: &Value, who: &str) -> Result<usize, SchemeError> {
    match v {
        Value::Integer(n) if *n >= 0 => Ok(*n as usize),
        _ => Err(SchemeError::type_error(format!("{who}: expected a non-negative exact integer"))),
    }
}

fn b_append(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    if args.is_empty() {
        return Ok(Value::Nil);
    }
    let (last, init) = args.split_last().expect("checked non-empty above");
    let mut out = last.clone();
    for list in init.iter().rev() {
        let items = to_vec_checked(list, "append")?;
        for item in items.into_iter().rev() {
            out = Value::cons(item, out);
        }
    }
    Ok(out)
}

fn b_reverse(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "reverse")?;
    let mut items = to_vec_checked(&args[0], "reverse")?;
    items.reverse();
    Ok(Value::list(items))
}

fn b_map(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 2, "map")?;
    let proc = &args[0];
    let lists: Vec<Vec<Value>> = args[1..].iter().map(|l| to_vec_checked(l, "map")).collect::<Result<_, _>>()?;
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let call_args: Vec<Value> = lists.iter().map(|l| l[i].clone()).collect();
        out.push(eval::apply(proc, call_args)?);
    }
    Ok(Value::list(out))
}

fn b_for_each(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 2, "for-each")?;
    let proc = &args[0];
    let lists: Vec<Vec<Value>> = args[1..].iter().map(|l| to_vec_checked(l, "for-each")).collect::<Result<_, _>>()?;
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    for i in 0..len {
        let call_args: Vec<Value> = lists.iter().map(|l| l[i].clone()).collect();
        eval::apply(proc, call_args)?;
    }
    Ok(Value::Unspecified)
}

fn b_filter(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "filter")?;
    let proc = &args[0];
    let items = to_vec_checked(&args[1], "filter")?;
    let mut out = Vec::new();
    for item in items {
        if eval::apply(proc, vec![item.clone()])?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

fn b_fold_left(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 3, "fold-left")?;
    let proc = &args[0];
    let mut acc = args[1].clone();
    let lists: Vec<Vec<Value>> = args[2..].iter().map(|l| to_vec_checked(l, "fold-left")).collect::<Result<_, _>>()?;
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    for i in 0..len {
        let mut call_args = vec![acc];
        call_args.extend(lists.iter().map(|l| l[i].clone()));
        acc = eval::apply(proc, call_args)?;
    }
    Ok(acc)
}

fn b_fold_right(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 3, "fold-right")?;
    let proc = &args[0];
    let mut acc = args[1].clone();
    let lists: Vec<Vec<Value>> = args[2..].iter().map(|l| to_vec_checked(l, "fold-right")).collect::<Result<_, _>>()?;
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    for i in (0..len).rev() {
        let mut call_args: Vec<Value> = lists.iter().map(|l| l[i].clone()).collect();
        call_args.push(acc);
        acc = eval::apply(proc, call_args)?;
    }
    Ok(acc)
}

fn b_reduce(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 3, "reduce")?;
    let proc = &args[0];
    let default = args[1].clone();
    let items = to_vec_checked(&args[2], "reduce")?;
    let mut it = items.into_iter();
    let Some(mut acc) = it.next() else {
        return Ok(default);
    };
    for item in it {
        acc = eval::apply(proc, vec![item, acc])?;
    }
    Ok(acc)
}

fn membership(args: &[Value], who: &str, eq: impl Fn(&Value, &Value) -> bool) -> Result<Value, SchemeError> {
    arity_range(args, 2, 2, who)?;
    let mut cur = args[1].clone();
    loop {
        match cur {
            Value::Pair(p) => {
                if eq(&args[0], &p.car.borrow()) {
                    return Ok(Value::Pair(p));
                }
                cur = p.cdr.borrow().clone();
            }
            Value::Nil => return Ok(Value::Bool(false)),
            _ => return Err(SchemeError::type_error(format!("{who}: expected a list"))),
        }
    }
}

fn association(args: &[Value], who: &str, eq: impl Fn(&Value, &Value) -> bool) -> Result<Value, SchemeError> {
    arity_range(args, 2, 2, who)?;
    let entries = to_vec_checked(&args[1], who)?;
    for entry in entries {
        let key = entry.car().ok_or_else(|| SchemeError::type_error(format!("{who}: expected an alist")))?;
        if eq(&args[0], &key) {
            return Ok(entry);
        }
    }
    Ok(Value::Bool(false))
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
    fn basic_pair_access() {
        assert!(matches!(run("(car (cons 1 2))"), Value::Integer(1)));
        assert!(matches!(run("(cadr '(1 2 3))"), Value::Integer(2)));
        assert!(matches!(run("(caddr '(1 2 3))"), Value::Integer(3)));
    }

    #[test]
    fn map_filter_fold() {
        assert_eq!(run("(map (lambda (x) (* x x)) '(1 2 3))").list_to_vec().unwrap().len(), 3);
        assert!(matches!(run("(fold-left + 0 '(1 2 3 4))"), Value::Integer(10)));
        assert!(matches!(run("(length (filter odd? '(1 2 3 4 5)))"), Value::Integer(3)));
    }

    #[test]
    fn assoc_and_member_use_equal() {
        assert!(matches!(run("(assoc \"b\" (list (cons \"a\" 1) (cons \"b\" 2)))"), Value::Pair(_)));
        assert!(matches!(run("(member 2 '(1 2 3))"), Value::Pair(_)));
        assert!(matches!(run("(memq 'z '(a b c))"), Value::Bool(false)));
    }

    #[test]
    fn set_car_and_cdr_mutate_in_place() {
        assert!(matches!(run("(let ((p (cons 1 2))) (set-car! p 9) (car p))"), Value::Integer(9)));
    }

    #[test]
    fn list_set_mutates_the_kth_pair() {
        assert!(matches!(run("(let ((l (list 1 2 3))) (list-set! l 1 9) (cadr l))"), Value::Integer(9)));
    }

    #[test]
    fn last_pair_returns_the_final_cons() {
        assert!(matches!(run("(car (last-pair '(1 2 3)))"), Value::Integer(3)));
    }

    #[test]
    fn bang_variants_behave_like_their_pure_counterparts() {
        assert!(wisp_core::is_equal(&run("(append! '(1 2) '(3 4))"), &run("(list 1 2 3 4)")));
        assert!(wisp_core::is_equal(&run("(reverse! '(1 2 3))"), &run("(list 3 2 1)")));
    }
}
