//! Numeric tower builtins: the arithmetic, comparison,
//! rounding, and exactness operations named across the numeric-tower
//! section, dispatched through `wisp_core::numeric` rather than matching on
//! `Value` variants directly here -- the tower's promotion ladder already
//! lives there, one layer down.

use std::cmp::Ordering;
use std::rc::Rc;

use wisp_core::{numeric, Environment, Number, SchemeError, Value};

use super::{arity_exact, arity_min, arity_range, def};

pub(super) fn register(env: &Rc<Environment>) {
    def(env, "+", b_add);
    def(env, "*", b_mul);
    def(env, "-", b_sub);
    def(env, "/", b_div);

    def(env, "=", |_, a| compare_chain(a, "=", |o| o == Ordering::Equal));
    def(env, "<", |_, a| compare_chain(a, "<", |o| o == Ordering::Less));
    def(env, ">", |_, a| compare_chain(a, ">", |o| o == Ordering::Greater));
    def(env, "<=", |_, a| compare_chain(a, "<=", |o| o != Ordering::Greater));
    def(env, ">=", |_, a| compare_chain(a, ">=", |o| o != Ordering::Less));

    def(env, "quotient", |_, a| int_binop(a, "quotient", numeric::quotient));
    def(env, "remainder", |_, a| int_binop(a, "remainder", numeric::remainder));
    def(env, "modulo", |_, a| int_binop(a, "modulo", numeric::modulo));
    def(env, "floor/", b_floor_div);
    def(env, "truncate/", b_truncate_div);
    def(env, "floor-quotient", |_, a| Ok(Value::from_number(floor_div(a, "floor-quotient")?.0)));
    def(env, "floor-remainder", |_, a| Ok(Value::from_number(floor_div(a, "floor-remainder")?.1)));
    def(env, "truncate-quotient", |_, a| int_binop(a, "truncate-quotient", numeric::quotient));
    def(env, "truncate-remainder", |_, a| int_binop(a, "truncate-remainder", numeric::remainder));

    def(env, "abs", b_abs);
    def(env, "min", |_, a| extremum(a, "min", Ordering::Less));
    def(env, "max", |_, a| extremum(a, "max", Ordering::Greater));
    def(env, "gcd", b_gcd);
    def(env, "lcm", b_lcm);

    def(env, "expt", b_expt);
    def(env, "sqrt", b_sqrt);
    def(env, "exact-integer-sqrt", b_exact_integer_sqrt);
    def(env, "square", |_, a| {
        arity_exact(a, 1, "square")?;
        Ok(Value::from_number(numeric::mul(&num(&a[0], "square")?, &num(&a[0], "square")?)?))
    });

    def(env, "sin", |_, a| transcendental1(a, "sin", f64::sin));
    def(env, "cos", |_, a| transcendental1(a, "cos", f64::cos));
    def(env, "tan", |_, a| transcendental1(a, "tan", f64::tan));
    def(env, "asin", |_, a| transcendental1(a, "asin", f64::asin));
    def(env, "acos", |_, a| transcendental1(a, "acos", f64::acos));
    def(env, "atan", b_atan);
    def(env, "exp", |_, a| transcendental1(a, "exp", f64::exp));
    def(env, "log", b_log);
    def(env, "log2", |_, a| transcendental1(a, "log2", f64::log2));
    def(env, "log10", |_, a| transcendental1(a, "log10", f64::log10));
    def(env, "cbrt", |_, a| transcendental1(a, "cbrt", f64::cbrt));

    def(env, "exact", b_exact);
    def(env, "inexact", b_inexact);
    def(env, "exact->inexact", b_inexact);
    def(env, "inexact->exact", b_exact);

    def(env, "numerator", b_numerator);
    def(env, "denominator", b_denominator);

    def(env, "floor", |_, a| round_to_integer(a, "floor", f64::floor, |n, d| num_integer::Integer::div_floor(&n, &d)));
    def(env, "ceiling", |_, a| round_to_integer(a, "ceiling", f64::ceil, |n, d| {
        let (q, r) = num_integer::Integer::div_mod_floor(&n, &d);
        if num_traits::Zero::is_zero(&r) { q } else { q + 1 }
    }));
    def(env, "truncate", |_, a| round_to_integer(a, "truncate", f64::trunc, |n, d| n / d));
    def(env, "round", b_round);

    def(env, "zero?", |_, a| num_predicate(a, "zero?", |n| n.is_zero()));
    def(env, "positive?", |_, a| num_predicate(a, "positive?", |n| numeric::compare(n, &Number::Int(0)).map(|o| o == Ordering::Greater).unwrap_or(false)));
    def(env, "negative?", |_, a| num_predicate(a, "negative?", |n| numeric::compare(n, &Number::Int(0)).map(|o| o == Ordering::Less).unwrap_or(false)));
    def(env, "odd?", |_, a| int_predicate(a, "odd?", |n| n % 2 != 0));
    def(env, "even?", |_, a| int_predicate(a, "even?", |n| n % 2 == 0));

    def(env, "exact?", |_, a| {
        arity_exact(a, 1, "exact?")?;
        Ok(Value::Bool(a[0].is_exact()))
    });
    def(env, "inexact?", |_, a| {
        arity_exact(a, 1, "inexact?")?;
        Ok(Value::Bool(!a[0].is_exact()))
    });
    def(env, "exact-integer?", |_, a| {
        arity_exact(a, 1, "exact-integer?")?;
        Ok(Value::Bool(matches!(a[0], Value::Integer(_) | Value::BigInt(_))))
    });
    def(env, "exact-rational?", |_, a| {
        arity_exact(a, 1, "exact-rational?")?;
        Ok(Value::Bool(matches!(a[0], Value::Integer(_) | Value::BigInt(_) | Value::Rational(_))))
    });
    def(env, "integer?", |_, a| {
        arity_exact(a, 1, "integer?")?;
        Ok(Value::Bool(match &a[0] {
            Value::Integer(_) | Value::BigInt(_) => true,
            Value::Real(f) => f.fract() == 0.0 && f.is_finite(),
            _ => false,
        }))
    });
    def(env, "rational?", |_, a| {
        arity_exact(a, 1, "rational?")?;
        Ok(Value::Bool(match &a[0] {
            Value::Integer(_) | Value::BigInt(_) | Value::Rational(_) => true,
            Value::Real(f) => f.is_finite(),
            _ => false,
        }))
    });
    def(env, "real?", |_, a| {
        arity_exact(a, 1, "real?")?;
        Ok(Value::Bool(matches!(a[0], Value::Integer(_) | Value::BigInt(_) | Value::Rational(_) | Value::Real(_))))
    });
    def(env, "complex?", |_, a| Ok(Value::Bool(a.first().is_some_and(Value::is_number))));
    def(env, "nan?", |_, a| {
        arity_exact(a, 1, "nan?")?;
        Ok(Value::Bool(matches!(a[0], Value::Real(f) if f.is_nan())))
    });
    def(env, "infinite?", |_, a| {
        arity_exact(a, 1, "infinite?")?;
        Ok(Value::Bool(matches!(a[0], Value::Real(f) if f.is_infinite())))
    });
    def(env, "finite?", |_, a| {
        arity_exact(a, 1, "finite?")?;
        Ok(Value::Bool(!matches!(a[0], Value::Real(f) if !f.is_finite())))
    });

    def(env, "number->string", b_number_to_string);
    def(env, "string->number", b_string_to_number);

    def(env, "make-rectangular", |_, a| {
        arity_exact(a, 2, "make-rectangular")?;
        Ok(Value::from_number(numeric::complex(num(&a[0], "make-rectangular")?, num(&a[1], "make-rectangular")?)))
    });
    def(env, "real-part", |_, a| {
        arity_exact(a, 1, "real-part")?;
        Ok(Value::from_number(match num(&a[0], "real-part")? {
            Number::Complex(c) => c.re,
            other => other,
        }))
    });
    def(env, "imag-part", |_, a| {
        arity_exact(a, 1, "imag-part")?;
        Ok(Value::from_number(match num(&a[0], "imag-part")? {
            Number::Complex(c) => c.im,
            _ => Number::Int(0),
        }))
    });

    def(env, "1+", |_, a| {
        arity_exact(a, 1, "1+")?;
        Ok(Value::from_number(numeric::add(&num(&a[0], "1+")?, &Number::Int(1))?))
    });
    def(env, "1-", |_, a| {
        arity_exact(a, 1, "1-")?;
        Ok(Value::from_number(numeric::sub(&num(&a[0], "1-")?, &Number::Int(1))?))
    });
}

fn num(v: &Value, who: &str) -> Result<Number, SchemeError> {
    v.to_number().ok_or_else(|| SchemeError::type_error(format!("{who}: expected a number, got {}", v.type_name())))
}

fn b_add(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    let mut acc = Number::Int(0);
    for a in args {
        acc = numeric::add(&acc, &num(a, "+")?)?;
    }
    Ok(Value::from_number(acc))
}

fn b_mul(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    let mut acc = Number::Int(1);
    for a in args {
        acc = numeric::mul(&acc, &num(a, "*")?)?;
    }
    Ok(Value::from_number(acc))
}

fn b_sub(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 1, "-")?;
    if args.len() == 1 {
        return Ok(Value::from_number(numeric::neg(&num(&args[0], "-")?)));
    }
    let mut acc = num(&args[0], "-")?;
    for a in &args[1..] {
        acc = numeric::sub(&acc, &num(a, "-")?)?;
    }
    Ok(Value::from_number(acc))
}

fn b_div(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 1, "/")?;
    if args.len() == 1 {
        return Ok(Value::from_number(numeric::recip(&num(&args[0], "/")?)?));
    }
    let mut acc = num(&args[0], "/")?;
    for a in &args[1..] {
        acc = numeric::div(&acc, &num(a, "/")?)?;
    }
    Ok(Value::from_number(acc))
}

fn compare_chain(args: &[Value], who: &str, accept: impl Fn(Ordering) -> bool) -> Result<Value, SchemeError> {
    arity_min(args, 1, who)?;
    let nums: Vec<Number> = args.iter().map(|v| num(v, who)).collect::<Result<_, _>>()?;
    for w in nums.windows(2) {
        if !accept(numeric::compare(&w[0], &w[1])?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn int_binop(args: &[Value], who: &str, op: impl Fn(&Number, &Number) -> Result<Number, SchemeError>) -> Result<Value, SchemeError> {
    arity_exact(args, 2, who)?;
    Ok(Value::from_number(op(&num(&args[0], who)?, &num(&args[1], who)?)?))
}

fn floor_div(args: &[Value], who: &str) -> Result<(Number, Number), SchemeError> {
    arity_exact(args, 2, who)?;
    numeric::floor_div(&num(&args[0], who)?, &num(&args[1], who)?)
}

fn b_floor_div(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    // R7RS returns two values; without multiple-value machinery here we
    // hand back a 2-element list, matching this interpreter's `apply`
    // convention of a single return value per call.
    let (q, r) = floor_div(args, "floor/")?;
    Ok(Value::list(vec![Value::from_number(q), Value::from_number(r)]))
}

fn b_truncate_div(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "truncate/")?;
    let q = numeric::quotient(&num(&args[0], "truncate/")?, &num(&args[1], "truncate/")?)?;
    let r = numeric::remainder(&num(&args[0], "truncate/")?, &num(&args[1], "truncate/")?)?;
    Ok(Value::list(vec![Value::from_number(q), Value::from_number(r)]))
}

fn b_abs(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "abs")?;
    let n = num(&args[0], "abs")?;
    Ok(Value::from_number(
        if numeric::compare(&n, &Number::Int(0))?.is_lt() { numeric::neg(&n) } else { n },
    ))
}

fn extremum(args: &[Value], who: &str, want: Ordering) -> Result<Value, SchemeError> {
    arity_min(args, 1, who)?;
    let nums: Vec<Number> = args.iter().map(|v| num(v, who)).collect::<Result<_, _>>()?;
    let inexact = nums.iter().any(|n| !n.is_exact());
    let mut best = nums[0].clone();
    for n in &nums[1..] {
        if numeric::compare(n, &best)? == want {
            best = n.clone();
        }
    }
    // Contagion: if any argument was inexact, min/max returns inexact too,
    // even if the winning argument itself was exact.
    if inexact && best.is_exact() {
        best = Number::Real(best.to_f64());
    }
    Ok(Value::from_number(best))
}

fn as_big(n: &Number, who: &str) -> Result<num_bigint::BigInt, SchemeError> {
    match n {
        Number::Int(i) => Ok(num_bigint::BigInt::from(*i)),
        Number::Big(b) => Ok(b.clone()),
        _ => Err(SchemeError::type_error(format!("{who}: expected an integer"))),
    }
}

fn b_gcd(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    use num_integer::Integer;
    let mut acc = num_bigint::BigInt::from(0);
    for a in args {
        acc = acc.gcd(&as_big(&num(a, "gcd")?, "gcd")?);
    }
    Ok(Value::from_number(Number::from_big(acc)))
}

fn b_lcm(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    use num_integer::Integer;
    let mut acc = num_bigint::BigInt::from(1);
    for a in args {
        acc = acc.lcm(&as_big(&num(a, "lcm")?, "lcm")?);
    }
    Ok(Value::from_number(Number::from_big(acc.magnitude().clone().into())))
}

fn b_expt(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "expt")?;
    Ok(Value::from_number(numeric::expt(&num(&args[0], "expt")?, &num(&args[1], "expt")?)?))
}

fn b_sqrt(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "sqrt")?;
    Ok(Value::from_number(numeric::sqrt(&num(&args[0], "sqrt")?)?))
}

/// Applies a real-valued transcendental function, promoting any numeric
/// argument to `f64` first. Complex arguments are out of scope here (the
/// tower's complex numbers are a thin rectangular-form wrapper with no
/// transcendental functions implemented over them).
fn transcendental1(args: &[Value], who: &str, f: fn(f64) -> f64) -> Result<Value, SchemeError> {
    arity_exact(args, 1, who)?;
    let n = num(&args[0], who)?;
    match n {
        Number::Complex(_) => Err(SchemeError::type_error(format!("{who}: complex arguments are not supported"))),
        other => Ok(Value::Real(f(other.to_f64()))),
    }
}

fn b_atan(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "atan")?;
    let y = num(&args[0], "atan")?;
    match &y {
        Number::Complex(_) => return Err(SchemeError::type_error("atan: complex arguments are not supported")),
        _ => {}
    }
    match args.get(1) {
        None => Ok(Value::Real(y.to_f64().atan())),
        Some(x_arg) => {
            let x = num(x_arg, "atan")?;
            if let Number::Complex(_) = x {
                return Err(SchemeError::type_error("atan: complex arguments are not supported"));
            }
            Ok(Value::Real(y.to_f64().atan2(x.to_f64())))
        }
    }
}

fn b_log(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "log")?;
    let z = num(&args[0], "log")?;
    if let Number::Complex(_) = z {
        return Err(SchemeError::type_error("log: complex arguments are not supported"));
    }
    let x = z.to_f64();
    match args.get(1) {
        None => Ok(Value::Real(x.ln())),
        Some(base_arg) => {
            let base = num(base_arg, "log")?;
            if let Number::Complex(_) = base {
                return Err(SchemeError::type_error("log: complex arguments are not supported"));
            }
            Ok(Value::Real(x.log(base.to_f64())))
        }
    }
}

fn b_exact_integer_sqrt(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "exact-integer-sqrt")?;
    let (s, r) = numeric::exact_integer_sqrt(&num(&args[0], "exact-integer-sqrt")?)?;
    Ok(Value::list(vec![Value::from_number(s), Value::from_number(r)]))
}

fn b_exact(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "exact")?;
    let n = num(&args[0], "exact")?;
    Ok(Value::from_number(match n {
        Number::Real(f) => real_to_exact(f)?,
        other => other,
    }))
}

fn real_to_exact(f: f64) -> Result<Number, SchemeError> {
    if !f.is_finite() {
        return Err(SchemeError::value_error("exact: cannot convert a non-finite real"));
    }
    if f.fract() == 0.0 && f.abs() < (i64::MAX as f64) {
        return Ok(Number::Int(f as i64));
    }
    // Exact binary decomposition: f = mantissa * 2^exponent.
    let bits = f.to_bits();
    let sign: i64 = if bits >> 63 == 1 { -1 } else { 1 };
    let exponent = ((bits >> 52) & 0x7ff) as i64 - 1075;
    let mantissa = (bits & 0xfffffffffffff) | 0x10000000000000;
    let mantissa = num_bigint::BigInt::from(mantissa) * sign;
    let (big_num, big_den) = if exponent >= 0 {
        (mantissa * num_bigint::BigInt::from(2).pow(exponent as u32), num_bigint::BigInt::from(1))
    } else {
        (mantissa, num_bigint::BigInt::from(2).pow((-exponent) as u32))
    };
    match (num_traits::ToPrimitive::to_i64(&big_num), num_traits::ToPrimitive::to_i64(&big_den)) {
        (Some(n), Some(d)) => {
            let r = num_rational::Ratio::new(n, d);
            Ok(if *r.denom() == 1 { Number::Int(*r.numer()) } else { Number::Rat(r) })
        }
        _ => Ok(Number::from_big(big_num / big_den)), // precision beyond the 64-bit rational axis; truncate
    }
}

fn b_inexact(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "inexact")?;
    let n = num(&args[0], "inexact")?;
    Ok(Value::from_number(if n.is_exact() { Number::Real(n.to_f64()) } else { n }))
}

fn b_numerator(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "numerator")?;
    match &args[0] {
        Value::Integer(n) => Ok(Value::Integer(*n)),
        Value::BigInt(b) => Ok(Value::BigInt(b.clone())),
        Value::Rational(r) => Ok(Value::Integer(*r.numer())),
        Value::Real(f) => match real_to_exact(*f)? {
            Number::Int(n) => Ok(Value::Real(n as f64)),
            Number::Big(b) => Ok(Value::Real(num_traits::ToPrimitive::to_f64(&b).unwrap_or(f64::INFINITY))),
            Number::Rat(r) => Ok(Value::Real(*r.numer() as f64)),
            _ => Err(SchemeError::type_error("numerator: expected a rational")),
        },
        _ => Err(SchemeError::type_error("numerator: expected a rational")),
    }
}

fn b_denominator(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "denominator")?;
    match &args[0] {
        Value::Integer(_) | Value::BigInt(_) => Ok(Value::Integer(1)),
        Value::Rational(r) => Ok(Value::Integer(*r.denom())),
        Value::Real(f) => match real_to_exact(*f)? {
            Number::Int(_) | Number::Big(_) => Ok(Value::Real(1.0)),
            Number::Rat(r) => Ok(Value::Real(*r.denom() as f64)),
            _ => Err(SchemeError::type_error("denominator: expected a rational")),
        },
        _ => Err(SchemeError::type_error("denominator: expected a rational")),
    }
}

fn round_to_integer(
    args: &[Value],
    who: &str,
    real_op: impl Fn(f64) -> f64,
    rat_op: impl Fn(num_bigint::BigInt, num_bigint::BigInt) -> num_bigint::BigInt,
) -> Result<Value, SchemeError> {
    arity_exact(args, 1, who)?;
    match num(&args[0], who)? {
        Number::Int(n) => Ok(Value::Integer(n)),
        Number::Big(b) => Ok(Value::from_number(Number::from_big(b))),
        Number::Rat(r) => {
            let n = rat_op(num_bigint::BigInt::from(*r.numer()), num_bigint::BigInt::from(*r.denom()));
            Ok(Value::from_number(Number::from_big(n)))
        }
        Number::Real(f) => Ok(Value::Real(real_op(f))),
        _ => Err(SchemeError::type_error(format!("{who}: expected a real number"))),
    }
}

fn b_round(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    // Round-half-to-even, as R7RS mandates (and as Rust's `f64::round_ties_even` does).
    arity_exact(args, 1, "round")?;
    match num(&args[0], "round")? {
        Number::Int(n) => Ok(Value::Integer(n)),
        Number::Big(b) => Ok(Value::from_number(Number::from_big(b))),
        Number::Rat(r) => {
            let two = num_bigint::BigInt::from(2);
            let (n, d) = (num_bigint::BigInt::from(*r.numer()), num_bigint::BigInt::from(*r.denom()));
            let doubled = &n * &two;
            let (q, rem) = num_integer::Integer::div_mod_floor(&doubled, &(&d * &two));
            let half_rem = &rem * &two;
            let rounded = if half_rem > d {
                q + 1
            } else if half_rem < d {
                q
            } else if num_integer::Integer::is_even(&q) {
                q
            } else {
                q + 1
            };
            Ok(Value::from_number(Number::from_big(rounded)))
        }
        Number::Real(f) => Ok(Value::Real(round_ties_even(f))),
        _ => Err(SchemeError::type_error("round: expected a real number")),
    }
}

fn round_ties_even(f: f64) -> f64 {
    let floor = f.floor();
    let diff = f - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

fn num_predicate(args: &[Value], who: &str, pred: impl Fn(&Number) -> bool) -> Result<Value, SchemeError> {
    arity_exact(args, 1, who)?;
    Ok(Value::Bool(pred(&num(&args[0], who)?)))
}

fn int_predicate(args: &[Value], who: &str, pred: impl Fn(i64) -> bool) -> Result<Value, SchemeError> {
    arity_exact(args, 1, who)?;
    match num(&args[0], who)? {
        Number::Int(n) => Ok(Value::Bool(pred(n))),
        Number::Big(b) => Ok(Value::Bool(pred(if num_traits::Zero::is_zero(&(&b % 2)) { 0 } else { 1 }))),
        Number::Real(f) if f.fract() == 0.0 => Ok(Value::Bool(pred(f as i64))),
        _ => Err(SchemeError::type_error(format!("{who}: expected an integer"))),
    }
}

fn b_number_to_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "number->string")?;
    let n = num(&args[0], "number->string")?;
    let radix = match args.get(1) {
        Some(Value::Integer(r)) => *r,
        None => 10,
        _ => return Err(SchemeError::type_error("number->string: radix must be an integer")),
    };
    if radix == 10 {
        return Ok(Value::string(crate::printer::print_to_string(&args[0], crate::printer::PrintMode::Write)));
    }
    let big = as_big(&n, "number->string")?;
    Ok(Value::string(big.to_str_radix(radix as u32)))
}

fn b_string_to_number(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "string->number")?;
    let s = match &args[0] {
        Value::String(s) => s.as_str().to_string(),
        _ => return Err(SchemeError::type_error("string->number: expected a string")),
    };
    let radix = match args.get(1) {
        Some(Value::Integer(r)) => *r,
        None => 10,
        _ => return Err(SchemeError::type_error("string->number: radix must be an integer")),
    };
    let text = match radix {
        10 => s,
        2 => format!("#b{s}"),
        8 => format!("#o{s}"),
        16 => format!("#x{s}"),
        _ => return Err(SchemeError::value_error("string->number: unsupported radix")),
    };
    match wisp_reader::parse_number(&text) {
        Some(n) => Ok(Value::from_number(n)),
        None => Ok(Value::Bool(false)),
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
    fn basic_arithmetic_scenarios() {
        assert!(matches!(run("(+ 1 2 3)"), Value::Integer(6)));
        assert!(matches!(run("((lambda (x y) (* x x y)) 3 4)"), Value::Integer(36)));
    }

    #[test]
    fn overflow_promotes_to_bignum() {
        assert!(matches!(run("(+ 9223372036854775806 2)"), Value::BigInt(_)));
    }

    #[test]
    fn division_tower() {
        match run("(/ 10 3)") {
            Value::Rational(r) => assert_eq!(r, num_rational::Ratio::new(10, 3)),
            other => panic!("expected rational, got {other:?}"),
        }
        assert!(matches!(run("(/ 10.0 3)"), Value::Real(_)));
    }

    #[test]
    fn min_max_contagion() {
        assert!(matches!(run("(min 1 2.0)"), Value::Real(f) if f == 1.0));
    }

    #[test]
    fn exact_inexact_round_trip() {
        assert!(matches!(run("(exact (inexact 3))"), Value::Integer(3)));
    }

    #[test]
    fn number_to_string_and_back() {
        assert!(matches!(run("(string->number (number->string 42))"), Value::Integer(42)));
    }

    #[test]
    fn gcd_lcm() {
        assert!(matches!(run("(gcd 12 18)"), Value::Integer(6)));
        assert!(matches!(run("(lcm 4 6)"), Value::Integer(12)));
    }

    #[test]
    fn rounding_modes() {
        assert!(matches!(run("(floor 3.7)"), Value::Real(f) if f == 3.0));
        assert!(matches!(run("(ceiling 3.2)"), Value::Real(f) if f == 4.0));
        assert!(matches!(run("(round 2.5)"), Value::Real(f) if f == 2.0));
        assert!(matches!(run("(round 3.5)"), Value::Real(f) if f == 4.0));
    }

    #[test]
    fn trig_and_transcendental() {
        assert!(matches!(run("(sin 0)"), Value::Real(f) if f.abs() < 1e-12));
        assert!(matches!(run("(cos 0)"), Value::Real(f) if (f - 1.0).abs() < 1e-12));
        assert!(matches!(run("(exp 0)"), Value::Real(f) if (f - 1.0).abs() < 1e-12));
        assert!(matches!(run("(log 1)"), Value::Real(f) if f.abs() < 1e-12));
        assert!(matches!(run("(atan 1 1)"), Value::Real(f) if (f - std::f64::consts::FRAC_PI_4).abs() < 1e-12));
    }
}
