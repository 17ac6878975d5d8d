//! The R7RS numeric tower.
//!
//! Five numeric representations, promoted along
//! `Integer -> Rational -> Real -> Complex`, with an independent
//! `Integer <-> BigInt` axis for 64-bit overflow. This module mirrors the
//! one function per operator, overflow handled explicitly, each reporting a
//! `SchemeError` the way every other builtin does rather than panicking.

use crate::error::SchemeError;
use num_bigint::BigInt;
use num_integer::Roots;
use num_rational::Ratio;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

pub type Result<T> = std::result::Result<T, SchemeError>;

/// A numeric value at any rung of the tower.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    Big(BigInt),
    Rat(Ratio<i64>),
    Real(f64),
    Complex(Box<ComplexParts>),
}

/// The real and imaginary parts of a complex number. Each part is itself
/// Integer/BigInt/Rational/Real -- never nested Complex (enforced by the
/// constructor in `value.rs`).
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexParts {
    pub re: Number,
    pub im: Number,
}

impl Number {
    pub fn is_exact(&self) -> bool {
        match self {
            Number::Real(_) => false,
            Number::Complex(c) => c.re.is_exact() && c.im.is_exact(),
            _ => true,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(n) => *n == 0,
            Number::Big(b) => b.is_zero(),
            Number::Rat(r) => r.is_zero(),
            Number::Real(f) => *f == 0.0,
            Number::Complex(c) => c.re.is_zero() && c.im.is_zero(),
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Int(n) => *n as f64,
            Number::Big(b) => b.to_f64().unwrap_or(f64::INFINITY),
            Number::Rat(r) => *r.numer() as f64 / *r.denom() as f64,
            Number::Real(f) => *f,
            Number::Complex(c) => c.re.to_f64(),
        }
    }

    /// Demote a BigInt result back to a machine integer if it fits.
    pub fn from_big(b: BigInt) -> Number {
        match b.to_i64() {
            Some(n) => Number::Int(n),
            None => Number::Big(b),
        }
    }

    fn to_big(&self) -> BigInt {
        match self {
            Number::Int(n) => BigInt::from(*n),
            Number::Big(b) => b.clone(),
            Number::Rat(_) | Number::Real(_) | Number::Complex(_) => {
                unreachable!("to_big called on non-integer Number")
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Number::Int(_) | Number::Big(_) => 0,
            Number::Rat(_) => 1,
            Number::Real(_) => 2,
            Number::Complex(_) => 3,
        }
    }

    fn to_rat(&self) -> Result<Ratio<i64>> {
        match self {
            Number::Int(n) => Ok(Ratio::from_integer(*n)),
            Number::Rat(r) => Ok(*r),
            Number::Big(b) => b
                .to_i64()
                .map(Ratio::from_integer)
                .ok_or_else(|| SchemeError::value_error("bignum too large for exact rational")),
            _ => unreachable!("to_rat called on non-rational-compatible Number"),
        }
    }

    fn to_complex_parts(&self) -> ComplexParts {
        match self {
            Number::Complex(c) => (**c).clone(),
            other => ComplexParts {
                re: other.clone(),
                im: Number::Int(0),
            },
        }
    }

    fn simplify_complex(c: ComplexParts) -> Number {
        if c.im.is_zero() && c.im.is_exact() {
            c.re
        } else {
            Number::Complex(Box::new(c))
        }
    }
}

/// Promote two integer-axis numbers, trying the i64 fast path first and
/// falling back to BigInt only on overflow (the behaviour Scenario 2 of the
/// spec's testable properties exercises directly).
macro_rules! checked_int_op {
    ($a:expr, $b:expr, $checked:ident, $big_op:tt) => {{
        if let (Number::Int(a), Number::Int(b)) = ($a, $b) {
            if let Some(r) = a.$checked(*b) {
                return Ok(Number::Int(r));
            }
        }
    }};
}

pub fn add(a: &Number, b: &Number) -> Result<Number> {
    checked_int_op!(a, b, checked_add, +);
    binary(
        a,
        b,
        |x, y| Ok(x + y),
        |x, y| Ok(x + y),
        |x, y| x + y,
        |x, y| Ok(ComplexParts { re: add(&x.re, &y.re)?, im: add(&x.im, &y.im)? }),
    )
}

pub fn sub(a: &Number, b: &Number) -> Result<Number> {
    checked_int_op!(a, b, checked_sub, -);
    binary(
        a,
        b,
        |x, y| Ok(x - y),
        |x, y| Ok(x - y),
        |x, y| x - y,
        |x, y| Ok(ComplexParts { re: sub(&x.re, &y.re)?, im: sub(&x.im, &y.im)? }),
    )
}

pub fn mul(a: &Number, b: &Number) -> Result<Number> {
    checked_int_op!(a, b, checked_mul, *);
    binary(
        a,
        b,
        |x, y| Ok(x * y),
        |x, y| Ok(x * y),
        |x, y| x * y,
        |x, y| complex_mul_parts(&x, &y),
    )
}

pub fn neg(a: &Number) -> Number {
    match a {
        Number::Int(n) => n
            .checked_neg()
            .map(Number::Int)
            .unwrap_or_else(|| Number::from_big(-BigInt::from(*n))),
        Number::Big(b) => Number::from_big(-b.clone()),
        Number::Rat(r) => Number::Rat(-r),
        Number::Real(f) => Number::Real(-f),
        Number::Complex(c) => Number::Complex(Box::new(ComplexParts {
            re: neg(&c.re),
            im: neg(&c.im),
        })),
    }
}

/// Division. Exact integer division that comes out even stays an integer;
/// otherwise it becomes a simplified rational. `0/0` on exact operands is a
/// value-error; `0.0/0.0` is NaN, not an error.
pub fn div(a: &Number, b: &Number) -> Result<Number> {
    if a.rank() == 0 && b.rank() == 0 && a.is_exact() && b.is_exact() {
        if b.is_zero() {
            return Err(SchemeError::value_error("division by zero"));
        }
        if let (Number::Int(x), Number::Int(y)) = (a, b) {
            if x % y == 0 {
                return Ok(Number::Int(x / y));
            }
            return Ok(simplify_rational(Ratio::new(*x, *y)));
        }
        let (x, y) = (a.to_big(), b.to_big());
        let (q, r) = (&x / &y, &x % &y);
        if r.is_zero() {
            return Ok(Number::from_big(q));
        }
        // Bignum/bignum non-exact quotient: rational tower is 64-bit only,
        // so fall back to an inexact result (documented Open Question).
        return Ok(Number::Real(x.to_f64().unwrap_or(f64::NAN) / y.to_f64().unwrap_or(f64::NAN)));
    }
    if let Number::Complex(_) = a {
        return complex_div(&a.to_complex_parts(), &b.to_complex_parts());
    }
    if let Number::Complex(_) = b {
        return complex_div(&a.to_complex_parts(), &b.to_complex_parts());
    }
    if a.rank().max(b.rank()) == 2 {
        return Ok(Number::Real(a.to_f64() / b.to_f64()));
    }
    // Both exact, at least one rational, or a bignum too large for Ratio<i64>.
    match (a.to_rat(), b.to_rat()) {
        (Ok(x), Ok(y)) => {
            if y.is_zero() {
                return Err(SchemeError::value_error("division by zero"));
            }
            Ok(simplify_rational(x / y))
        }
        _ => Ok(Number::Real(a.to_f64() / b.to_f64())),
    }
}

pub fn recip(a: &Number) -> Result<Number> {
    div(&Number::Int(1), a)
}

fn simplify_rational(r: Ratio<i64>) -> Number {
    if *r.denom() == 1 {
        Number::Int(*r.numer())
    } else {
        Number::Rat(r)
    }
}

fn binary(
    a: &Number,
    b: &Number,
    rat_op: impl Fn(Ratio<i64>, Ratio<i64>) -> Result<Ratio<i64>>,
    big_op: impl Fn(BigInt, BigInt) -> Result<BigInt>,
    real_op: impl Fn(f64, f64) -> f64,
    complex_op: impl Fn(ComplexParts, ComplexParts) -> Result<ComplexParts>,
) -> Result<Number> {
    let rank = a.rank().max(b.rank());
    match rank {
        3 => Ok(Number::simplify_complex(complex_op(
            a.to_complex_parts(),
            b.to_complex_parts(),
        )?)),
        2 => Ok(Number::Real(real_op(a.to_f64(), b.to_f64()))),
        1 => match (a.to_rat(), b.to_rat()) {
            (Ok(x), Ok(y)) => Ok(simplify_rational(rat_op(x, y)?)),
            _ => Ok(Number::Real(real_op(a.to_f64(), b.to_f64()))),
        },
        _ => Ok(Number::from_big(big_op(a.to_big(), b.to_big())?)),
    }
}

fn complex_div(a: &ComplexParts, b: &ComplexParts) -> Result<Number> {
    // a/b = (a * conj(b)) / (b * conj(b)), the conjugate formula from §4.1.
    let conj_b = ComplexParts {
        re: b.re.clone(),
        im: neg(&b.im),
    };
    let numer = complex_mul_parts(a, &conj_b)?;
    let denom_parts = complex_mul_parts(b, &conj_b)?;
    // b * conj(b) is always real-valued; its imaginary part is exactly zero.
    let denom = denom_parts.re;
    let re = div(&numer.re, &denom)?;
    let im = div(&numer.im, &denom)?;
    Ok(Number::simplify_complex(ComplexParts { re, im }))
}

fn complex_mul_parts(a: &ComplexParts, b: &ComplexParts) -> Result<ComplexParts> {
    let re = sub(&mul(&a.re, &b.re)?, &mul(&a.im, &b.im)?)?;
    let im = add(&mul(&a.re, &b.im)?, &mul(&a.im, &b.re)?)?;
    Ok(ComplexParts { re, im })
}

/// Build a complex number from its parts, collapsing to a real `Number`
/// when the imaginary part is exactly zero (constructor rule from §4.1:
/// "Complex construction rejects nested complex parts").
pub fn complex(re: Number, im: Number) -> Number {
    Number::simplify_complex(ComplexParts { re, im })
}

/// Three-way comparison for real-valued (non-complex) numbers; used by
/// `=`, `<`, `>`, etc.
pub fn compare(a: &Number, b: &Number) -> Result<Ordering> {
    if matches!(a, Number::Complex(_)) || matches!(b, Number::Complex(_)) {
        return Err(SchemeError::type_error("cannot order complex numbers"));
    }
    let rank = a.rank().max(b.rank());
    Ok(if rank == 2 {
        a.to_f64().partial_cmp(&b.to_f64()).unwrap_or(Ordering::Equal)
    } else {
        match (a.to_rat(), b.to_rat()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.to_f64().partial_cmp(&b.to_f64()).unwrap_or(Ordering::Equal),
        }
    })
}

pub fn numeric_eq(a: &Number, b: &Number) -> bool {
    match (a, b) {
        (Number::Complex(_), _) | (_, Number::Complex(_)) => {
            let (ca, cb) = (a.to_complex_parts(), b.to_complex_parts());
            numeric_eq(&ca.re, &cb.re) && numeric_eq(&ca.im, &cb.im)
        }
        _ => compare(a, b).map(|o| o == Ordering::Equal).unwrap_or(false),
    }
}

/// `quotient`: truncate toward zero.
pub fn quotient(a: &Number, b: &Number) -> Result<Number> {
    require_integers(a, b, "quotient")?;
    int_div_op(a, b, |x, y| x.checked_div(y), |x, y| &x / &y)
}

/// `remainder`: sign follows the dividend.
pub fn remainder(a: &Number, b: &Number) -> Result<Number> {
    require_integers(a, b, "remainder")?;
    int_div_op(a, b, |x, y| x.checked_rem(y), |x, y| &x % &y)
}

/// `modulo`: sign follows the divisor.
pub fn modulo(a: &Number, b: &Number) -> Result<Number> {
    require_integers(a, b, "modulo")?;
    int_div_op(
        a,
        b,
        |x, y| x.checked_rem(y).map(|r| if r != 0 && (r < 0) != (y < 0) { r + y } else { r }),
        |x, y| {
            let r = &x % &y;
            if !r.is_zero() && r.is_negative() != y.is_negative() {
                r + y
            } else {
                r
            }
        },
    )
}

fn require_integers(a: &Number, b: &Number, who: &str) -> Result<()> {
    if a.is_exact() && b.is_exact() && a.rank() == 0 && b.rank() == 0 {
        if b.is_zero() {
            return Err(SchemeError::value_error(format!("{who}: division by zero")));
        }
        Ok(())
    } else {
        Err(SchemeError::type_error(format!("{who}: expected integers")))
    }
}

fn int_div_op(
    a: &Number,
    b: &Number,
    fast: impl Fn(i64, i64) -> Option<i64>,
    slow: impl Fn(BigInt, BigInt) -> BigInt,
) -> Result<Number> {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        if let Some(r) = fast(*x, *y) {
            return Ok(Number::Int(r));
        }
    }
    Ok(Number::from_big(slow(a.to_big(), b.to_big())))
}

/// `floor/`: quotient and remainder such that `n = q*d + r` and
/// `q = floor(n/d)`.
pub fn floor_div(n: &Number, d: &Number) -> Result<(Number, Number)> {
    require_integers(n, d, "floor/")?;
    let (x, y) = (n.to_big(), d.to_big());
    let mut q = &x / &y;
    let mut r = &x - &q * &y;
    if !r.is_zero() && r.is_negative() != y.is_negative() {
        q -= 1;
        r += &y;
    }
    Ok((Number::from_big(q), Number::from_big(r)))
}

/// `exact-integer-sqrt`: `(s, r)` with `k = s^2 + r` and `(s+1)^2 > k`.
pub fn exact_integer_sqrt(k: &Number) -> Result<(Number, Number)> {
    let big = match k {
        Number::Int(n) if *n >= 0 => BigInt::from(*n),
        Number::Big(b) if !b.is_negative() => b.clone(),
        _ => return Err(SchemeError::value_error("exact-integer-sqrt: negative or non-integer")),
    };
    let s = big.sqrt();
    let r = &big - &s * &s;
    Ok((Number::from_big(s), Number::from_big(r)))
}

/// `sqrt`: exact integer root when exact, else inexact real, else a
/// pure-imaginary complex for negative reals.
pub fn sqrt(a: &Number) -> Result<Number> {
    match a {
        Number::Int(n) if *n >= 0 => {
            let (s, r) = exact_integer_sqrt(a)?;
            if r.is_zero() {
                Ok(s)
            } else {
                Ok(Number::Real((*n as f64).sqrt()))
            }
        }
        Number::Big(b) if !b.is_negative() => {
            let (s, r) = exact_integer_sqrt(a)?;
            if r.is_zero() {
                Ok(s)
            } else {
                Ok(Number::Real(b.to_f64().unwrap_or(f64::INFINITY).sqrt()))
            }
        }
        Number::Real(f) if *f >= 0.0 => Ok(Number::Real(f.sqrt())),
        Number::Real(f) => Ok(Number::Complex(Box::new(ComplexParts {
            re: Number::Real(0.0),
            im: Number::Real((-f).sqrt()),
        }))),
        _ => {
            let f = a.to_f64();
            if f >= 0.0 {
                Ok(Number::Real(f.sqrt()))
            } else {
                Ok(Number::Complex(Box::new(ComplexParts {
                    re: Number::Real(0.0),
                    im: Number::Real((-f).sqrt()),
                })))
            }
        }
    }
}

/// `expt`: repeated squaring for integer exponents; negative exponent of a
/// positive integer base yields an exact rational; a negative base with a
/// non-integer exponent yields a complex result.
pub fn expt(base: &Number, exp: &Number) -> Result<Number> {
    if matches!(base, Number::Complex(_)) {
        // Polar form on the base's own modulus/argument, not an assumed
        // angle of PI -- that branch below is only for a real negative base.
        let parts = base.to_complex_parts();
        let (re, im) = (parts.re.to_f64(), parts.im.to_f64());
        let r = re.hypot(im);
        let theta = im.atan2(re);
        let e = exp.to_f64();
        let mag = r.powf(e);
        let angle = theta * e;
        return Ok(Number::simplify_complex(ComplexParts {
            re: Number::Real(mag * angle.cos()),
            im: Number::Real(mag * angle.sin()),
        }));
    }
    if let Number::Int(e) = exp {
        if base.is_exact() && base.rank() <= 1 {
            if *e >= 0 {
                let b = base.to_rat().unwrap_or_else(|_| Ratio::from_integer(0));
                let mut acc = Ratio::from_integer(1i64);
                // Repeated squaring via checked BigInt powers to stay correct
                // on overflow, then demote.
                let bb = match base {
                    Number::Int(_) | Number::Big(_) => Some(base.to_big()),
                    _ => None,
                };
                if let Some(bb) = bb {
                    return Ok(Number::from_big(bb.pow(*e as u32)));
                }
                for _ in 0..*e {
                    acc *= b;
                }
                return Ok(simplify_rational(acc));
            } else if !base.is_zero() {
                let positive = expt(base, &Number::Int(-e))?;
                return recip(&positive);
            } else {
                return Err(SchemeError::value_error("expt: division by zero"));
            }
        }
        if let Number::Real(b) = base {
            return Ok(Number::Real(b.powi(*e as i32)));
        }
    }
    if base.to_f64() < 0.0 {
        // Negative base, non-integer exponent: genuinely complex.
        let (r, theta) = (base.to_f64().abs(), std::f64::consts::PI);
        let e = exp.to_f64();
        let mag = r.powf(e);
        let angle = theta * e;
        return Ok(Number::Complex(Box::new(ComplexParts {
            re: Number::Real(mag * angle.cos()),
            im: Number::Real(mag * angle.sin()),
        })));
    }
    Ok(Number::Real(base.to_f64().powf(exp.to_f64())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_promotes_to_bignum() {
        let a = Number::Int(i64::MAX - 1);
        let b = Number::Int(2);
        match add(&a, &b).unwrap() {
            Number::Big(n) => assert_eq!(n, BigInt::from(i64::MAX) + BigInt::from(1)),
            other => panic!("expected bignum, got {other:?}"),
        }
    }

    #[test]
    fn bignum_demotes_when_it_fits() {
        let a = Number::Big(BigInt::from(10));
        let b = Number::Big(BigInt::from(-7));
        assert_eq!(add(&a, &b).unwrap(), Number::Int(3));
    }

    #[test]
    fn exact_division_simplifies() {
        match div(&Number::Int(10), &Number::Int(3)).unwrap() {
            Number::Rat(r) => assert_eq!(r, Ratio::new(10, 3)),
            other => panic!("expected rational, got {other:?}"),
        }
        assert_eq!(div(&Number::Int(10), &Number::Int(2)).unwrap(), Number::Int(5));
    }

    #[test]
    fn division_by_zero_is_value_error() {
        assert!(div(&Number::Int(1), &Number::Int(0)).is_err());
    }

    #[test]
    fn inexact_division_by_zero_is_not_an_error() {
        let r = div(&Number::Real(0.0), &Number::Real(0.0)).unwrap();
        match r {
            Number::Real(f) => assert!(f.is_nan()),
            other => panic!("expected NaN, got {other:?}"),
        }
    }

    #[test]
    fn contagion_from_mixed_exactness() {
        let r = add(&Number::Int(1), &Number::Real(2.0)).unwrap();
        assert!(!r.is_exact());
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(modulo(&Number::Int(-7), &Number::Int(3)).unwrap(), Number::Int(2));
        assert_eq!(remainder(&Number::Int(-7), &Number::Int(3)).unwrap(), Number::Int(-1));
    }

    #[test]
    fn exact_integer_sqrt_invariant() {
        for k in [0i64, 1, 2, 3, 4, 17, 1_000_000] {
            let (s, r) = exact_integer_sqrt(&Number::Int(k)).unwrap();
            let (s, r) = match (s, r) {
                (Number::Int(s), Number::Int(r)) => (s, r),
                _ => panic!("expected machine ints for small input"),
            };
            assert_eq!(s * s + r, k);
            assert!((s + 1) * (s + 1) > k);
        }
    }

    #[test]
    fn complex_division_uses_conjugate_formula() {
        // (1+2i) / (3+4i) = 11/25 + 2/25 i
        let a = Number::Complex(Box::new(ComplexParts { re: Number::Int(1), im: Number::Int(2) }));
        let b = Number::Complex(Box::new(ComplexParts { re: Number::Int(3), im: Number::Int(4) }));
        match div(&a, &b).unwrap() {
            Number::Complex(c) => {
                assert_eq!(c.re, Number::Rat(Ratio::new(11, 25)));
                assert_eq!(c.im, Number::Rat(Ratio::new(2, 25)));
            }
            other => panic!("expected complex, got {other:?}"),
        }
    }

    #[test]
    fn expt_of_a_complex_base_uses_its_own_modulus_and_argument() {
        // (1+2i)^2 = -3+4i
        let base = Number::Complex(Box::new(ComplexParts { re: Number::Int(1), im: Number::Int(2) }));
        match expt(&base, &Number::Int(2)).unwrap() {
            Number::Complex(c) => {
                assert!((c.re.to_f64() - -3.0).abs() < 1e-9);
                assert!((c.im.to_f64() - 4.0).abs() < 1e-9);
            }
            other => panic!("expected complex, got {other:?}"),
        }
    }
}
