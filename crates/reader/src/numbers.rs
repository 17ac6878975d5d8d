//! Numeric literal parsing: radix/exactness prefixes through the full
//! tower, down to rectangular complex notation.
//!
//! A single entry point tries progressively more specific shapes and falls
//! through to `None` on the first one that doesn't match, rather than a
//! generated grammar.

use num_bigint::BigInt;
use num_rational::Ratio;
use num_traits::ToPrimitive;
use wisp_core::Number;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Exactness {
    Unspecified,
    Exact,
    Inexact,
}

/// Parse a single numeric token. Returns `None` if `text` is not a valid
/// number (the caller then treats it as a symbol).
pub fn parse_number(text: &str) -> Option<Number> {
    let (radix, exactness, body) = strip_prefixes(text)?;
    if body.is_empty() {
        return None;
    }
    let n = parse_possibly_complex(body, radix)?;
    Some(apply_exactness(n, exactness))
}

fn strip_prefixes(text: &str) -> Option<(u32, Exactness, &str)> {
    let mut radix = 10u32;
    let mut exactness = Exactness::Unspecified;
    let mut rest = text;
    for _ in 0..2 {
        let mut chars = rest.chars();
        if chars.next() != Some('#') {
            break;
        }
        match chars.next()?.to_ascii_lowercase() {
            'b' => radix = 2,
            'o' => radix = 8,
            'd' => radix = 10,
            'x' => radix = 16,
            'e' => exactness = Exactness::Exact,
            'i' => exactness = Exactness::Inexact,
            _ => return None,
        }
        rest = chars.as_str();
    }
    Some((radix, exactness, rest))
}

fn apply_exactness(n: Number, exactness: Exactness) -> Number {
    match exactness {
        Exactness::Unspecified => n,
        Exactness::Exact => {
            if n.is_exact() {
                n
            } else {
                exact_decimal_to_rational(&n.to_f64().to_string()).unwrap_or(n)
            }
        }
        Exactness::Inexact => {
            if n.is_exact() {
                Number::Real(n.to_f64())
            } else {
                n
            }
        }
    }
}

/// Dispatch between a plain real and a rectangular complex literal.
/// Complex literals always end in `i`/`I`; everything else is real.
fn parse_possibly_complex(body: &str, radix: u32) -> Option<Number> {
    let lower = body.to_ascii_lowercase();
    if radix == 10 && lower.ends_with('i') && lower != "i" {
        let mag = &body[..body.len() - 1];
        if let Some(split) = find_imag_split(mag) {
            let (re_part, im_part) = mag.split_at(split);
            let re = parse_unsigned_or_signed_real(re_part, radix)?;
            let im = parse_imag_magnitude(im_part)?;
            return Some(Number::Complex(Box::new(wisp_core::ComplexParts { re, im })));
        }
        // No real part: pure imaginary, e.g. "+3i", "-i".
        let im = parse_imag_magnitude(mag)?;
        return Some(Number::Complex(Box::new(wisp_core::ComplexParts {
            re: Number::Int(0),
            im,
        })));
    }
    parse_unsigned_or_signed_real(body, radix)
}

/// Find the index splitting the real and imaginary parts of a rectangular
/// literal body (the `i` suffix already stripped), by scanning backward for
/// a `+`/`-` that is not part of a decimal exponent marker like `1e-5`.
fn find_imag_split(mag: &str) -> Option<usize> {
    let bytes = mag.as_bytes();
    for idx in (1..bytes.len()).rev() {
        let c = bytes[idx] as char;
        if c == '+' || c == '-' {
            let prev = bytes[idx - 1] as char;
            if prev == 'e' || prev == 'E' {
                continue;
            }
            return Some(idx);
        }
    }
    None
}

/// Parse the imaginary-part magnitude, which may be an empty string
/// (meaning the bare sign: `+i` => 1, `-i` => -1) or a bare sign followed
/// by nothing else, or a full real literal.
fn parse_imag_magnitude(text: &str) -> Option<Number> {
    match text {
        "" | "+" => Some(Number::Int(1)),
        "-" => Some(Number::Int(-1)),
        _ => parse_unsigned_or_signed_real(text, 10),
    }
}

fn parse_unsigned_or_signed_real(text: &str, radix: u32) -> Option<Number> {
    if text.is_empty() {
        return None;
    }
    if radix != 10 {
        return parse_signed_int(text, radix).map(Number::from_big);
    }
    if text.contains('/') {
        let mut parts = text.splitn(2, '/');
        let (n_text, d_text) = (parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let numer = parse_signed_int(n_text, 10)?;
        let denom = parse_signed_int(d_text, 10)?;
        return Some(match (numer.to_i64(), denom.to_i64()) {
            (Some(n), Some(d)) if d != 0 => {
                let r = Ratio::new(n, d);
                if *r.denom() == 1 {
                    Number::Int(*r.numer())
                } else {
                    Number::Rat(r)
                }
            }
            _ => {
                let d = denom.to_f64()?;
                if d == 0.0 {
                    return None;
                }
                Number::Real(numer.to_f64()? / d)
            }
        });
    }
    if looks_like_decimal(text) {
        return parse_decimal(text);
    }
    parse_signed_int(text, 10).map(Number::from_big)
}

fn looks_like_decimal(text: &str) -> bool {
    text.contains('.') || text.contains('e') || text.contains('E')
}

/// An inexact-by-default decimal literal (R7RS: point or exponent implies
/// inexact unless `#e` forces it back through `exact_decimal_to_rational`).
fn parse_decimal(text: &str) -> Option<Number> {
    text.parse::<f64>().ok().map(Number::Real)
}

/// Convert a decimal string to an exact rational by digit-counting: split
/// on `.` and exponent marker, concatenate the mantissa digits, and scale
/// by a power of ten. Falls back to the inexact parse if the scaled
/// numerator doesn't fit an i64 (bignum-backed decimal is not attempted;
/// this is the one simplification the tower's 64-bit rational axis forces).
fn exact_decimal_to_rational(text: &str) -> Option<Number> {
    let (mantissa, exp) = match text.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().ok()?),
        None => (text, 0),
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let digits: String = format!("{int_part}{frac_part}");
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return parse_decimal(text);
    }
    let scale = exp - frac_part.len() as i32;
    let numer_big: BigInt = digits.parse().ok()?;
    let numer_big = numer_big * sign;
    if scale >= 0 {
        let scaled = numer_big * BigInt::from(10u64).pow(scale as u32);
        return Some(Number::from_big(scaled));
    }
    let denom = BigInt::from(10u64).pow((-scale) as u32);
    match (numer_big.to_i64(), denom.to_i64()) {
        (Some(n), Some(d)) => {
            let r = Ratio::new(n, d);
            Some(if *r.denom() == 1 { Number::Int(*r.numer()) } else { Number::Rat(r) })
        }
        _ => parse_decimal(text),
    }
}

fn parse_signed_int(text: &str, radix: u32) -> Option<BigInt> {
    BigInt::parse_bytes(text.as_bytes(), radix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_integers() {
        assert_eq!(parse_number("42"), Some(Number::Int(42)));
        assert_eq!(parse_number("-7"), Some(Number::Int(-7)));
    }

    #[test]
    fn radix_prefixes() {
        assert_eq!(parse_number("#x2a"), Some(Number::Int(42)));
        assert_eq!(parse_number("#b101"), Some(Number::Int(5)));
        assert_eq!(parse_number("#o17"), Some(Number::Int(15)));
    }

    #[test]
    fn rationals_simplify() {
        assert_eq!(parse_number("6/3"), Some(Number::Int(2)));
        match parse_number("1/3").unwrap() {
            Number::Rat(r) => assert_eq!(r, Ratio::new(1, 3)),
            other => panic!("expected rational, got {other:?}"),
        }
    }

    #[test]
    fn decimals_are_inexact_by_default() {
        match parse_number("3.14").unwrap() {
            Number::Real(f) => assert!((f - 3.14).abs() < 1e-9),
            other => panic!("expected real, got {other:?}"),
        }
    }

    #[test]
    fn exact_prefix_forces_rational() {
        assert_eq!(parse_number("#e1.5"), Some(Number::Rat(Ratio::new(3, 2))));
    }

    #[test]
    fn inexact_prefix_forces_real() {
        assert_eq!(parse_number("#i5"), Some(Number::Real(5.0)));
    }

    #[test]
    fn rectangular_complex() {
        match parse_number("3+4i").unwrap() {
            Number::Complex(c) => {
                assert_eq!(c.re, Number::Int(3));
                assert_eq!(c.im, Number::Int(4));
            }
            other => panic!("expected complex, got {other:?}"),
        }
        match parse_number("-i").unwrap() {
            Number::Complex(c) => {
                assert_eq!(c.re, Number::Int(0));
                assert_eq!(c.im, Number::Int(-1));
            }
            other => panic!("expected complex, got {other:?}"),
        }
    }

    #[test]
    fn exponent_sign_is_not_mistaken_for_imaginary_separator() {
        match parse_number("1e-5+2i").unwrap() {
            Number::Complex(c) => {
                assert_eq!(c.re, Number::Real(1e-5));
                assert_eq!(c.im, Number::Int(2));
            }
            other => panic!("expected complex, got {other:?}"),
        }
    }

    #[test]
    fn non_numbers_return_none() {
        assert_eq!(parse_number("hello"), None);
        assert_eq!(parse_number("+"), None);
        assert_eq!(parse_number(""), None);
    }
}
