//! String and character builtins: grapheme-aware string
//! operations backed by `SchemeString`'s cached grapheme count, plus the
//! character classification and case-conversion predicates.

use std::rc::Rc;

use unicode_segmentation::UnicodeSegmentation;
use wisp_core::{intern, Environment, SchemeError, SchemeString, Value};

use super::{arity_exact, arity_min, arity_range, def};
use crate::eval;

pub(super) fn register(env: &Rc<Environment>) {
    def(env, "string", |_, a| {
        let s: String = a
            .iter()
            .map(|v| match v {
                Value::Char(c) => Ok(*c),
                other => Err(SchemeError::type_error(format!("string: expected a char, got {}", other.type_name()))),
            })
            .collect::<Result<String, SchemeError>>()?;
        Ok(Value::string(s))
    });
    def(env, "make-string", b_make_string);
    def(env, "string-length", |_, a| {
        arity_exact(a, 1, "string-length")?;
        Ok(Value::Integer(as_str(&a[0], "string-length")?.1.len() as i64))
    });
    def(env, "string-ref", b_string_ref);
    def(env, "string-set!", |_, _| {
        // `SchemeString` caches grapheme boundaries and byte length; a
        // single-character in-place mutation would invalidate both, and
        // R7RS leaves mutable strings as a low-value legacy feature, so
        // this interpreter supports mutation only through whole-string
        // replacement (`string-fill!`, `string-copy!` are not provided).
        Err(SchemeError::generic("string-set!: strings are immutable in this implementation"))
    });
    def(env, "substring", b_substring);
    def(env, "string-copy", b_string_copy);
    def(env, "string-append", b_string_append);
    def(env, "string-fill!", |_, _| {
        Err(SchemeError::generic("string-fill!: strings are immutable in this implementation"))
    });

    def(env, "string=?", |_, a| string_compare(a, "string=?", |o| o == std::cmp::Ordering::Equal));
    def(env, "string<?", |_, a| string_compare(a, "string<?", |o| o == std::cmp::Ordering::Less));
    def(env, "string>?", |_, a| string_compare(a, "string>?", |o| o == std::cmp::Ordering::Greater));
    def(env, "string<=?", |_, a| string_compare(a, "string<=?", |o| o != std::cmp::Ordering::Greater));
    def(env, "string>=?", |_, a| string_compare(a, "string>=?", |o| o != std::cmp::Ordering::Less));
    def(env, "string-ci=?", |_, a| string_compare_ci(a, "string-ci=?", |o| o == std::cmp::Ordering::Equal));

    def(env, "string->list", b_string_to_list);
    def(env, "list->string", b_list_to_string);
    def(env, "string->vector", b_string_to_vector);
    def(env, "vector->string", b_vector_to_string);
    def(env, "string->symbol", |_, a| {
        arity_exact(a, 1, "string->symbol")?;
        Ok(Value::Symbol(intern(as_str(&a[0], "string->symbol")?.0)))
    });
    def(env, "symbol->string", |_, a| {
        arity_exact(a, 1, "symbol->string")?;
        match &a[0] {
            Value::Symbol(s) => Ok(Value::string(s.to_string())),
            other => Err(SchemeError::type_error(format!("symbol->string: expected a symbol, got {}", other.type_name()))),
        }
    });
    def(env, "symbol=?", |_, a| {
        arity_min(a, 2, "symbol=?")?;
        let first = match &a[0] {
            Value::Symbol(s) => s.clone(),
            other => return Err(SchemeError::type_error(format!("symbol=?: expected a symbol, got {}", other.type_name()))),
        };
        Ok(Value::Bool(a.iter().all(|v| matches!(v, Value::Symbol(s) if *s == first))))
    });

    def(env, "string-upcase", |_, a| map_string(a, "string-upcase", |s| s.to_uppercase()));
    def(env, "string-downcase", |_, a| map_string(a, "string-downcase", |s| s.to_lowercase()));
    // Grapheme-cluster reversal, not byte or code-point reversal, so
    // combining marks and multi-codepoint emoji stay attached to their base.
    def(env, "string-reverse", |_, a| {
        let (s, _) = as_str(&a[0], "string-reverse")?;
        Ok(Value::string(s.graphemes(true).rev().collect::<String>()))
    });
    def(env, "string-null?", |_, a| {
        arity_exact(a, 1, "string-null?")?;
        Ok(Value::Bool(as_str(&a[0], "string-null?")?.0.is_empty()))
    });
    def(env, "string-contains", |_, a| {
        arity_exact(a, 2, "string-contains")?;
        let (haystack, _) = as_str(&a[0], "string-contains")?;
        let (needle, _) = as_str(&a[1], "string-contains")?;
        Ok(Value::Bool(haystack.contains(needle)))
    });
    def(env, "string-split", b_string_split);
    def(env, "string-trim", |_, a| {
        let (s, _) = as_str(&a[0], "string-trim")?;
        Ok(Value::string(s.trim().to_string()))
    });
    def(env, "string-trim-left", |_, a| {
        let (s, _) = as_str(&a[0], "string-trim-left")?;
        Ok(Value::string(s.trim_start().to_string()))
    });
    def(env, "string-trim-right", |_, a| {
        let (s, _) = as_str(&a[0], "string-trim-right")?;
        Ok(Value::string(s.trim_end().to_string()))
    });
    def(env, "string-pad", |_, a| b_string_pad(a, true));
    def(env, "string-pad-right", |_, a| b_string_pad(a, false));
    def(env, "string-map", b_string_map);
    def(env, "string-for-each", b_string_for_each);

    def(env, "char->integer", |_, a| {
        arity_exact(a, 1, "char->integer")?;
        match &a[0] {
            Value::Char(c) => Ok(Value::Integer(*c as i64)),
            other => Err(SchemeError::type_error(format!("char->integer: expected a char, got {}", other.type_name()))),
        }
    });
    def(env, "integer->char", |_, a| {
        arity_exact(a, 1, "integer->char")?;
        match &a[0] {
            Value::Integer(n) => char::from_u32(*n as u32)
                .map(Value::Char)
                .ok_or_else(|| SchemeError::value_error("integer->char: not a valid Unicode scalar value")),
            other => Err(SchemeError::type_error(format!("integer->char: expected an integer, got {}", other.type_name()))),
        }
    });
    def(env, "char=?", |_, a| char_compare(a, "char=?", |o| o == std::cmp::Ordering::Equal));
    def(env, "char<?", |_, a| char_compare(a, "char<?", |o| o == std::cmp::Ordering::Less));
    def(env, "char>?", |_, a| char_compare(a, "char>?", |o| o == std::cmp::Ordering::Greater));
    def(env, "char<=?", |_, a| char_compare(a, "char<=?", |o| o != std::cmp::Ordering::Greater));
    def(env, "char>=?", |_, a| char_compare(a, "char>=?", |o| o != std::cmp::Ordering::Less));
    def(env, "char-ci=?", |_, a| {
        arity_min(a, 2, "char-ci=?")?;
        let chars = as_chars(a, "char-ci=?")?;
        Ok(Value::Bool(chars.windows(2).all(|w| w[0].to_lowercase().eq(w[1].to_lowercase()))))
    });
    def(env, "char-upcase", |_, a| {
        arity_exact(a, 1, "char-upcase")?;
        as_char(&a[0], "char-upcase").map(|c| Value::Char(c.to_uppercase().next().unwrap_or(c)))
    });
    def(env, "char-downcase", |_, a| {
        arity_exact(a, 1, "char-downcase")?;
        as_char(&a[0], "char-downcase").map(|c| Value::Char(c.to_lowercase().next().unwrap_or(c)))
    });
    def(env, "char-alphabetic?", |_, a| {
        arity_exact(a, 1, "char-alphabetic?")?;
        Ok(Value::Bool(as_char(&a[0], "char-alphabetic?")?.is_alphabetic()))
    });
    def(env, "char-numeric?", |_, a| {
        arity_exact(a, 1, "char-numeric?")?;
        Ok(Value::Bool(as_char(&a[0], "char-numeric?")?.is_numeric()))
    });
    def(env, "char-whitespace?", |_, a| {
        arity_exact(a, 1, "char-whitespace?")?;
        Ok(Value::Bool(as_char(&a[0], "char-whitespace?")?.is_whitespace()))
    });
    def(env, "char-upper-case?", |_, a| {
        arity_exact(a, 1, "char-upper-case?")?;
        Ok(Value::Bool(as_char(&a[0], "char-upper-case?")?.is_uppercase()))
    });
    def(env, "char-lower-case?", |_, a| {
        arity_exact(a, 1, "char-lower-case?")?;
        Ok(Value::Bool(as_char(&a[0], "char-lower-case?")?.is_lowercase()))
    });
}

fn as_str<'a>(v: &'a Value, who: &str) -> Result<(&'a str, Rc<SchemeString>), SchemeError> {
    match v {
        Value::String(s) => Ok((s.as_str(), s.clone())),
        other => Err(SchemeError::type_error(format!("{who}: expected a string, got {}", other.type_name()))),
    }
}

fn as_char(v: &Value, who: &str) -> Result<char, SchemeError> {
    match v {
        Value::Char(c) => Ok(*c),
        other => Err(SchemeError::type_error(format!("{who}: expected a char, got {}", other.type_name()))),
    }
}

fn as_chars(args: &[Value], who: &str) -> Result<Vec<char>, SchemeError> {
    args.iter().map(|v| as_char(v, who)).collect()
}

fn b_make_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "make-string")?;
    let n = match &args[0] {
        Value::Integer(n) if *n >= 0 => *n as usize,
        _ => return Err(SchemeError::type_error("make-string: expected a non-negative exact integer")),
    };
    let fill = match args.get(1) {
        Some(v) => as_char(v, "make-string")?,
        None => ' ',
    };
    Ok(Value::string(std::iter::repeat(fill).take(n).collect::<String>()))
}

fn b_string_ref(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "string-ref")?;
    let (_, s) = as_str(&args[0], "string-ref")?;
    let k = index_arg(&args[1], "string-ref")?;
    let graphemes = s.graphemes();
    graphemes
        .get(k)
        .and_then(|g| g.chars().next())
        .map(Value::Char)
        .ok_or_else(|| SchemeError::index_error("string-ref: index out of range"))
}

fn index_arg(v: &Value, who: &str) -> Result<usize, SchemeError> {
    match v {
        Value::Integer(n) if *n >= 0 => Ok(*n as usize),
        _ => Err(SchemeError::type_error(format!("{who}: expected a non-negative exact integer"))),
    }
}

fn b_substring(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 2, 3, "substring")?;
    let (_, s) = as_str(&args[0], "substring")?;
    let graphemes = s.graphemes();
    let start = index_arg(&args[1], "substring")?;
    let end = match args.get(2) {
        Some(v) => index_arg(v, "substring")?,
        None => graphemes.len(),
    };
    if start > end || end > graphemes.len() {
        return Err(SchemeError::index_error("substring: index out of range"));
    }
    Ok(Value::string(graphemes[start..end].concat()))
}

fn b_string_copy(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 3, "string-copy")?;
    if args.len() == 1 {
        let (s, _) = as_str(&args[0], "string-copy")?;
        return Ok(Value::string(s.to_string()));
    }
    b_substring(_env, args)
}

fn b_string_append(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    let mut out = String::new();
    for v in args {
        out.push_str(as_str(v, "string-append")?.0);
    }
    Ok(Value::string(out))
}

fn string_compare(args: &[Value], who: &str, accept: impl Fn(std::cmp::Ordering) -> bool) -> Result<Value, SchemeError> {
    arity_min(args, 1, who)?;
    let strs: Vec<&str> = args.iter().map(|v| as_str(v, who).map(|(s, _)| s)).collect::<Result<_, _>>()?;
    Ok(Value::Bool(strs.windows(2).all(|w| accept(w[0].cmp(w[1])))))
}

fn string_compare_ci(args: &[Value], who: &str, accept: impl Fn(std::cmp::Ordering) -> bool) -> Result<Value, SchemeError> {
    arity_min(args, 1, who)?;
    let strs: Vec<String> = args.iter().map(|v| as_str(v, who).map(|(s, _)| s.to_lowercase())).collect::<Result<_, _>>()?;
    Ok(Value::Bool(strs.windows(2).all(|w| accept(w[0].cmp(&w[1])))))
}

fn char_compare(args: &[Value], who: &str, accept: impl Fn(std::cmp::Ordering) -> bool) -> Result<Value, SchemeError> {
    arity_min(args, 1, who)?;
    let chars = as_chars(args, who)?;
    Ok(Value::Bool(chars.windows(2).all(|w| accept(w[0].cmp(&w[1])))))
}

fn b_string_to_list(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 3, "string->list")?;
    let (_, s) = as_str(&args[0], "string->list")?;
    let graphemes = s.graphemes();
    let start = args.get(1).map(|v| index_arg(v, "string->list")).transpose()?.unwrap_or(0);
    let end = args.get(2).map(|v| index_arg(v, "string->list")).transpose()?.unwrap_or(graphemes.len());
    if start > end || end > graphemes.len() {
        return Err(SchemeError::index_error("string->list: index out of range"));
    }
    let chars: Vec<Value> = graphemes[start..end]
        .iter()
        .filter_map(|g| g.chars().next())
        .map(Value::Char)
        .collect();
    Ok(Value::list(chars))
}

fn b_list_to_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "list->string")?;
    let items = args[0].list_to_vec().ok_or_else(|| SchemeError::type_error("list->string: expected a proper list"))?;
    let s: String = items
        .iter()
        .map(|v| as_char(v, "list->string"))
        .collect::<Result<String, SchemeError>>()?;
    Ok(Value::string(s))
}

fn b_string_to_vector(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "string->vector")?;
    let (_, s) = as_str(&args[0], "string->vector")?;
    let items: Vec<Value> = s.graphemes().into_iter().filter_map(|g| g.chars().next()).map(Value::Char).collect();
    Ok(Value::vector(items))
}

fn b_vector_to_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "vector->string")?;
    match &args[0] {
        Value::Vector(v) => {
            let s: String = v
                .borrow()
                .iter()
                .map(|x| as_char(x, "vector->string"))
                .collect::<Result<String, SchemeError>>()?;
            Ok(Value::string(s))
        }
        other => Err(SchemeError::type_error(format!("vector->string: expected a vector, got {}", other.type_name()))),
    }
}

fn map_string(args: &[Value], who: &str, f: impl Fn(&str) -> String) -> Result<Value, SchemeError> {
    arity_exact(args, 1, who)?;
    let (s, _) = as_str(&args[0], who)?;
    Ok(Value::string(f(s)))
}

/// `(string-split s sep)`: split on a single-character separator. With no
/// separator, splits on any run of whitespace (trimming empty fields),
/// matching `original_source/src/strings.c`'s whitespace-default behavior.
fn b_string_split(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "string-split")?;
    let (s, _) = as_str(&args[0], "string-split")?;
    let parts: Vec<Value> = match args.get(1) {
        Some(v) => {
            let sep = as_char(v, "string-split")?;
            s.split(sep).map(Value::string).collect()
        }
        None => s.split_whitespace().map(Value::string).collect(),
    };
    Ok(Value::list(parts))
}

/// `(string-pad s n [char])`: pad on the left, truncating excess characters
/// from the left (R7RS semantics: the result always has exactly `n`
/// characters). `string-pad-right` pads/truncates on the right instead.
fn b_string_pad(args: &[Value], left: bool) -> Result<Value, SchemeError> {
    let who = if left { "string-pad" } else { "string-pad-right" };
    arity_range(args, 2, 3, who)?;
    let (s, _) = as_str(&args[0], who)?;
    let n = index_arg(&args[1], who)?;
    let fill = match args.get(2) {
        Some(v) => as_char(v, who)?,
        None => ' ',
    };
    let graphemes: Vec<&str> = s.graphemes(true).collect();
    let len = graphemes.len();
    if len >= n {
        let skip = len - n;
        return Ok(Value::string(if left { graphemes[skip..].concat() } else { graphemes[..n].concat() }));
    }
    let pad: String = std::iter::repeat(fill).take(n - len).collect();
    Ok(Value::string(if left { format!("{pad}{s}") } else { format!("{s}{pad}") }))
}

fn b_string_map(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 2, "string-map")?;
    let proc = &args[0];
    let strs: Vec<Vec<char>> = args[1..]
        .iter()
        .map(|v| as_str(v, "string-map").map(|(s, _)| s.chars().collect()))
        .collect::<Result<_, _>>()?;
    let len = strs.iter().map(|s| s.len()).min().unwrap_or(0);
    let mut out = String::new();
    for i in 0..len {
        let call_args: Vec<Value> = strs.iter().map(|s| Value::Char(s[i])).collect();
        match eval::apply(proc, call_args)? {
            Value::Char(c) => out.push(c),
            other => return Err(SchemeError::type_error(format!("string-map: procedure returned {}, expected a char", other.type_name()))),
        }
    }
    Ok(Value::string(out))
}

fn b_string_for_each(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_min(args, 2, "string-for-each")?;
    let proc = &args[0];
    let strs: Vec<Vec<char>> = args[1..]
        .iter()
        .map(|v| as_str(v, "string-for-each").map(|(s, _)| s.chars().collect()))
        .collect::<Result<_, _>>()?;
    let len = strs.iter().map(|s| s.len()).min().unwrap_or(0);
    for i in 0..len {
        let call_args: Vec<Value> = strs.iter().map(|s| Value::Char(s[i])).collect();
        eval::apply(proc, call_args)?;
    }
    Ok(Value::Unspecified)
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
    fn string_length_counts_graphemes_not_bytes() {
        // "e" + combining acute is two codepoints, one grapheme.
        assert!(matches!(run("(string-length \"e\u{0301}\")"), Value::Integer(1)));
    }

    #[test]
    fn substring_and_append() {
        assert!(matches!(run("(string=? (substring \"hello\" 1 3) \"el\")"), Value::Bool(true)));
        assert!(matches!(run("(string=? (string-append \"foo\" \"bar\") \"foobar\")"), Value::Bool(true)));
    }

    #[test]
    fn case_conversion_and_comparison() {
        assert!(matches!(run("(string=? (string-upcase \"abc\") \"ABC\")"), Value::Bool(true)));
        assert!(matches!(run("(string<? \"abc\" \"abd\")"), Value::Bool(true)));
    }

    #[test]
    fn char_predicates() {
        assert!(matches!(run("(char-alphabetic? #\\a)"), Value::Bool(true)));
        assert!(matches!(run("(char-numeric? #\\5)"), Value::Bool(true)));
        assert!(matches!(run("(char-whitespace? #\\space)"), Value::Bool(true)));
    }

    #[test]
    fn string_symbol_round_trip() {
        assert!(matches!(run("(eq? (string->symbol \"foo\") 'foo)"), Value::Bool(true)));
    }

    #[test]
    fn string_split_and_trim() {
        assert!(matches!(run("(= (length (string-split \"a,b,c\" #\\,)) 3)"), Value::Bool(true)));
        assert!(matches!(run("(string=? (string-trim \"  hi  \") \"hi\")"), Value::Bool(true)));
    }

    #[test]
    fn string_pad_truncates_and_fills() {
        assert!(matches!(run("(string=? (string-pad \"7\" 3) \"  7\")"), Value::Bool(true)));
        assert!(matches!(run("(string=? (string-pad-right \"7\" 3) \"7  \")"), Value::Bool(true)));
        assert!(matches!(run("(string=? (string-pad \"hello\" 3) \"llo\")"), Value::Bool(true)));
    }

    #[test]
    fn string_map_and_for_each() {
        assert!(matches!(run("(string=? (string-map char-upcase \"abc\") \"ABC\")"), Value::Bool(true)));
        assert!(matches!(
            run("(let ((n 0)) (string-for-each (lambda (c) (set! n (+ n 1))) \"abc\") n)"),
            Value::Integer(3)
        ));
    }

    #[test]
    fn string_null_and_contains() {
        assert!(matches!(run("(string-null? \"\")"), Value::Bool(true)));
        assert!(matches!(run("(string-contains \"hello\" \"ell\")"), Value::Bool(true)));
    }
}
