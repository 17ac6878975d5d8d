//! Printer: renders a `Value` in `display`, `write`, or `repl` mode, with
//! cycle detection via a visited-set and `#n=`/`#n#` datum-label notation
//! for any structure that turns out to be cyclic.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use wisp_core::{BytevectorData, PairData, Procedure, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    Display,
    Write,
    Repl,
}

pub fn print_to_string(value: &Value, mode: PrintMode) -> String {
    let mut printer = Printer {
        mode,
        out: String::new(),
        labels: HashMap::new(),
        next_label: 0,
        printed: std::collections::HashSet::new(),
    };
    printer.assign_labels(value, &mut HashMap::new());
    printer.write_value(value);
    printer.out
}

struct Printer {
    mode: PrintMode,
    out: String,
    /// Pointer identity (as a usize) -> assigned datum label, only for
    /// structures visited more than once during the pre-pass.
    labels: HashMap<usize, usize>,
    next_label: usize,
    /// Labeled keys whose `#n=...` body has already been emitted once;
    /// later encounters print the bare `#n#` back-reference instead.
    printed: std::collections::HashSet<usize>,
}

impl Printer {
    /// Pre-pass: walk the structure once to find pairs/vectors reachable
    /// by more than one path (the only way a tree becomes a graph here,
    /// since everything else is immutable or atomic).
    fn assign_labels(&mut self, value: &Value, seen: &mut HashMap<usize, usize>) {
        match value {
            Value::Pair(p) => {
                let key = Rc::as_ptr(p) as usize;
                let count = seen.entry(key).or_insert(0);
                *count += 1;
                if *count > 1 {
                    return; // already walked once; don't recurse infinitely
                }
                self.assign_labels(&p.car.borrow(), seen);
                self.assign_labels(&p.cdr.borrow(), seen);
            }
            Value::Vector(v) => {
                let key = Rc::as_ptr(v) as usize;
                let count = seen.entry(key).or_insert(0);
                *count += 1;
                if *count > 1 {
                    return;
                }
                for item in v.borrow().iter() {
                    self.assign_labels(item, seen);
                }
            }
            _ => {}
        }
        for (key, count) in seen.iter() {
            if *count > 1 && !self.labels.contains_key(key) {
                self.labels.insert(*key, self.next_label);
                self.next_label += 1;
            }
        }
    }

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Nil => self.out.push_str("()"),
            Value::Bool(true) => self.out.push_str("#t"),
            Value::Bool(false) => self.out.push_str("#f"),
            Value::Char(c) => self.write_char(*c),
            Value::String(s) => self.write_string(s.as_str()),
            Value::Symbol(s) => self.write_symbol(&s.to_string()),
            Value::Integer(i) => {
                let _ = write!(self.out, "{i}");
            }
            Value::BigInt(b) => {
                let _ = write!(self.out, "{b}");
            }
            Value::Rational(r) => {
                let _ = write!(self.out, "{}/{}", r.numer(), r.denom());
            }
            Value::Real(f) => self.write_real(*f),
            Value::Complex(c) => self.write_complex(c),
            Value::Pair(p) => self.write_pair(p),
            Value::Vector(v) => self.write_vector(v),
            Value::Bytevector(bv) => self.write_bytevector(&bv.borrow()),
            Value::Procedure(p) => self.write_procedure(p),
            Value::Port(_) => self.out.push_str("#<port>"),
            Value::Promise(_) => self.out.push_str("#<promise>"),
            Value::Stream(_) => self.out.push_str("#<stream>"),
            Value::Error(e) => {
                let _ = write!(self.out, "#<error {} {}>", e.category.tag(), e.message);
            }
            Value::Eof => self.out.push_str("#<eof>"),
            Value::Unspecified => {}
        }
    }

    fn write_char(&mut self, c: char) {
        match self.mode {
            PrintMode::Display => self.out.push(c),
            PrintMode::Write | PrintMode::Repl => {
                self.out.push_str("#\\");
                match c {
                    ' ' => self.out.push_str("space"),
                    '\n' => self.out.push_str("newline"),
                    '\t' => self.out.push_str("tab"),
                    '\r' => self.out.push_str("return"),
                    '\0' => self.out.push_str("null"),
                    '\u{7}' => self.out.push_str("alarm"),
                    '\u{8}' => self.out.push_str("backspace"),
                    '\u{7f}' => self.out.push_str("delete"),
                    '\u{1b}' => self.out.push_str("escape"),
                    _ => self.out.push(c),
                }
            }
        }
    }

    fn write_string(&mut self, s: &str) {
        match self.mode {
            PrintMode::Display => self.out.push_str(s),
            PrintMode::Write | PrintMode::Repl => {
                self.out.push('"');
                for c in s.chars() {
                    match c {
                        '"' => self.out.push_str("\\\""),
                        '\\' => self.out.push_str("\\\\"),
                        '\n' => self.out.push_str("\\n"),
                        '\t' => self.out.push_str("\\t"),
                        '\r' => self.out.push_str("\\r"),
                        _ => self.out.push(c),
                    }
                }
                self.out.push('"');
            }
        }
    }

    fn write_symbol(&mut self, name: &str) {
        if matches!(self.mode, PrintMode::Write | PrintMode::Repl) && !name.is_ascii() {
            let _ = write!(self.out, "|{name}|");
        } else {
            self.out.push_str(name);
        }
    }

    /// Reals always show a decimal point, appending `.0` when the value
    /// has no fractional part, so they're never confused with exact
    /// integers in printed output.
    fn write_real(&mut self, f: f64) {
        if f.is_nan() {
            self.out.push_str("+nan.0");
        } else if f.is_infinite() {
            self.out.push_str(if f > 0.0 { "+inf.0" } else { "-inf.0" });
        } else if f == f.trunc() && f.abs() < 1e17 {
            let _ = write!(self.out, "{f:.1}");
        } else {
            let _ = write!(self.out, "{f}");
        }
    }

    fn write_complex(&mut self, c: &wisp_core::ComplexParts) {
        self.write_value(&Value::from_number(c.re.clone()));
        let im_is_negative = c.im.to_f64() < 0.0;
        if !im_is_negative {
            self.out.push('+');
        }
        self.write_value(&Value::from_number(c.im.clone()));
        self.out.push('i');
    }

    /// A pair/vector reachable from more than one place (or part of a true
    /// cycle) gets a label the first time it's printed; every later
    /// encounter -- including a recursive one found while still printing
    /// its own body, for a genuine cycle -- prints the bare back-reference.
    /// Returns `true` if the caller should skip printing the body because
    /// a back-reference (or the opening label) was already emitted.
    fn write_label_prefix(&mut self, key: usize) -> bool {
        let Some(&label) = self.labels.get(&key) else {
            return false;
        };
        if self.printed.contains(&key) {
            let _ = write!(self.out, "#{label}#");
            return true;
        }
        self.printed.insert(key);
        let _ = write!(self.out, "#{label}=");
        false
    }

    fn write_pair(&mut self, p: &Rc<PairData>) {
        let key = Rc::as_ptr(p) as usize;
        if self.write_label_prefix(key) {
            return;
        }
        self.write_pair_body(p);
    }

    fn write_pair_body(&mut self, p: &Rc<PairData>) {
        self.out.push('(');
        self.write_value(&p.car.borrow());
        let mut cur = p.cdr.borrow().clone();
        loop {
            match cur {
                Value::Pair(next) => {
                    let key = Rc::as_ptr(&next) as usize;
                    if self.labels.contains_key(&key) {
                        self.out.push_str(" . ");
                        self.write_pair(&next);
                        break;
                    }
                    self.out.push(' ');
                    self.write_value(&next.car.borrow());
                    cur = next.cdr.borrow().clone();
                }
                Value::Nil => break,
                other => {
                    self.out.push_str(" . ");
                    self.write_value(&other);
                    break;
                }
            }
        }
        self.out.push(')');
    }

    fn write_vector(&mut self, v: &Rc<std::cell::RefCell<Vec<Value>>>) {
        let key = Rc::as_ptr(v) as usize;
        if self.write_label_prefix(key) {
            return;
        }
        self.out.push_str("#(");
        let items = v.borrow();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            self.write_value(item);
        }
        self.out.push(')');
    }

    fn write_bytevector(&mut self, bv: &BytevectorData) {
        let prefix = match bv {
            BytevectorData::U8(_) => "#u8",
            BytevectorData::S8(_) => "#s8",
            BytevectorData::U16(_) => "#u16",
            BytevectorData::S16(_) => "#s16",
            BytevectorData::U32(_) => "#u32",
            BytevectorData::S32(_) => "#s32",
            BytevectorData::U64(_) => "#u64",
            BytevectorData::S64(_) => "#s64",
        };
        self.out.push_str(prefix);
        self.out.push('(');
        macro_rules! join {
            ($v:expr) => {
                for (i, x) in $v.iter().enumerate() {
                    if i > 0 {
                        self.out.push(' ');
                    }
                    let _ = write!(self.out, "{x}");
                }
            };
        }
        match bv {
            BytevectorData::U8(v) => join!(v),
            BytevectorData::S8(v) => join!(v),
            BytevectorData::U16(v) => join!(v),
            BytevectorData::S16(v) => join!(v),
            BytevectorData::U32(v) => join!(v),
            BytevectorData::S32(v) => join!(v),
            BytevectorData::U64(v) => join!(v),
            BytevectorData::S64(v) => join!(v),
        }
        self.out.push(')');
    }

    fn write_procedure(&mut self, p: &Rc<Procedure>) {
        match p.name() {
            Some(name) => {
                let _ = write!(self.out, "#<procedure {name}>");
            }
            None => self.out.push_str("#<procedure>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_str(v: &Value) -> String {
        print_to_string(v, PrintMode::Write)
    }

    fn display_str(v: &Value) -> String {
        print_to_string(v, PrintMode::Display)
    }

    #[test]
    fn strings_quoted_in_write_bare_in_display() {
        let s = Value::string("hi\n");
        assert_eq!(write_str(&s), r#""hi\n""#);
        assert_eq!(display_str(&s), "hi\n");
    }

    #[test]
    fn reals_always_show_a_point() {
        assert_eq!(write_str(&Value::Real(3.0)), "3.0");
        assert_eq!(write_str(&Value::Real(3.5)), "3.5");
    }

    #[test]
    fn proper_and_dotted_lists() {
        let proper = Value::list(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(write_str(&proper), "(1 2)");
        let dotted = Value::cons(Value::Integer(1), Value::Integer(2));
        assert_eq!(write_str(&dotted), "(1 . 2)");
    }

    #[test]
    fn vectors_prefixed_with_hash() {
        let v = Value::vector(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(write_str(&v), "#(1 2)");
    }

    #[test]
    fn rationals_print_as_fraction() {
        use num_rational::Ratio;
        assert_eq!(write_str(&Value::Rational(Ratio::new(1, 3))), "1/3");
    }

    #[test]
    fn characters_print_by_name_in_write_mode() {
        assert_eq!(write_str(&Value::Char(' ')), "#\\space");
        assert_eq!(write_str(&Value::Char('a')), "#\\a");
    }
}
