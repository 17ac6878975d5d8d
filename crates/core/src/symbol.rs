//! Symbol interning.
//!
//! Every distinct symbol name has exactly one `Symbol` value process-wide;
//! pointer equality on the backing `Rc<str>` implies name equality. One
//! canonical allocation, shared by clone, with none of the arena/FFI
//! machinery a multi-strand runtime would need for cross-strand sends: a
//! single-threaded tree-walking evaluator has no strands to send a string
//! to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Special-form tag attached to a handful of well-known symbol names so the
/// evaluator can dispatch on it instead of re-comparing strings on every
/// application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Quote,
    If,
    Define,
    Set,
    Lambda,
    Begin,
    Let,
    LetStar,
    LetRec,
    Cond,
    Case,
    When,
    Unless,
    And,
    Or,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    Delay,
    DelayForce,
    ConsStream,
}

impl SpecialForm {
    fn from_name(name: &str) -> Option<SpecialForm> {
        use SpecialForm::*;
        Some(match name {
            "quote" => Quote,
            "if" => If,
            "define" => Define,
            "set!" => Set,
            "lambda" => Lambda,
            "begin" => Begin,
            "let" => Let,
            "let*" => LetStar,
            "letrec" | "letrec*" => LetRec,
            "cond" => Cond,
            "case" => Case,
            "when" => When,
            "unless" => Unless,
            "and" => And,
            "or" => Or,
            "quasiquote" => Quasiquote,
            "unquote" => Unquote,
            "unquote-splicing" => UnquoteSplicing,
            "delay" => Delay,
            "delay-force" => DelayForce,
            "cons-stream" => ConsStream,
            _ => return None,
        })
    }
}

/// An interned identifier. Comparison is by identity of the backing
/// allocation, never by content.
#[derive(Debug, Clone)]
pub struct Symbol {
    name: Rc<str>,
    special_form: Option<SpecialForm>,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn special_form(&self) -> Option<SpecialForm> {
        self.special_form
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.name, &other.name)
    }
}
impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.name) as *const ()).hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

thread_local! {
    static SYMBOL_TABLE: RefCell<HashMap<Rc<str>, Symbol>> = RefCell::new(HashMap::new());
}

/// Intern `name`, returning the process-wide canonical `Symbol` for it.
/// A second call with the same name returns a `Symbol` that compares equal
/// (by identity) to the first.
pub fn intern(name: &str) -> Symbol {
    SYMBOL_TABLE.with(|table| {
        let mut table = table.borrow_mut();
        if let Some(existing) = table.get(name) {
            return existing.clone();
        }
        let rc: Rc<str> = Rc::from(name);
        let sym = Symbol {
            name: rc.clone(),
            special_form: SpecialForm::from_name(name),
        };
        table.insert(rc, sym.clone());
        sym
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_identity_preserving() {
        let a = intern("foo");
        let b = intern("foo");
        assert_eq!(a, b);
        assert!(Rc::ptr_eq(&a.name, &b.name));
    }

    #[test]
    fn distinct_names_are_distinct() {
        assert_ne!(intern("foo"), intern("bar"));
    }

    #[test]
    fn special_forms_are_tagged() {
        assert_eq!(intern("if").special_form(), Some(SpecialForm::If));
        assert_eq!(intern("my-var").special_form(), None);
    }
}
