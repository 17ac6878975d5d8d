//! Recursive-descent datum parser: token stream -> `wisp_core::Value` trees.
//!
//! Parses off a flat `Vec<Token>` plus a cursor (`check`/`consume`/`advance`
//! helpers) rather than parsing directly off the lexer, so a whole
//! top-level form can be buffered by the REPL's continuation tracker
//! before parsing begins.

use crate::lexer::{Lexer, Token, TokenKind};
use crate::numbers::parse_number;
use wisp_core::{BytevectorData, SchemeError, Value};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    /// Tokenize and collect every top-level datum in `source`.
    pub fn parse_all(source: &str) -> Result<Vec<Value>, SchemeError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(tok) = lexer.next_token()? {
            tokens.push(tok);
        }
        let mut parser = Parser::new(tokens);
        let mut out = Vec::new();
        while !parser.is_at_end() {
            out.push(parser.datum()?);
        }
        Ok(out)
    }

    /// Parse exactly one datum from `source`, erroring if there's trailing
    /// non-whitespace content (used by `read` on an already-open port).
    pub fn parse_one(source: &str) -> Result<Option<Value>, SchemeError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(tok) = lexer.next_token()? {
            tokens.push(tok);
        }
        if tokens.is_empty() {
            return Ok(None);
        }
        let mut parser = Parser::new(tokens);
        let datum = parser.datum()?;
        Ok(Some(datum))
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let tok = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<(), SchemeError> {
        match self.advance() {
            Some(ref k) if k == expected => Ok(()),
            Some(k) => Err(SchemeError::read_error(format!("expected {expected:?}, found {k:?}"))),
            None => Err(SchemeError::read_error(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn datum(&mut self) -> Result<Value, SchemeError> {
        let tok = self
            .advance()
            .ok_or_else(|| SchemeError::read_error("unexpected end of input while reading a datum"))?;
        match tok {
            TokenKind::LParen => self.list_or_pair(),
            TokenKind::VecOpen => self.vector(),
            TokenKind::ByteVecOpen => self.bytevector(),
            TokenKind::Quote => Ok(wrap("quote", self.datum()?)),
            TokenKind::Quasiquote => Ok(wrap("quasiquote", self.datum()?)),
            TokenKind::Unquote => Ok(wrap("unquote", self.datum()?)),
            TokenKind::UnquoteSplicing => Ok(wrap("unquote-splicing", self.datum()?)),
            TokenKind::DatumComment => {
                // #; discards the next datum entirely, then reads past it.
                self.datum()?;
                self.datum()
            }
            TokenKind::Bool(b) => Ok(Value::Bool(b)),
            TokenKind::Char(c) => Ok(Value::Char(c)),
            TokenKind::Str(s) => Ok(Value::string(s)),
            TokenKind::Dot => Err(SchemeError::read_error("unexpected '.' outside a list")),
            TokenKind::RParen => Err(SchemeError::read_error("unexpected ')'")),
            TokenKind::Atom(text) => Ok(atom_to_value(&text)),
        }
    }

    fn list_or_pair(&mut self) -> Result<Value, SchemeError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(SchemeError::read_error("unterminated list")),
                Some(TokenKind::RParen) => {
                    self.advance();
                    return Ok(Value::list(items));
                }
                Some(TokenKind::Dot) => {
                    self.advance();
                    let tail = self.datum()?;
                    self.expect(&TokenKind::RParen)?;
                    return Ok(dotted_list(items, tail));
                }
                Some(TokenKind::DatumComment) => {
                    self.advance();
                    self.datum()?; // discard the commented-out datum
                }
                _ => items.push(self.datum()?),
            }
        }
    }

    fn vector(&mut self) -> Result<Value, SchemeError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(SchemeError::read_error("unterminated vector")),
                Some(TokenKind::RParen) => {
                    self.advance();
                    return Ok(Value::vector(items));
                }
                _ => items.push(self.datum()?),
            }
        }
    }

    fn bytevector(&mut self) -> Result<Value, SchemeError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(SchemeError::read_error("unterminated bytevector")),
                Some(TokenKind::RParen) => {
                    self.advance();
                    break;
                }
                _ => {
                    let d = self.datum()?;
                    let byte = match &d {
                        Value::Integer(n) if (0..=255).contains(n) => *n as u8,
                        _ => return Err(SchemeError::type_error("bytevector element must be an exact integer in 0..255")),
                    };
                    items.push(byte);
                }
            }
        }
        Ok(Value::Bytevector(std::rc::Rc::new(std::cell::RefCell::new(BytevectorData::U8(items)))))
    }
}

fn wrap(keyword: &str, datum: Value) -> Value {
    Value::list(vec![Value::symbol(keyword), datum])
}

fn dotted_list(items: Vec<Value>, tail: Value) -> Value {
    let mut out = tail;
    for item in items.into_iter().rev() {
        out = Value::cons(item, out);
    }
    out
}

fn atom_to_value(text: &str) -> Value {
    if let Some(n) = parse_number(text) {
        return Value::from_number(n);
    }
    Value::symbol(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_core::is_equal;

    fn parse(src: &str) -> Value {
        Parser::parse_all(src).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn self_evaluating_atoms() {
        assert!(matches!(parse("42"), Value::Integer(42)));
        assert!(matches!(parse("#t"), Value::Bool(true)));
        assert!(matches!(parse(r#""hi""#), Value::String(_)));
    }

    #[test]
    fn proper_and_dotted_lists() {
        let proper = parse("(1 2 3)");
        assert!(is_equal(
            &proper,
            &Value::list(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
        ));

        let dotted = parse("(1 . 2)");
        assert!(is_equal(&dotted, &Value::cons(Value::Integer(1), Value::Integer(2))));
    }

    #[test]
    fn vectors_and_bytevectors() {
        let v = parse("#(1 2 3)");
        match v {
            Value::Vector(items) => assert_eq!(items.borrow().len(), 3),
            other => panic!("expected vector, got {other:?}"),
        }
        let bv = parse("#u8(1 2 255)");
        assert!(matches!(bv, Value::Bytevector(_)));
    }

    #[test]
    fn quote_family_reader_macros() {
        let q = parse("'x");
        assert!(is_equal(&q, &Value::list(vec![Value::symbol("quote"), Value::symbol("x")])));

        let qq = parse("`(a ,b ,@c)");
        match qq {
            Value::Pair(_) => {}
            other => panic!("expected pair, got {other:?}"),
        }
    }

    #[test]
    fn datum_comments_are_skipped() {
        let forms = Parser::parse_all("(+ 1 #;2 3)").unwrap();
        assert_eq!(forms.len(), 1);
        assert!(is_equal(
            &forms[0],
            &Value::list(vec![Value::symbol("+"), Value::Integer(1), Value::Integer(3)])
        ));
    }

    #[test]
    fn multiple_top_level_forms() {
        let forms = Parser::parse_all("1 2 3").unwrap();
        assert_eq!(forms.len(), 3);
    }

    #[test]
    fn unterminated_list_is_a_read_error() {
        let err = Parser::parse_all("(1 2").unwrap_err();
        assert!(err.is_read_error());
    }
}
