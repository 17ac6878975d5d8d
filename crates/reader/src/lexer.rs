//! Tokenizer: source text -> a flat token stream.
//!
//! A hand-rolled char-by-char scan tracking line/column, one `Token` per
//! lexeme, rather than a parser-combinator or regex approach. Covers
//! Scheme's full delimiter set: `(` `)` `'` `` ` `` `,` `,@` `#(` `#u8(`,
//! string/char literals with escapes, and `;`/`#| |#`/`#;` comments.

use wisp_core::SchemeError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    VecOpen,     // #(
    ByteVecOpen, // #u8(
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    DatumComment, // #;
    Dot,
    Bool(bool),
    Char(char),
    Str(String),
    Atom(String),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

const DELIMS: &[char] = &['(', ')', '"', ';', '\'', '`', ','];

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { chars: source.chars().peekable(), line: 0, col: 0 }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_atmosphere(&mut self) -> Result<(), SchemeError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('#') => {
                    // Only a block comment opener (`#|`) is atmosphere; `#t`,
                    // `#(`, `#\`, etc. are real tokens and must fall through.
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'|') {
                        self.bump();
                        self.bump();
                        self.skip_block_comment()?;
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), SchemeError> {
        let mut depth = 1usize;
        loop {
            match self.bump() {
                None => return Err(SchemeError::read_error("unterminated block comment")),
                Some('#') if self.peek() == Some('|') => {
                    self.bump();
                    depth += 1;
                }
                Some('|') if self.peek() == Some('#') => {
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(_) => {}
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, SchemeError> {
        self.skip_atmosphere()?;
        let (line, col) = (self.line, self.col);
        let kind = match self.peek() {
            None => return Ok(None),
            Some('(') => {
                self.bump();
                TokenKind::LParen
            }
            Some(')') => {
                self.bump();
                TokenKind::RParen
            }
            Some('\'') => {
                self.bump();
                TokenKind::Quote
            }
            Some('`') => {
                self.bump();
                TokenKind::Quasiquote
            }
            Some(',') => {
                self.bump();
                if self.peek() == Some('@') {
                    self.bump();
                    TokenKind::UnquoteSplicing
                } else {
                    TokenKind::Unquote
                }
            }
            Some('"') => self.lex_string()?,
            Some('#') => self.lex_hash()?,
            _ => self.lex_atom_or_dot(),
        };
        Ok(Some(Token { kind, line, col }))
    }

    fn lex_string(&mut self) -> Result<TokenKind, SchemeError> {
        self.bump(); // opening quote
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(SchemeError::read_error("unterminated string literal")),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some('a') => s.push('\u{7}'),
                    // A backslash immediately before a newline is a
                    // line-continuation: the newline and following
                    // indentation are elided (R7RS string syntax).
                    Some('\n') => {
                        while matches!(self.peek(), Some(c) if c == ' ' || c == '\t') {
                            self.bump();
                        }
                    }
                    Some(other) => return Err(SchemeError::read_error(format!("unknown string escape '\\{other}'"))),
                    None => return Err(SchemeError::read_error("unterminated escape in string literal")),
                },
                Some(c) => s.push(c),
            }
        }
        Ok(TokenKind::Str(s))
    }

    fn lex_hash(&mut self) -> Result<TokenKind, SchemeError> {
        self.bump(); // '#'
        match self.peek() {
            Some('(') => {
                self.bump();
                Ok(TokenKind::VecOpen)
            }
            Some('\\') => {
                self.bump();
                self.lex_char()
            }
            Some(';') => {
                self.bump();
                Ok(TokenKind::DatumComment)
            }
            Some('u') => {
                let mut lookahead = self.chars.clone();
                if lookahead.next() == Some('u') && lookahead.next() == Some('8') && lookahead.next() == Some('(') {
                    self.bump();
                    self.bump();
                    self.bump();
                    Ok(TokenKind::ByteVecOpen)
                } else {
                    Ok(TokenKind::Atom(format!("#{}", self.lex_atom_text())))
                }
            }
            _ => Ok(TokenKind::Atom(format!("#{}", self.lex_atom_text()))),
        }
    }

    fn lex_char(&mut self) -> Result<TokenKind, SchemeError> {
        // The character after `#\` is always part of the literal even if
        // it's a delimiter (so `#\(` and `#\)` work).
        let first = self.bump().ok_or_else(|| SchemeError::read_error("unterminated character literal"))?;
        let mut name = String::new();
        name.push(first);
        if first.is_alphanumeric() {
            while let Some(c) = self.peek() {
                if c.is_alphanumeric() || c == '-' {
                    name.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        let ch = if name.chars().count() == 1 {
            name.chars().next().unwrap()
        } else {
            named_char(&name).ok_or_else(|| SchemeError::read_error(format!("unknown character name '#\\{name}'")))?
        };
        Ok(TokenKind::Char(ch))
    }

    fn lex_atom_text(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || DELIMS.contains(&c) {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }

    fn lex_atom_or_dot(&mut self) -> TokenKind {
        let text = self.lex_atom_text();
        if text == "." {
            TokenKind::Dot
        } else if text == "#t" || text == "#true" {
            TokenKind::Bool(true)
        } else if text == "#f" || text == "#false" {
            TokenKind::Bool(false)
        } else {
            TokenKind::Atom(text)
        }
    }
}

fn named_char(name: &str) -> Option<char> {
    Some(match name.to_ascii_lowercase().as_str() {
        "space" => ' ',
        "newline" | "linefeed" | "nl" => '\n',
        "tab" => '\t',
        "return" => '\r',
        "null" | "nul" => '\0',
        "alarm" => '\u{7}',
        "backspace" => '\u{8}',
        "delete" | "rubout" => '\u{7f}',
        "escape" | "altmode" => '\u{1b}',
        "page" => '\u{c}',
        _ => {
            if let Some(hex) = name.strip_prefix('x').or_else(|| name.strip_prefix('X')) {
                let code = u32::from_str_radix(hex, 16).ok()?;
                char::from_u32(code)?
            } else {
                return None;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next_token().unwrap() {
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn structural_tokens() {
        assert_eq!(
            tokens("( ) ' ` , ,@ #( #u8("),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Quote,
                TokenKind::Quasiquote,
                TokenKind::Unquote,
                TokenKind::UnquoteSplicing,
                TokenKind::VecOpen,
                TokenKind::ByteVecOpen,
            ]
        );
    }

    #[test]
    fn strings_with_escapes() {
        assert_eq!(tokens(r#""a\nb""#), vec![TokenKind::Str("a\nb".to_string())]);
    }

    #[test]
    fn character_literals() {
        assert_eq!(tokens(r"#\a #\space #\x41"), vec![TokenKind::Char('a'), TokenKind::Char(' '), TokenKind::Char('A')]);
    }

    #[test]
    fn booleans_and_dot() {
        assert_eq!(tokens("#t #f #true #false ."), vec![
            TokenKind::Bool(true),
            TokenKind::Bool(false),
            TokenKind::Bool(true),
            TokenKind::Bool(false),
            TokenKind::Dot,
        ]);
    }

    #[test]
    fn line_and_block_comments_are_skipped() {
        assert_eq!(tokens("1 ; a comment\n2 #| block |# 3"), vec![
            TokenKind::Atom("1".to_string()),
            TokenKind::Atom("2".to_string()),
            TokenKind::Atom("3".to_string()),
        ]);
    }

    #[test]
    fn nested_block_comments() {
        assert_eq!(tokens("1 #| outer #| inner |# still-comment |# 2"), vec![
            TokenKind::Atom("1".to_string()),
            TokenKind::Atom("2".to_string()),
        ]);
    }
}
