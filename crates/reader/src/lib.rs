//! wisp-reader: lexer and datum parser for the wisp Scheme interpreter.
//!
//! Turns source text into `wisp_core::Value` trees: `lexer` tokenizes,
//! `numbers` classifies and parses numeric literals (radix/exactness
//! prefixes through the full tower, including rectangular complex), `parser`
//! assembles tokens into data by recursive descent, and `continuation`
//! tracks paren/string balance across lines for the REPL's PS1/PS2 prompt.

pub mod continuation;
pub mod lexer;
pub mod numbers;
pub mod parser;

pub use continuation::{paren_delta, ContinuationState};
pub use lexer::{Lexer, Token, TokenKind};
pub use numbers::parse_number;
pub use parser::Parser;
