//! First-class error values.
//!
//! Scheme errors are ordinary values: the evaluator never unwinds, it simply
//! returns an `Error` the way it would return any other result. Builtins
//! construct one of these and hand it back through the normal return path;
//! `read-error?` and `file-error?` inspect the category tag.

use std::fmt;

/// Error category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Catch-all for assertion-style failures with no better tag.
    Generic,
    /// Argument had the wrong variant.
    Type,
    /// Correct variant, disallowed value (domain error).
    Value,
    /// Wrong number of arguments.
    Arity,
    /// Out-of-bounds access on a vector/string/bytevector.
    Index,
    /// File open/close/flush failure.
    File,
    /// Malformed input at read time.
    Read,
    /// Malformed special-form usage.
    Syntax,
    /// Other OS-level errors.
    Os,
}

impl ErrorCategory {
    pub fn tag(self) -> &'static str {
        match self {
            ErrorCategory::Generic => "GEN_ERR",
            ErrorCategory::Type => "TYPE_ERR",
            ErrorCategory::Value => "VALUE_ERR",
            ErrorCategory::Arity => "ARITY_ERR",
            ErrorCategory::Index => "INDEX_ERR",
            ErrorCategory::File => "FILE_ERR",
            ErrorCategory::Read => "READ_ERR",
            ErrorCategory::Syntax => "SYNTAX_ERR",
            ErrorCategory::Os => "OS_ERR",
        }
    }
}

/// A first-class Scheme error: a category plus a human-readable message.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeError {
    pub category: ErrorCategory,
    pub message: String,
}

impl SchemeError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        SchemeError {
            category,
            message: message.into(),
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Generic, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Type, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Value, message)
    }

    pub fn arity_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Arity, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Index, message)
    }

    pub fn file_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::File, message)
    }

    pub fn read_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Read, message)
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Syntax, message)
    }

    pub fn name_error(message: impl Into<String>) -> Self {
        // Unbound-variable lookups are a domain error over the environment,
        // not a type mismatch; the source treats them as generic failures.
        Self::new(ErrorCategory::Generic, message)
    }

    pub fn is_read_error(&self) -> bool {
        self.category == ErrorCategory::Read
    }

    pub fn is_file_error(&self) -> bool {
        self.category == ErrorCategory::File
    }
}

impl fmt::Display for SchemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category.tag(), self.message)
    }
}

impl std::error::Error for SchemeError {}
