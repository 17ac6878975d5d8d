//! wisp-runtime: the evaluator, builtin registry, and port subsystem for
//! the wisp Scheme interpreter.
//!
//! - `eval`: AST-walking evaluator with trampolined tail calls
//! - `builtins`: the primitive-procedure registry bound into the initial
//!   global environment
//! - `ports`: the port operation vtable and the three default-port
//!   singletons
//! - `printer`: `display`/`write`/`repl` textual rendering
//! - `signal`: the SIGINT cancellation flag the REPL polls at line
//!   boundaries

pub mod builtins;
pub mod eval;
pub mod ports;
pub mod printer;
pub mod signal;

pub use builtins::global_environment;
pub use eval::{apply, eval, force};
pub use printer::{print_to_string, PrintMode};
