//! Port builtins: every primitive reader/writer procedure bound onto
//! `ports::PortOps`, plus the file/string port constructors and the
//! dynamic-extent `with-*` rebinding forms.

use std::cell::RefCell;
use std::rc::Rc;

use wisp_core::{Environment, Port, PortDirection, SchemeError, Value};

use super::{arity_exact, arity_range, def};
use crate::eval;
use crate::ports::{self, PortOps};
use crate::printer::{self, PrintMode};

pub(super) fn register(env: &Rc<Environment>) {
    def(env, "current-input-port", |_, a| {
        arity_exact(a, 0, "current-input-port")?;
        Ok(Value::Port(ports::current_input_port()))
    });
    def(env, "current-output-port", |_, a| {
        arity_exact(a, 0, "current-output-port")?;
        Ok(Value::Port(ports::current_output_port()))
    });
    def(env, "current-error-port", |_, a| {
        arity_exact(a, 0, "current-error-port")?;
        Ok(Value::Port(ports::current_error_port()))
    });

    def(env, "input-port?", |_, a| Ok(Value::Bool(port_direction(a.first(), PortDirection::Input))));
    def(env, "output-port?", |_, a| Ok(Value::Bool(port_direction(a.first(), PortDirection::Output))));
    def(env, "textual-port?", |_, a| {
        arity_exact(a, 1, "textual-port?")?;
        Ok(Value::Bool(matches!(a[0], Value::Port(_))))
    });
    def(env, "binary-port?", |_, a| {
        arity_exact(a, 1, "binary-port?")?;
        Ok(Value::Bool(matches!(a[0], Value::Port(_))))
    });

    def(env, "open-input-file", |_, a| {
        arity_exact(a, 1, "open-input-file")?;
        ports::open_input_file(&path_arg(&a[0], "open-input-file")?)
    });
    def(env, "open-output-file", |_, a| {
        arity_exact(a, 1, "open-output-file")?;
        ports::open_output_file(&path_arg(&a[0], "open-output-file")?)
    });
    def(env, "open-and-trunc-output-file", |_, a| {
        arity_exact(a, 1, "open-and-trunc-output-file")?;
        ports::open_and_trunc_output_file(&path_arg(&a[0], "open-and-trunc-output-file")?)
    });
    def(env, "open-binary-input-file", |_, a| {
        arity_exact(a, 1, "open-binary-input-file")?;
        ports::open_binary_input_file(&path_arg(&a[0], "open-binary-input-file")?)
    });
    def(env, "open-binary-output-file", |_, a| {
        arity_exact(a, 1, "open-binary-output-file")?;
        ports::open_binary_output_file(&path_arg(&a[0], "open-binary-output-file")?)
    });
    def(env, "open-input-string", |_, a| {
        arity_exact(a, 1, "open-input-string")?;
        Ok(ports::open_input_string(&string_arg(&a[0], "open-input-string")?))
    });
    def(env, "open-output-string", |_, a| {
        arity_exact(a, 0, "open-output-string")?;
        Ok(ports::open_output_string())
    });
    def(env, "get-output-string", |_, a| {
        arity_exact(a, 1, "get-output-string")?;
        Ok(Value::string(ports::get_output_string(&port_arg(&a[0], "get-output-string")?)))
    });

    def(env, "close-port", |_, a| close_port(a, "close-port"));
    def(env, "close-input-port", |_, a| close_port(a, "close-input-port"));
    def(env, "close-output-port", |_, a| close_port(a, "close-output-port"));

    def(env, "read-char", |_, a| read_char(a, false));
    def(env, "peek-char", |_, a| read_char(a, true));
    def(env, "read-line", b_read_line);
    def(env, "read-string", b_read_string);
    def(env, "read-u8", |_, a| read_u8(a, false));
    def(env, "peek-u8", |_, a| read_u8(a, true));
    def(env, "char-ready?", |_, a| {
        arity_range(a, 0, 1, "char-ready?")?;
        Ok(Value::Bool(true))
    });
    def(env, "u8-ready?", |_, a| {
        arity_range(a, 0, 1, "u8-ready?")?;
        Ok(Value::Bool(true))
    });
    def(env, "read", b_read);

    def(env, "write-char", b_write_char);
    def(env, "write-string", b_write_string);
    def(env, "write-u8", b_write_u8);
    def(env, "newline", |_, a| {
        arity_range(a, 0, 1, "newline")?;
        write_bytes(a.first(), b"\n")
    });
    def(env, "display", |_, a| print_value(a, "display", PrintMode::Display));
    def(env, "write", |_, a| print_value(a, "write", PrintMode::Write));

    def(env, "flush-output", |_, a| {
        arity_range(a, 0, 1, "flush-output")?;
        let p = match a.first() {
            Some(v) => port_arg(v, "flush-output")?,
            None => ports::current_output_port(),
        };
        flush_if_default(&p);
        Ok(Value::Unspecified)
    });

    def(env, "with-output-to-string", b_with_output_to_string);
    def(env, "with-input-from-string", b_with_input_from_string);
    def(env, "with-input-from-file", b_with_input_from_file);
    def(env, "with-output-to-file", b_with_output_to_file);

    def(env, "call-with-input-file", b_call_with_input_file);
    def(env, "call-with-output-file", b_call_with_output_file);
    def(env, "call-with-port", b_call_with_port);
}

/// `(call-with-input-file path proc)`: open `path`, call `proc` with the
/// port, close it on every exit path (normal return or error). Unlike
/// `with-input-from-file`, `proc` receives the port directly rather than
/// reading from the rebound default.
fn b_call_with_input_file(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "call-with-input-file")?;
    let path = path_arg(&args[0], "call-with-input-file")?;
    let proc = proc_arg(&args[1], "call-with-input-file")?;
    let port_val = ports::open_input_file(&path)?;
    let port = match &port_val {
        Value::Port(p) => p.clone(),
        _ => unreachable!(),
    };
    let result = eval::apply(&proc, vec![port_val]);
    let _ = port.borrow_mut().close();
    result
}

fn b_call_with_output_file(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "call-with-output-file")?;
    let path = path_arg(&args[0], "call-with-output-file")?;
    let proc = proc_arg(&args[1], "call-with-output-file")?;
    let port_val = ports::open_output_file(&path)?;
    let port = match &port_val {
        Value::Port(p) => p.clone(),
        _ => unreachable!(),
    };
    let result = eval::apply(&proc, vec![port_val]);
    let _ = port.borrow_mut().close();
    result
}

/// `(call-with-port port proc)`: call `proc` with `port`, closing it on
/// every exit path regardless of how `port` was opened.
fn b_call_with_port(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "call-with-port")?;
    let port = port_arg(&args[0], "call-with-port")?;
    let proc = proc_arg(&args[1], "call-with-port")?;
    let result = eval::apply(&proc, vec![args[0].clone()]);
    let _ = port.borrow_mut().close();
    result
}

fn proc_arg(v: &Value, who: &str) -> Result<Value, SchemeError> {
    match v {
        Value::Procedure(_) => Ok(v.clone()),
        other => Err(SchemeError::type_error(format!("{who}: expected a procedure, got {}", other.type_name()))),
    }
}

fn b_with_output_to_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 1, "with-output-to-string")?;
    let thunk = proc_arg(&args[0], "with-output-to-string")?;
    let port_val = ports::open_output_string();
    let port = match &port_val {
        Value::Port(p) => p.clone(),
        _ => unreachable!(),
    };
    let result = ports::with_output_to_port(port.clone(), || eval::apply(&thunk, Vec::new()));
    result?;
    Ok(Value::string(ports::get_output_string(&port)))
}

/// Rebinds the current input port to a fresh string port for the dynamic
/// extent of `thunk`. No file is opened, so there's nothing to close on
/// the way out; the rebind itself is what `with_input_from_port` undoes.
fn b_with_input_from_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "with-input-from-string")?;
    let s = string_arg(&args[0], "with-input-from-string")?;
    let thunk = proc_arg(&args[1], "with-input-from-string")?;
    let port_val = ports::open_input_string(&s);
    let port = match &port_val {
        Value::Port(p) => p.clone(),
        _ => unreachable!(),
    };
    ports::with_input_from_port(port, || eval::apply(&thunk, Vec::new()))
}

/// Rebinds the current input port to a freshly opened file for the dynamic
/// extent of `thunk`; the temporary port is closed on every exit path,
/// including an error propagating out of the thunk.
fn b_with_input_from_file(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "with-input-from-file")?;
    let path = path_arg(&args[0], "with-input-from-file")?;
    let thunk = proc_arg(&args[1], "with-input-from-file")?;
    let port_val = ports::open_input_file(&path)?;
    let port = match &port_val {
        Value::Port(p) => p.clone(),
        _ => unreachable!(),
    };
    let result = ports::with_input_from_port(port.clone(), || eval::apply(&thunk, Vec::new()));
    let _ = port.borrow_mut().close();
    result
}

fn b_with_output_to_file(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_exact(args, 2, "with-output-to-file")?;
    let path = path_arg(&args[0], "with-output-to-file")?;
    let thunk = proc_arg(&args[1], "with-output-to-file")?;
    let port_val = ports::open_output_file(&path)?;
    let port = match &port_val {
        Value::Port(p) => p.clone(),
        _ => unreachable!(),
    };
    let result = ports::with_output_to_port(port.clone(), || eval::apply(&thunk, Vec::new()));
    let _ = port.borrow_mut().close();
    result
}

fn port_direction(v: Option<&Value>, want: PortDirection) -> bool {
    matches!(v, Some(Value::Port(p)) if p.borrow().direction == want)
}

fn port_arg(v: &Value, who: &str) -> Result<Rc<RefCell<Port>>, SchemeError> {
    match v {
        Value::Port(p) => Ok(p.clone()),
        other => Err(SchemeError::type_error(format!("{who}: expected a port, got {}", other.type_name()))),
    }
}

fn path_arg(v: &Value, who: &str) -> Result<String, SchemeError> {
    string_arg(v, who)
}

fn string_arg(v: &Value, who: &str) -> Result<String, SchemeError> {
    match v {
        Value::String(s) => Ok(s.as_str().to_string()),
        other => Err(SchemeError::type_error(format!("{who}: expected a string, got {}", other.type_name()))),
    }
}

fn close_port(args: &[Value], who: &str) -> Result<Value, SchemeError> {
    arity_exact(args, 1, who)?;
    let p = port_arg(&args[0], who)?;
    p.borrow_mut().close()?;
    Ok(Value::Unspecified)
}

fn read_char(args: &[Value], peek: bool) -> Result<Value, SchemeError> {
    arity_range(args, 0, 1, if peek { "peek-char" } else { "read-char" })?;
    let p = resolve_input(args)?;
    let byte = if peek { p.borrow_mut().peek()? } else { p.borrow_mut().get_one()? };
    match byte {
        None => Ok(Value::Eof),
        // Ports store raw bytes; this interpreter treats a port's textual
        // contents as already-valid single-byte-per-char UTF-8 fast path
        // and falls back to re-decoding a short run for multi-byte chars.
        Some(b) if b < 0x80 => Ok(Value::Char(b as char)),
        Some(first) => decode_multibyte_char(&p, first, peek),
    }
}

fn decode_multibyte_char(p: &Rc<RefCell<Port>>, first: u8, peek: bool) -> Result<Value, SchemeError> {
    let extra = if first >= 0xf0 {
        3
    } else if first >= 0xe0 {
        2
    } else {
        1
    };
    let mut bytes = vec![first];
    for _ in 0..extra {
        match p.borrow_mut().get_one()? {
            Some(b) => bytes.push(b),
            None => break,
        }
    }
    let decoded = std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.chars().next())
        .ok_or_else(|| SchemeError::read_error("invalid UTF-8 in port"))?;
    if peek {
        // Peeking a multibyte char already consumed the continuation bytes
        // above; restore them the same way `Port::peek` restores a single
        // byte -- cursor rewind for memory ports, a seek-back for files.
        let mut port = p.borrow_mut();
        match &mut port.backing {
            wisp_core::PortBacking::Memory(_) => {
                port.cursor -= bytes.len() - 1;
            }
            wisp_core::PortBacking::File(f) => {
                use std::io::{Seek, SeekFrom};
                let _ = f.seek(SeekFrom::Current(-((bytes.len() - 1) as i64)));
            }
        }
    }
    Ok(Value::Char(decoded))
}

fn b_read_line(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 0, 1, "read-line")?;
    let p = resolve_input(args)?;
    let mut out = Vec::new();
    loop {
        match p.borrow_mut().get_one()? {
            None if out.is_empty() => return Ok(Value::Eof),
            None => break,
            Some(b'\n') => break,
            Some(b) => out.push(b),
        }
    }
    String::from_utf8(out).map(Value::string).map_err(|_| SchemeError::read_error("read-line: invalid UTF-8"))
}

fn b_read_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "read-string")?;
    let k = match &args[0] {
        Value::Integer(n) if *n >= 0 => *n as usize,
        _ => return Err(SchemeError::type_error("read-string: expected a non-negative exact integer")),
    };
    let p = match args.get(1) {
        Some(v) => port_arg(v, "read-string")?,
        None => ports::current_input_port(),
    };
    let bytes = p.borrow_mut().get_many(k)?;
    if bytes.is_empty() && k > 0 {
        return Ok(Value::Eof);
    }
    String::from_utf8(bytes).map(Value::string).map_err(|_| SchemeError::read_error("read-string: invalid UTF-8"))
}

fn read_u8(args: &[Value], peek: bool) -> Result<Value, SchemeError> {
    arity_range(args, 0, 1, if peek { "peek-u8" } else { "read-u8" })?;
    let p = resolve_input(args)?;
    let byte = if peek { p.borrow_mut().peek()? } else { p.borrow_mut().get_one()? };
    Ok(byte.map(|b| Value::Integer(b as i64)).unwrap_or(Value::Eof))
}

fn b_read(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 0, 1, "read")?;
    let p = resolve_input(args)?;
    let mut bytes = Vec::new();
    loop {
        match p.borrow_mut().get_one()? {
            Some(b) => bytes.push(b),
            None => break,
        }
    }
    let text = String::from_utf8(bytes).map_err(|_| SchemeError::read_error("read: invalid UTF-8"))?;
    match wisp_reader::Parser::parse_one(&text)? {
        Some(datum) => Ok(datum),
        None => Ok(Value::Eof),
    }
}

fn resolve_input(args: &[Value]) -> Result<Rc<RefCell<Port>>, SchemeError> {
    match args.first() {
        Some(v) => port_arg(v, "read"),
        None => Ok(ports::current_input_port()),
    }
}

fn resolve_output(v: Option<&Value>) -> Result<Rc<RefCell<Port>>, SchemeError> {
    match v {
        Some(v) => port_arg(v, "write"),
        None => Ok(ports::current_output_port()),
    }
}

fn write_bytes(port: Option<&Value>, bytes: &[u8]) -> Result<Value, SchemeError> {
    let p = resolve_output(port)?;
    p.borrow_mut().put_many(bytes)?;
    flush_if_default(&p);
    Ok(Value::Unspecified)
}

/// The console ports are memory-backed so dynamic rebinding can swap them
/// cleanly; writes straight to the console (not a rebound file/string port)
/// need an immediate flush to behave like real, unbuffered output. Compares
/// against the stable console identities, not `current_output_port`, since
/// a `with-output-to-file` rebind would otherwise make this wipe the file
/// port's backing instead of leaving it alone.
fn flush_if_default(p: &Rc<RefCell<Port>>) {
    if Rc::ptr_eq(p, &ports::stdout_port()) {
        ports::flush_to_stdout(p);
    } else if Rc::ptr_eq(p, &ports::stderr_port()) {
        ports::flush_to_stderr(p);
    }
}

fn b_write_char(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "write-char")?;
    let c = match &args[0] {
        Value::Char(c) => *c,
        other => return Err(SchemeError::type_error(format!("write-char: expected a char, got {}", other.type_name()))),
    };
    let mut buf = [0u8; 4];
    write_bytes(args.get(1), c.encode_utf8(&mut buf).as_bytes())
}

fn b_write_string(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 4, "write-string")?;
    let s = string_arg(&args[0], "write-string")?;
    write_bytes(args.get(1), s.as_bytes())
}

fn b_write_u8(_env: &Rc<Environment>, args: &[Value]) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, "write-u8")?;
    let byte = match &args[0] {
        Value::Integer(n) if (0..=255).contains(n) => *n as u8,
        other => return Err(SchemeError::type_error(format!("write-u8: expected a byte, got {}", other.type_name()))),
    };
    write_bytes(args.get(1), &[byte])
}

fn print_value(args: &[Value], who: &str, mode: PrintMode) -> Result<Value, SchemeError> {
    arity_range(args, 1, 2, who)?;
    let text = printer::print_to_string(&args[0], mode);
    write_bytes(args.get(1), text.as_bytes())
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
    fn string_port_write_and_read_back() {
        assert!(matches!(
            run("(let ((p (open-output-string))) (write-string \"hi\" p) (string=? (get-output-string p) \"hi\"))"),
            Value::Bool(true)
        ));
    }

    #[test]
    fn read_char_from_input_string() {
        assert!(matches!(run("(read-char (open-input-string \"x\"))"), Value::Char('x')));
    }

    #[test]
    fn read_line_collects_up_to_newline() {
        assert!(matches!(
            run("(string=? (read-line (open-input-string \"abc\\ndef\")) \"abc\")"),
            Value::Bool(true)
        ));
    }

    #[test]
    fn eof_object_detection() {
        assert!(matches!(run("(eof-object? (read-char (open-input-string \"\")))"), Value::Bool(true)));
    }

    #[test]
    fn peek_char_on_a_file_port_is_non_destructive_for_multibyte_chars() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("é!".as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let src = format!(
            "(let ((p (open-input-file \"{path}\")))
               (let ((a (peek-char p)))
                 (let ((b (read-char p)))
                   (and (eqv? a b) (eqv? (read-char p) #\\!)))))"
        );
        assert!(matches!(run(&src), Value::Bool(true)));
    }

    #[test]
    fn closing_a_port_rejects_further_reads() {
        let env = global_environment();
        let form = Parser::parse_all("(let ((p (open-input-string \"a\"))) (close-port p) (read-char p))").unwrap().remove(0);
        assert!(crate::eval::eval(&form, &env).is_err());
    }

    #[test]
    fn with_input_from_string_rebinds_for_the_dynamic_extent() {
        assert!(matches!(run("(with-input-from-string \"hi\" (lambda () (read-char)))"), Value::Char('h')));
        let env = global_environment();
        let before = Parser::parse_all("(current-input-port)").unwrap().remove(0);
        let before = crate::eval::eval(&before, &env).unwrap();
        let form = Parser::parse_all("(with-input-from-string \"z\" (lambda () (read-char)))").unwrap().remove(0);
        crate::eval::eval(&form, &env).unwrap();
        let after = Parser::parse_all("(current-input-port)").unwrap().remove(0);
        let after = crate::eval::eval(&after, &env).unwrap();
        assert!(wisp_core::is_eq(&before, &after));
    }

    #[test]
    fn call_with_port_closes_after_use() {
        let env = global_environment();
        let form = Parser::parse_all(
            "(let ((p (open-input-string \"ab\"))) (call-with-port p (lambda (port) (read-char port))) (read-char p))",
        )
        .unwrap()
        .remove(0);
        assert!(crate::eval::eval(&form, &env).is_err());
    }
}
