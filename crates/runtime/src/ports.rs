//! Port subsystem: a 6-operation vtable over four storage backings, plus
//! the three process-global default ports and their dynamic-extent
//! rebinding forms (`with-input-from-file` et al).
//!
//! The vtable is a trait here, not an enum-dispatch match in `wisp-core`'s
//! `Port`, because it needs to reach into this crate's process-wide
//! default-port cells -- state that `wisp-core` deliberately knows nothing
//! about.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

use wisp_core::{GrowableBuffer, Port, PortBacking, PortDirection, PortKind, SchemeError, Value};

/// One of the six primitive operations every port backing supports.
pub trait PortOps {
    fn get_one(&mut self) -> Result<Option<u8>, SchemeError>;
    fn put_one(&mut self, byte: u8) -> Result<(), SchemeError>;
    fn get_many(&mut self, max: usize) -> Result<Vec<u8>, SchemeError>;
    fn put_many(&mut self, bytes: &[u8]) -> Result<(), SchemeError>;
    fn peek(&mut self) -> Result<Option<u8>, SchemeError>;
    fn close(&mut self) -> Result<(), SchemeError>;
}

impl PortOps for Port {
    fn get_one(&mut self) -> Result<Option<u8>, SchemeError> {
        if !self.open {
            return Err(SchemeError::file_error("read from closed port"));
        }
        match &mut self.backing {
            PortBacking::File(f) => {
                let mut buf = [0u8; 1];
                match f.read(&mut buf) {
                    Ok(0) => Ok(None),
                    Ok(_) => {
                        self.cursor += 1;
                        Ok(Some(buf[0]))
                    }
                    Err(e) => Err(SchemeError::file_error(e.to_string())),
                }
            }
            PortBacking::Memory(buf) => {
                let bytes = buf.as_bytes();
                if self.cursor >= bytes.len() {
                    Ok(None)
                } else {
                    let b = bytes[self.cursor];
                    self.cursor += 1;
                    Ok(Some(b))
                }
            }
        }
    }

    fn put_one(&mut self, byte: u8) -> Result<(), SchemeError> {
        if !self.open {
            return Err(SchemeError::file_error("write to closed port"));
        }
        match &mut self.backing {
            PortBacking::File(f) => f.write_all(&[byte]).map_err(|e| SchemeError::file_error(e.to_string())),
            PortBacking::Memory(buf) => {
                buf.push_byte(byte);
                Ok(())
            }
        }
    }

    fn get_many(&mut self, max: usize) -> Result<Vec<u8>, SchemeError> {
        if !self.open {
            return Err(SchemeError::file_error("read from closed port"));
        }
        match &mut self.backing {
            PortBacking::File(f) => {
                let mut buf = vec![0u8; max];
                let n = f.read(&mut buf).map_err(|e| SchemeError::file_error(e.to_string()))?;
                buf.truncate(n);
                self.cursor += n;
                Ok(buf)
            }
            PortBacking::Memory(buf) => {
                let bytes = buf.as_bytes();
                let end = (self.cursor + max).min(bytes.len());
                let out = bytes[self.cursor..end].to_vec();
                self.cursor = end;
                Ok(out)
            }
        }
    }

    fn put_many(&mut self, bytes: &[u8]) -> Result<(), SchemeError> {
        if !self.open {
            return Err(SchemeError::file_error("write to closed port"));
        }
        match &mut self.backing {
            PortBacking::File(f) => f.write_all(bytes).map_err(|e| SchemeError::file_error(e.to_string())),
            PortBacking::Memory(buf) => {
                buf.push_bytes(bytes);
                Ok(())
            }
        }
    }

    fn peek(&mut self) -> Result<Option<u8>, SchemeError> {
        match self.get_one()? {
            None => Ok(None),
            Some(b) => {
                self.cursor -= 1;
                // A File backing has no cheap "unread a byte" primitive, so
                // peeking on a file port re-reads from a seek instead.
                if let PortBacking::File(f) = &mut self.backing {
                    use std::io::{Seek, SeekFrom};
                    let _ = f.seek(SeekFrom::Current(-1));
                }
                Ok(Some(b))
            }
        }
    }

    fn close(&mut self) -> Result<(), SchemeError> {
        self.open = false;
        if let PortBacking::File(f) = &mut self.backing {
            f.flush().map_err(|e| SchemeError::file_error(e.to_string()))?;
        }
        Ok(())
    }
}

thread_local! {
    // The literal console ports. Their identity never changes; `CURRENT_*`
    // below starts out pointing at them but can be swapped by dynamic-extent
    // rebinding (`with-output-to-file` et al), so code that needs to know
    // "is this actually the console" compares against these, not `current_*`.
    static STDOUT_PORT: Rc<RefCell<Port>> = make_stdout_port();
    static STDERR_PORT: Rc<RefCell<Port>> = make_stderr_port();

    static CURRENT_INPUT: RefCell<Rc<RefCell<Port>>> = RefCell::new(make_stdin_port());
    static CURRENT_OUTPUT: RefCell<Rc<RefCell<Port>>> = RefCell::new(STDOUT_PORT.with(Rc::clone));
    static CURRENT_ERROR: RefCell<Rc<RefCell<Port>>> = RefCell::new(STDERR_PORT.with(Rc::clone));
}

/// The real stdout console port, independent of whatever `with-output-to-*`
/// may currently have installed as the default output port.
pub fn stdout_port() -> Rc<RefCell<Port>> {
    STDOUT_PORT.with(Rc::clone)
}

/// The real stderr console port, independent of the current default.
pub fn stderr_port() -> Rc<RefCell<Port>> {
    STDERR_PORT.with(Rc::clone)
}

fn make_stdin_port() -> Rc<RefCell<Port>> {
    Rc::new(RefCell::new(Port {
        direction: PortDirection::Input,
        kind: PortKind::TextFile,
        path: None,
        backing: PortBacking::Memory(GrowableBuffer::new()),
        cursor: 0,
        open: true,
    }))
}

fn make_stdout_port() -> Rc<RefCell<Port>> {
    Rc::new(RefCell::new(Port {
        direction: PortDirection::Output,
        kind: PortKind::TextFile,
        path: None,
        backing: PortBacking::Memory(GrowableBuffer::new()),
        cursor: 0,
        open: true,
    }))
}

fn make_stderr_port() -> Rc<RefCell<Port>> {
    make_stdout_port()
}

/// `current-input-port` / `current-output-port` / `current-error-port`.
pub fn current_input_port() -> Rc<RefCell<Port>> {
    CURRENT_INPUT.with(|p| p.borrow().clone())
}

pub fn current_output_port() -> Rc<RefCell<Port>> {
    CURRENT_OUTPUT.with(|p| p.borrow().clone())
}

pub fn current_error_port() -> Rc<RefCell<Port>> {
    CURRENT_ERROR.with(|p| p.borrow().clone())
}

/// Read stdin's actual bytes into our "current input" memory port. The
/// default input port is a memory buffer (not a live fd wrapper) so that
/// `with-input-from-string`/dynamic rebinding can swap it without juggling
/// real file descriptors; this primes it once at startup and on EOF.
pub fn refill_stdin(port: &Rc<RefCell<Port>>) {
    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).unwrap_or(0) > 0 {
        port.borrow_mut().backing = PortBacking::Memory(GrowableBuffer::new());
        if let PortBacking::Memory(buf) = &mut port.borrow_mut().backing {
            buf.push_str(&input);
        }
        port.borrow_mut().cursor = 0;
    }
}

/// Flush a memory output port's contents straight to the real stdout/stderr.
pub fn flush_to_stdout(port: &Rc<RefCell<Port>>) {
    let mut p = port.borrow_mut();
    if let PortBacking::Memory(buf) = &p.backing {
        print!("{}", buf.as_str());
        use std::io::Write as _;
        let _ = std::io::stdout().flush();
    }
    p.backing = PortBacking::Memory(GrowableBuffer::new());
}

/// As `flush_to_stdout`, but for the default error port.
pub fn flush_to_stderr(port: &Rc<RefCell<Port>>) {
    let mut p = port.borrow_mut();
    if let PortBacking::Memory(buf) = &p.backing {
        eprint!("{}", buf.as_str());
        use std::io::Write as _;
        let _ = std::io::stderr().flush();
    }
    p.backing = PortBacking::Memory(GrowableBuffer::new());
}

fn open_file_port(path: &str, direction: PortDirection, binary: bool, truncate: bool) -> Result<Value, SchemeError> {
    use std::fs::OpenOptions;
    let file = match direction {
        PortDirection::Input => OpenOptions::new().read(true).open(path),
        PortDirection::Output => {
            let mut opts = OpenOptions::new();
            opts.write(true).create(true);
            if truncate {
                opts.truncate(true);
            } else {
                opts.append(true);
            }
            opts.open(path)
        }
    }
    .map_err(|e| SchemeError::file_error(format!("cannot open '{path}': {e}")))?;
    let kind = if binary { PortKind::BinaryFile } else { PortKind::TextFile };
    Ok(Value::Port(Rc::new(RefCell::new(Port {
        direction,
        kind,
        path: Some(path.to_string()),
        backing: PortBacking::File(file),
        cursor: 0,
        open: true,
    }))))
}

pub fn open_input_file(path: &str) -> Result<Value, SchemeError> {
    open_file_port(path, PortDirection::Input, false, false)
}

pub fn open_output_file(path: &str) -> Result<Value, SchemeError> {
    open_file_port(path, PortDirection::Output, false, false)
}

pub fn open_and_trunc_output_file(path: &str) -> Result<Value, SchemeError> {
    open_file_port(path, PortDirection::Output, false, true)
}

pub fn open_binary_input_file(path: &str) -> Result<Value, SchemeError> {
    open_file_port(path, PortDirection::Input, true, false)
}

pub fn open_binary_output_file(path: &str) -> Result<Value, SchemeError> {
    open_file_port(path, PortDirection::Output, true, false)
}

pub fn open_input_string(s: &str) -> Value {
    let mut buf = GrowableBuffer::new();
    buf.push_str(s);
    Value::Port(Rc::new(RefCell::new(Port {
        direction: PortDirection::Input,
        kind: PortKind::MemoryText,
        path: None,
        backing: PortBacking::Memory(buf),
        cursor: 0,
        open: true,
    })))
}

pub fn open_output_string() -> Value {
    Value::Port(Rc::new(RefCell::new(Port {
        direction: PortDirection::Output,
        kind: PortKind::MemoryText,
        path: None,
        backing: PortBacking::Memory(GrowableBuffer::new()),
        cursor: 0,
        open: true,
    })))
}

pub fn get_output_string(port: &Rc<RefCell<Port>>) -> String {
    match &port.borrow().backing {
        PortBacking::Memory(buf) => buf.as_str().to_string(),
        PortBacking::File(_) => String::new(),
    }
}

/// Rebind the current input port for the dynamic extent of `body`,
/// restoring the previous binding on every exit path (including errors),
/// mirroring `parameterize`'s stack discipline.
pub fn with_input_from_port<T>(port: Rc<RefCell<Port>>, body: impl FnOnce() -> T) -> T {
    let previous = CURRENT_INPUT.with(|p| p.replace(port));
    let result = body();
    CURRENT_INPUT.with(|p| *p.borrow_mut() = previous);
    result
}

pub fn with_output_to_port<T>(port: Rc<RefCell<Port>>, body: impl FnOnce() -> T) -> T {
    let previous = CURRENT_OUTPUT.with(|p| p.replace(port));
    let result = body();
    CURRENT_OUTPUT.with(|p| *p.borrow_mut() = previous);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_port_roundtrips_bytes() {
        let v = open_output_string();
        if let Value::Port(p) = &v {
            p.borrow_mut().put_many(b"hello").unwrap();
            assert_eq!(get_output_string(p), "hello");
        } else {
            panic!("expected port");
        }
    }

    #[test]
    fn input_string_port_reads_one_byte_at_a_time() {
        let v = open_input_string("ab");
        if let Value::Port(p) = &v {
            assert_eq!(p.borrow_mut().get_one().unwrap(), Some(b'a'));
            assert_eq!(p.borrow_mut().get_one().unwrap(), Some(b'b'));
            assert_eq!(p.borrow_mut().get_one().unwrap(), None);
        } else {
            panic!("expected port");
        }
    }

    #[test]
    fn peek_does_not_advance_cursor() {
        let v = open_input_string("z");
        if let Value::Port(p) = &v {
            assert_eq!(p.borrow_mut().peek().unwrap(), Some(b'z'));
            assert_eq!(p.borrow_mut().get_one().unwrap(), Some(b'z'));
        } else {
            panic!("expected port");
        }
    }

    #[test]
    fn with_output_to_port_restores_previous_binding() {
        let original = current_output_port();
        let temp_value = open_output_string();
        let temp = match &temp_value {
            Value::Port(p) => p.clone(),
            _ => unreachable!(),
        };
        with_output_to_port(temp.clone(), || {
            assert!(Rc::ptr_eq(&current_output_port(), &temp));
        });
        assert!(Rc::ptr_eq(&current_output_port(), &original));
    }
}
