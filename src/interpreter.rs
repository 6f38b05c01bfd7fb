//! The interpreter context: a root environment with every builtin bound,
//! plus the host through which `load` reads files and `print` writes text.

use std::fs;
use std::io::{self, Write};
use std::rc::Rc;

use tracing::debug;

use crate::ast::Value;
use crate::builtinops::{load_source, register_builtins, register_host_builtins};
use crate::evaluator::{eval, Environment};
use crate::{grammar, reader, ParseError};

/// The outside world as seen by the language
pub trait Host {
    /// Contents of the source file at `path`
    fn read_source(&self, path: &str) -> io::Result<String>;

    /// Emit text produced by the program
    fn write_str(&self, text: &str);
}

/// Host backed by the filesystem and standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdHost;

impl Host for StdHost {
    fn read_source(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_str(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        // Program output has nowhere to report its own failure
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

pub struct Interpreter {
    env: Environment,
    host: Rc<dyn Host>,
}

impl Interpreter {
    /// Interpreter talking to the real filesystem and stdout
    pub fn new() -> Self {
        Self::with_host(StdHost)
    }

    pub fn with_host(host: impl Host + 'static) -> Self {
        Self::with_shared_host(Rc::new(host))
    }

    /// Interpreter over a host the caller keeps a handle to
    pub fn with_shared_host(host: Rc<dyn Host>) -> Self {
        let mut env = Environment::new();
        register_builtins(&mut env);
        register_host_builtins(&mut env, Rc::clone(&host));
        Interpreter { env, host }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn into_environment(self) -> Environment {
        self.env
    }

    /// Parse and read `source` without evaluating it.
    /// The result is an s-expression holding every top-level form.
    pub fn parse(&self, origin: &str, source: &str) -> Result<Value, ParseError> {
        let tree = grammar::parse_program(origin, source)?;
        Ok(reader::read(&tree))
    }

    /// Evaluate `source` as one s-expression made of all its top-level forms,
    /// the way a line typed at the prompt is treated.
    ///
    /// Evaluation failures come back as `Ok(Value::Error(..))`; only text
    /// that does not parse is an `Err`.
    pub fn eval_source(&mut self, origin: &str, source: &str) -> Result<Value, ParseError> {
        let program = self
            .parse(origin, source)
            .inspect_err(|e| debug!(origin, error = %e, "source failed to parse"))?;
        Ok(eval(&mut self.env, program))
    }

    /// Evaluate every top-level form of the file at `path`, printing the
    /// errors of individual forms. Returns `()` or the error that stopped
    /// the file from being loaded at all.
    pub fn load_file(&mut self, path: &str) -> Value {
        load_source(&mut self.env, self.host.as_ref(), path).into()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::ast::{qexpr, val};
    use crate::{Error, ParseErrorKind};

    /// In-memory host recording everything the program prints
    #[derive(Default)]
    struct BufferHost {
        files: HashMap<String, String>,
        output: RefCell<String>,
    }

    impl BufferHost {
        fn with_file(mut self, path: &str, contents: &str) -> Self {
            self.files.insert(path.to_owned(), contents.to_owned());
            self
        }
    }

    impl Host for BufferHost {
        fn read_source(&self, path: &str) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }

        fn write_str(&self, text: &str) {
            self.output.borrow_mut().push_str(text);
        }
    }

    fn interpreter(host: BufferHost) -> (Interpreter, Rc<BufferHost>) {
        let host = Rc::new(host);
        let interp = Interpreter::with_shared_host(host.clone());
        (interp, host)
    }

    #[test]
    fn test_eval_source_results() {
        let (mut interp, _) = interpreter(BufferHost::default());

        let test_cases = vec![
            ("+ 1 2", val(3)),
            ("(+ 1 2)", val(3)),
            ("", Value::unit()),
            ("{1 2}", qexpr([1, 2])),
            ("(def {x} 5) x", val(Error::NotCallable("S-Expression"))),
            ("x", val(5)),
            ("(error \"boom\")", val(Error::UserError("boom".into()))),
        ];

        for (source, expected) in test_cases {
            assert_eq!(
                interp.eval_source("<test>", source).unwrap(),
                expected,
                "evaluating {source:?}"
            );
        }
    }

    #[test]
    fn test_eval_source_parse_error() {
        let mut interp = Interpreter::with_host(BufferHost::default());
        let err = interp.eval_source("<stdin>", "(+ 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Incomplete);
    }

    #[test]
    fn test_print_goes_through_host() {
        let (mut interp, host) = interpreter(BufferHost::default());

        interp
            .eval_source("<test>", "print \"a\\tb\" 1 {x True}")
            .unwrap();
        // A lone function is returned, not called
        assert!(matches!(
            interp.eval_source("<test>", "print").unwrap(),
            Value::Builtin { .. }
        ));
        interp.eval_source("<test>", "(print (== 1 1))").unwrap();

        assert_eq!(
            host.output.borrow().as_str(),
            "\"a\\tb\" 1 {x True}\nTrue\n"
        );
    }

    #[test]
    fn test_load_evaluates_forms_and_reports_errors() {
        let library = "\
            (def {double} (\\ {x} {* 2 x}))\n\
            (head {})\n\
            (def {y} (double 21))\n";
        let (mut interp, host) = interpreter(BufferHost::default().with_file("lib.qp", library));

        assert_eq!(interp.load_file("lib.qp"), Value::unit());
        assert_eq!(interp.environment().get("y"), Ok(val(42)));
        assert_eq!(host.output.borrow().as_str(), "Error: 'head' passed {}\n");
    }

    #[test]
    fn test_load_failures() {
        let (mut interp, _) =
            interpreter(BufferHost::default().with_file("broken.qp", "(def {x} 1"));

        match interp.load_file("missing.qp") {
            Value::Error(Error::ParseFailure(msg)) => {
                assert!(msg.starts_with("Could not load library missing.qp"), "{msg}");
            }
            other => panic!("expected parse failure, got {other:?}"),
        }

        match interp.eval_source("<test>", "load \"broken.qp\"").unwrap() {
            Value::Error(Error::ParseFailure(msg)) => {
                assert_eq!(
                    msg,
                    "Could not load library broken.qp:1:11: error: unexpected end of input"
                );
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
        assert!(interp.environment().get("x").is_err());
    }

    #[test]
    fn test_nested_load_binds_globally() {
        let host = BufferHost::default()
            .with_file("outer.qp", "(load \"inner.qp\")\n(def {b} (+ a 1))")
            .with_file("inner.qp", "(def {a} 1)");
        let (mut interp, host) = interpreter(host);

        assert_eq!(interp.load_file("outer.qp"), Value::unit());
        assert_eq!(interp.environment().get("b"), Ok(val(2)));
        assert!(host.output.borrow().is_empty());
    }
}
