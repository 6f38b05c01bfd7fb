//! Interactive read-eval-print loop.

use std::fmt::Write as _;
use std::io::{self, Write};

use rustyline::{DefaultEditor, error::ReadlineError};
use thiserror::Error;

use crate::{Interpreter, Value};

const PROMPT: &str = "quipu> ";

/// Failures of the loop itself, as opposed to errors in the program it runs
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("line editor error: {0}")]
    Readline(#[from] ReadlineError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub struct Repl {
    interpreter: Interpreter,
}

impl Repl {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// Continue from an interpreter that may already have libraries loaded
    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    /// Evaluate one line and render what the prompt should echo back
    pub fn eval_line(&mut self, line: &str) -> String {
        match self.interpreter.eval_source("<stdin>", line) {
            Ok(value) => value.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Bindings of the root environment, builtins listed apart from user values
    pub fn env_listing(&self) -> String {
        let bindings = self.interpreter.environment().all_bindings();
        if bindings.is_empty() {
            return "Environment is empty.\n".to_owned();
        }

        let (builtins, user_defined): (Vec<_>, Vec<_>) = bindings
            .into_iter()
            .partition(|(_, value)| matches!(value, Value::Builtin { .. }));

        let mut out = String::new();
        if !builtins.is_empty() {
            let _ = writeln!(out, "Built-in functions ({}):", builtins.len());
            // Print in columns for readability
            for row in builtins.chunks(6) {
                let line: String = row.iter().map(|(name, _)| format!("  {name:<8}")).collect();
                let _ = writeln!(out, "{}", line.trim_end());
            }
        }
        if !user_defined.is_empty() {
            let _ = writeln!(out, "User-defined values ({}):", user_defined.len());
            for (name, value) in user_defined {
                let _ = writeln!(out, "  {name} = {value}");
            }
        }
        out
    }

    /// Run until `:quit`, Ctrl-C or end of input
    pub fn run(&mut self, banner: bool) -> Result<(), ReplError> {
        let mut editor = DefaultEditor::new()?;
        let mut stdout = io::stdout();

        if banner {
            writeln!(stdout, "Quipu {}", env!("CARGO_PKG_VERSION"))?;
            writeln!(stdout, "Type :help for commands, Ctrl+C to exit.")?;
            writeln!(stdout)?;
        }

        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(line)?;

                    match line {
                        ":help" => write!(stdout, "{}", help_text())?,
                        ":env" => write!(stdout, "{}", self.env_listing())?,
                        ":quit" | ":exit" => break,
                        _ => writeln!(stdout, "{}", self.eval_line(line))?,
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

fn help_text() -> &'static str {
    "\
Commands:
  :help      Show this help message
  :env       Show current environment bindings
  :quit      Exit the interpreter (also :exit, Ctrl+C, Ctrl+D)

Examples:
  + 1 2 3
  def {xs} {1 2 3}
  head xs
  def {add} (\\ {x y} {+ x y})
  (add 1) 2
  load \"lib.qp\"
"
}
