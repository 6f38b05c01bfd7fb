//! Built-in operations registered into the root environment.
//!
//! ```text
//! (list 1 2 3)            ; {1 2 3}
//! (head {1 2 3})          ; {1}
//! (eval {+ 1 2})          ; 3
//! (if (> 2 1) {1} {0})    ; 1
//! (def {xs} {1 2 3})      ; ()
//! ```
//!
//! ## Error Handling
//!
//! Builtins are strict:
//!
//! - **Arity**: every operation declares an [`Arity`] which is checked before
//!   it runs
//! - **Type Safety**: operations reject incorrect types (e.g. `(! 1)` errors,
//!   only `bool` turns a number into a boolean)
//! - **Overflow Detection**: arithmetic reports overflow instead of wrapping
//!
//! Failures are returned as [`Error`] and surface to the program as error
//! values.
//!
//! ## Adding New Operations
//!
//! 1. Implement a function with the [`BuiltinFn`] signature
//! 2. Add it to `BUILTIN_OPS` with its name and arity
//! 3. Add tests covering the happy path and each rejection
//!
//! Operations that need the host (`load`, `print`) are registered separately
//! by [`register_host_builtins`] because they close over it.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::ast::{NumberType, Value};
use crate::evaluator::{eval, Environment};
use crate::interpreter::Host;
use crate::{grammar, reader, Error};

/// Argument count accepted by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    /// Check an argument count on behalf of `func`
    pub fn validate(self, func: &'static str, got: usize) -> Result<(), Error> {
        let ok = match self {
            Arity::Exact(n) => got == n,
            Arity::AtLeast(n) => got >= n,
            Arity::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::ArityMismatch {
                func,
                expected: self,
                got,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Signature shared by all table-driven builtins
pub type BuiltinFn = fn(&mut Environment, Vec<Value>) -> Result<Value, Error>;

/// Definition of a built-in operation
#[derive(Clone, Copy)]
pub struct BuiltinOp {
    pub name: &'static str,
    pub arity: Arity,
    pub func: BuiltinFn,
}

//
// Argument helpers
//

fn type_mismatch(func: &'static str, index: usize, expected: &'static str, got: &Value) -> Error {
    Error::TypeMismatch {
        func,
        index,
        expected,
        got: got.type_name(),
    }
}

/// Destructure a fixed-size argument list
fn fixed<const N: usize>(func: &'static str, args: Vec<Value>) -> Result<[Value; N], Error> {
    let got = args.len();
    args.try_into().map_err(|_| Error::ArityMismatch {
        func,
        expected: Arity::Exact(N),
        got,
    })
}

fn take_qexpr(func: &'static str, index: usize, value: Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::Qexpr(cells) => Ok(cells),
        other => Err(type_mismatch(func, index, "Q-Expression", &other)),
    }
}

fn take_string(func: &'static str, index: usize, value: Value) -> Result<String, Error> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(type_mismatch(func, index, "String", &other)),
    }
}

fn as_number(func: &'static str, index: usize, value: &Value) -> Result<NumberType, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(type_mismatch(func, index, "Number", other)),
    }
}

fn as_bool(func: &'static str, index: usize, value: &Value) -> Result<bool, Error> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(type_mismatch(func, index, "Bool", other)),
    }
}

/// Names from a q-expression that must contain only symbols
fn symbol_names(func: &'static str, cells: Vec<Value>) -> Result<Vec<String>, Error> {
    cells
        .into_iter()
        .enumerate()
        .map(|(index, cell)| match cell {
            Value::Symbol(name) => Ok(name),
            other => Err(type_mismatch(func, index, "Symbol", &other)),
        })
        .collect()
}

//
// List operations
//

fn builtin_list(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::Qexpr(args))
}

fn builtin_head(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [list] = fixed("head", args)?;
    let mut cells = take_qexpr("head", 0, list)?;
    if cells.is_empty() {
        return Err(Error::EmptyListAccess("head"));
    }
    cells.truncate(1);
    Ok(Value::Qexpr(cells))
}

fn builtin_tail(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [list] = fixed("tail", args)?;
    let mut cells = take_qexpr("tail", 0, list)?;
    if cells.is_empty() {
        return Err(Error::EmptyListAccess("tail"));
    }
    cells.remove(0);
    Ok(Value::Qexpr(cells))
}

fn builtin_init(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [list] = fixed("init", args)?;
    let mut cells = take_qexpr("init", 0, list)?;
    if cells.pop().is_none() {
        return Err(Error::EmptyListAccess("init"));
    }
    Ok(Value::Qexpr(cells))
}

fn builtin_eval(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [list] = fixed("eval", args)?;
    let cells = take_qexpr("eval", 0, list)?;
    Ok(eval(env, Value::Sexpr(cells)))
}

fn builtin_join(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let mut joined = Vec::new();
    for (index, arg) in args.into_iter().enumerate() {
        joined.extend(take_qexpr("join", index, arg)?);
    }
    Ok(Value::Qexpr(joined))
}

fn builtin_len(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [list] = fixed("len", args)?;
    let cells = take_qexpr("len", 0, list)?;
    NumberType::try_from(cells.len())
        .map(Value::Number)
        .map_err(|_| Error::IntegerOverflow("len"))
}

//
// Arithmetic
//

/// Type-check every argument, then left-fold with `op`
fn fold_numbers(
    func: &'static str,
    args: &[Value],
    op: impl Fn(NumberType, NumberType) -> Result<NumberType, Error>,
) -> Result<Value, Error> {
    let numbers = args
        .iter()
        .enumerate()
        .map(|(index, arg)| as_number(func, index, arg))
        .collect::<Result<Vec<_>, _>>()?;

    let (first, rest) = numbers.split_first().ok_or(Error::ArityMismatch {
        func,
        expected: Arity::AtLeast(1),
        got: 0,
    })?;
    rest.iter()
        .try_fold(*first, |acc, &n| op(acc, n))
        .map(Value::Number)
}

fn builtin_add(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    fold_numbers("+", &args, |a, b| {
        a.checked_add(b).ok_or(Error::IntegerOverflow("+"))
    })
}

fn builtin_sub(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    if let [only] = args.as_slice() {
        let n = as_number("-", 0, only)?;
        return n
            .checked_neg()
            .map(Value::Number)
            .ok_or(Error::IntegerOverflow("-"));
    }
    fold_numbers("-", &args, |a, b| {
        a.checked_sub(b).ok_or(Error::IntegerOverflow("-"))
    })
}

fn builtin_mul(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    fold_numbers("*", &args, |a, b| {
        a.checked_mul(b).ok_or(Error::IntegerOverflow("*"))
    })
}

fn builtin_div(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    fold_numbers("/", &args, |a, b| {
        if b == 0 {
            return Err(Error::DivisionByZero);
        }
        a.checked_div(b).ok_or(Error::IntegerOverflow("/"))
    })
}

fn builtin_bool(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [n] = fixed("bool", args)?;
    Ok(Value::Bool(as_number("bool", 0, &n)? != 0))
}

//
// Comparison and logic
//

// Macro to generate binary numeric comparison functions
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
            let [a, b] = fixed($op_str, args)?;
            let a = as_number($op_str, 0, &a)?;
            let b = as_number($op_str, 1, &b)?;
            Ok(Value::Bool(a $op b))
        }
    };
}

numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_le, <=, "<=");
numeric_comparison!(builtin_ge, >=, ">=");

fn builtin_eq(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [a, b] = fixed("==", args)?;
    Ok(Value::Bool(a == b))
}

fn builtin_ne(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [a, b] = fixed("!=", args)?;
    Ok(Value::Bool(a != b))
}

// Both operands are already evaluated, so there is nothing to short-circuit
macro_rules! boolean_logic_op {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
            let [a, b] = fixed($op_str, args)?;
            let a = as_bool($op_str, 0, &a)?;
            let b = as_bool($op_str, 1, &b)?;
            Ok(Value::Bool(a $op b))
        }
    };
}

boolean_logic_op!(builtin_and, &&, "&&");
boolean_logic_op!(builtin_or, ||, "||");

fn builtin_not(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [b] = fixed("!", args)?;
    Ok(Value::Bool(!as_bool("!", 0, &b)?))
}

//
// Control flow and binding
//

fn builtin_if(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [condition, then_branch, else_branch] = fixed("if", args)?;
    let condition = as_bool("if", 0, &condition)?;
    let then_branch = take_qexpr("if", 1, then_branch)?;
    let else_branch = take_qexpr("if", 2, else_branch)?;

    let chosen = if condition { then_branch } else { else_branch };
    Ok(eval(env, Value::Sexpr(chosen)))
}

fn builtin_lambda(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [formals, body] = fixed("\\", args)?;
    let formals = symbol_names("\\", take_qexpr("\\", 0, formals)?)?;
    let body = take_qexpr("\\", 1, body)?;

    Ok(Value::Lambda {
        formals,
        body,
        env: Box::new(Environment::new()),
    })
}

/// Where `def`-style operations store their bindings
#[derive(Debug, Clone, Copy, PartialEq)]
enum BindTarget {
    Root,
    Local,
}

fn bind_symbols(
    func: &'static str,
    target: BindTarget,
    env: &mut Environment,
    args: Vec<Value>,
) -> Result<Value, Error> {
    let got = args.len();
    let mut args = args.into_iter();
    let names = match args.next() {
        Some(first) => symbol_names(func, take_qexpr(func, 0, first)?)?,
        None => {
            return Err(Error::ArityMismatch {
                func,
                expected: Arity::AtLeast(1),
                got,
            })
        }
    };

    let values: Vec<Value> = args.collect();
    if names.len() != values.len() {
        return Err(Error::ArityMismatch {
            func,
            expected: Arity::Exact(names.len() + 1),
            got,
        });
    }

    for (name, value) in names.iter().zip(values) {
        match target {
            BindTarget::Root => env.define(name, value),
            BindTarget::Local => env.put(name, value),
        }
    }
    Ok(Value::unit())
}

fn builtin_def(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    bind_symbols("def", BindTarget::Root, env, args)
}

fn builtin_put(env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    bind_symbols("=", BindTarget::Local, env, args)
}

fn builtin_error(_env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
    let [message] = fixed("error", args)?;
    Err(Error::UserError(take_string("error", 0, message)?))
}

//
// Host-bound operations
//

/// Read `path` through the host, then evaluate each top-level form in `env`.
///
/// Forms that evaluate to an error are printed through the host and loading
/// carries on with the next form.
pub fn load_source(env: &mut Environment, host: &dyn Host, path: &str) -> Result<Value, Error> {
    debug!(path, "loading library");
    let source = host
        .read_source(path)
        .map_err(|e| Error::ParseFailure(format!("Could not load library {path}: {e}")))?;
    let program = grammar::parse_program(path, &source).map_err(|e| {
        debug!(path, error = %e, "library failed to parse");
        Error::ParseFailure(format!("Could not load library {e}"))
    })?;

    let forms = match reader::read(&program) {
        Value::Sexpr(forms) => forms,
        other => vec![other],
    };
    for form in forms {
        let result = eval(env, form);
        if result.is_error() {
            host.write_str(&format!("{result}\n"));
        }
    }
    Ok(Value::unit())
}

fn builtin_load(env: &mut Environment, args: Vec<Value>, host: &dyn Host) -> Result<Value, Error> {
    let [path] = fixed("load", args)?;
    let path = take_string("load", 0, path)?;
    load_source(env, host, &path)
}

fn builtin_print(args: &[Value], host: &dyn Host) -> Result<Value, Error> {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    host.write_str(&format!("{line}\n"));
    Ok(Value::unit())
}

/// Global registry of the host-independent builtins
static BUILTIN_OPS: &[BuiltinOp] = &[
    // List operations
    BuiltinOp {
        name: "list",
        arity: Arity::Any,
        func: builtin_list,
    },
    BuiltinOp {
        name: "head",
        arity: Arity::Exact(1),
        func: builtin_head,
    },
    BuiltinOp {
        name: "tail",
        arity: Arity::Exact(1),
        func: builtin_tail,
    },
    BuiltinOp {
        name: "init",
        arity: Arity::Exact(1),
        func: builtin_init,
    },
    BuiltinOp {
        name: "eval",
        arity: Arity::Exact(1),
        func: builtin_eval,
    },
    BuiltinOp {
        name: "join",
        arity: Arity::Any,
        func: builtin_join,
    },
    BuiltinOp {
        name: "len",
        arity: Arity::Exact(1),
        func: builtin_len,
    },
    // Arithmetic operations
    BuiltinOp {
        name: "+",
        arity: Arity::AtLeast(2),
        func: builtin_add,
    },
    BuiltinOp {
        name: "-",
        arity: Arity::AtLeast(1),
        func: builtin_sub,
    },
    BuiltinOp {
        name: "*",
        arity: Arity::AtLeast(2),
        func: builtin_mul,
    },
    BuiltinOp {
        name: "/",
        arity: Arity::AtLeast(2),
        func: builtin_div,
    },
    BuiltinOp {
        name: "bool",
        arity: Arity::Exact(1),
        func: builtin_bool,
    },
    // Comparison operations
    BuiltinOp {
        name: "<",
        arity: Arity::Exact(2),
        func: builtin_lt,
    },
    BuiltinOp {
        name: ">",
        arity: Arity::Exact(2),
        func: builtin_gt,
    },
    BuiltinOp {
        name: "<=",
        arity: Arity::Exact(2),
        func: builtin_le,
    },
    BuiltinOp {
        name: ">=",
        arity: Arity::Exact(2),
        func: builtin_ge,
    },
    BuiltinOp {
        name: "==",
        arity: Arity::Exact(2),
        func: builtin_eq,
    },
    BuiltinOp {
        name: "!=",
        arity: Arity::Exact(2),
        func: builtin_ne,
    },
    // Logical operations
    BuiltinOp {
        name: "&&",
        arity: Arity::Exact(2),
        func: builtin_and,
    },
    BuiltinOp {
        name: "||",
        arity: Arity::Exact(2),
        func: builtin_or,
    },
    BuiltinOp {
        name: "!",
        arity: Arity::Exact(1),
        func: builtin_not,
    },
    // Control flow
    BuiltinOp {
        name: "if",
        arity: Arity::Exact(3),
        func: builtin_if,
    },
    // Functions and variables
    BuiltinOp {
        name: "\\",
        arity: Arity::Exact(2),
        func: builtin_lambda,
    },
    BuiltinOp {
        name: "def",
        arity: Arity::AtLeast(1),
        func: builtin_def,
    },
    BuiltinOp {
        name: "=",
        arity: Arity::AtLeast(1),
        func: builtin_put,
    },
    // Error handling
    BuiltinOp {
        name: "error",
        arity: Arity::Exact(1),
        func: builtin_error,
    },
];

/// Get all host-independent builtin operations
pub fn builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Find a builtin operation by name
pub fn find_builtin_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_OPS.iter().find(|op| op.name == name)
}

/// Bind every table-driven builtin in `env`
pub fn register_builtins(env: &mut Environment) {
    for op in BUILTIN_OPS {
        env.register_builtin(op.name, op.arity, op.func);
    }
}

/// Bind `load` and `print`, which reach the outside world through `host`
pub fn register_host_builtins(env: &mut Environment, host: Rc<dyn Host>) {
    let load_host = Rc::clone(&host);
    env.register_builtin("load", Arity::Exact(1), move |env, args| {
        builtin_load(env, args, load_host.as_ref())
    });
    env.register_builtin("print", Arity::Any, move |_env, args| {
        builtin_print(&args, host.as_ref())
    });
}
