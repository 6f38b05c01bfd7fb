use tracing::trace;

use crate::ast::Value;
use crate::Error;

mod environment;

pub use environment::Environment;

/// Evaluate a value in `env`.
///
/// Symbols are looked up, s-expressions are reduced, and everything else
/// (numbers, strings, q-expressions, functions, errors) evaluates to itself.
/// Failures come back as [`Value::Error`], including reductions nested
/// deeper than [`crate::MAX_EVAL_DEPTH`].
pub fn eval(env: &mut Environment, value: Value) -> Value {
    match value {
        Value::Symbol(name) => env.get(&name).into(),
        Value::Sexpr(cells) => env.nested(|env| eval_sexpr(env, cells)).into(),
        other => other,
    }
}

/// Reduce an s-expression.
///
/// Every cell is evaluated, left to right, before any of them is inspected,
/// so side effects of later cells still happen when an earlier cell fails.
fn eval_sexpr(env: &mut Environment, cells: Vec<Value>) -> Value {
    let mut cells: Vec<Value> = cells.into_iter().map(|cell| eval(env, cell)).collect();

    if let Some(index) = cells.iter().position(Value::is_error) {
        return cells.swap_remove(index);
    }

    match cells.len() {
        0 => Value::Sexpr(cells),
        1 => cells.swap_remove(0),
        _ => {
            let func = cells.remove(0);
            apply(env, func, cells)
        }
    }
}

/// Call `func` with already-evaluated `args` on behalf of `caller`.
///
/// Builtins receive the caller's environment directly. Lambdas bind their
/// formals one argument at a time; too few arguments yields a new lambda
/// waiting for the rest, exactly enough runs the body with `caller` as the
/// parent scope.
pub fn apply(caller: &mut Environment, func: Value, args: Vec<Value>) -> Value {
    match func {
        Value::Builtin { func, .. } => func(caller, args).into(),
        Value::Lambda { formals, body, env } => apply_lambda(caller, formals, body, env, args),
        other => Value::Error(Error::NotCallable(other.type_name())),
    }
}

fn apply_lambda(
    caller: &mut Environment,
    formals: Vec<String>,
    body: Vec<Value>,
    mut env: Box<Environment>,
    args: Vec<Value>,
) -> Value {
    if args.len() > formals.len() {
        return Value::Error(Error::TooManyArguments {
            expected: formals.len(),
            got: args.len(),
        });
    }

    let mut formals = formals.into_iter();
    // Arguments drive the zip so no formal is consumed without a value
    for (arg, name) in args.into_iter().zip(formals.by_ref()) {
        env.put(&name, arg);
    }

    let remaining: Vec<String> = formals.collect();
    if !remaining.is_empty() {
        trace!(remaining = remaining.len(), "partially applied lambda");
        return Value::Lambda {
            formals: remaining,
            body,
            env,
        };
    }

    trace!("applying saturated lambda");
    env.call_with_parent(caller, |scope| eval(scope, Value::Sexpr(body)))
}
